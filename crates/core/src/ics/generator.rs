//! Appointment → iCalendar (RFC 5545) serialization

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::escape::escape_param_value;
use super::validator::validate_ics;
use super::writer::FoldedWriter;
use crate::contact::{calendar_address, is_valid_email};
use crate::error::{ConciergeError, ConciergeResult};
use crate::models::{Appointment, AppointmentStatus, ParticipantRole};
use crate::recurrence::weekly_rule;
use crate::timezone::{DEFAULT_TIMEZONE, parse_timezone, to_local_naive};

pub const PRODID: &str = "-//Urbanova//Concierge//IT";
pub const UID_DOMAIN: &str = "urbanova.app";

const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Calendar organizer written on the ORGANIZER line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organizer {
    pub name: String,
    pub email: String,
}

impl Default for Organizer {
    fn default() -> Self {
        Self {
            name: "Urbanova Concierge".to_string(),
            email: "concierge@urbanova.app".to_string(),
        }
    }
}

/// Knobs for [`generate_ics_content`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub include_attachments: bool,
    pub include_recurrence: bool,
    /// IANA zone used for the TZID of DTSTART/DTEND
    pub timezone: String,
    pub organizer: Organizer,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            include_attachments: true,
            include_recurrence: false,
            timezone: DEFAULT_TIMEZONE.to_string(),
            organizer: Organizer::default(),
        }
    }
}

impl GenerationOptions {
    /// Defaults, with the timezone taken from the appointment
    pub fn for_appointment(appointment: &Appointment) -> Self {
        Self {
            timezone: appointment.timezone.as_str().to_string(),
            ..Self::default()
        }
    }
}

/// Calendar UID of an appointment
pub fn appointment_uid(appointment: &Appointment) -> String {
    format!("{}@{}", appointment.id, UID_DOMAIN)
}

/// Render an appointment as a single-event calendar, stamped with the current time
pub fn generate_ics_content(
    appointment: &Appointment,
    options: &GenerationOptions,
) -> ConciergeResult<String> {
    generate_ics_content_at(appointment, options, Utc::now())
}

/// Render an appointment as a single-event calendar
///
/// `now` feeds DTSTAMP and the UNTIL bound of the optional weekly RRULE.
/// Everything else is a pure function of the inputs.
pub fn generate_ics_content_at(
    appointment: &Appointment,
    options: &GenerationOptions,
    now: DateTime<Utc>,
) -> ConciergeResult<String> {
    let tz = parse_timezone(&options.timezone)?;
    check_input(appointment, options)?;

    let mut buf = String::with_capacity(1024);
    write_calendar(&mut FoldedWriter::new(&mut buf), appointment, options, tz, now)?;

    let report = validate_ics(&buf);
    if !report.valid {
        return Err(ConciergeError::Generation(report.errors.join("; ")));
    }

    Ok(buf)
}

fn check_input(appointment: &Appointment, options: &GenerationOptions) -> ConciergeResult<()> {
    if appointment.id.is_nil() {
        return Err(ConciergeError::validation("appointment id is required"));
    }
    if appointment.end_time <= appointment.start_time {
        return Err(ConciergeError::validation(
            "appointment end time must be after start time",
        ));
    }
    appointment
        .location
        .validate()
        .map_err(ConciergeError::Validation)?;
    if options.include_attachments {
        for attachment in &appointment.attachments {
            attachment.validate().map_err(ConciergeError::Validation)?;
        }
    }
    if !is_valid_email(&options.organizer.email) {
        return Err(ConciergeError::validation(format!(
            "invalid organizer email: {}",
            options.organizer.email
        )));
    }
    Ok(())
}

fn write_calendar(
    writer: &mut FoldedWriter<'_>,
    appointment: &Appointment,
    options: &GenerationOptions,
    tz: Tz,
    now: DateTime<Utc>,
) -> ConciergeResult<()> {
    let tzid = [("TZID", escape_param_value(tz.name()))];

    writer.line("BEGIN:VCALENDAR");
    writer.line("VERSION:2.0");
    writer.write_str("PRODID:");
    writer.line(PRODID);
    writer.line("CALSCALE:GREGORIAN");
    writer.line("METHOD:PUBLISH");

    writer.line("BEGIN:VEVENT");
    writer.text_property("UID", &appointment_uid(appointment));
    writer.property("DTSTAMP", &[], &now.format(UTC_FORMAT).to_string());
    writer.property(
        "DTSTART",
        &tzid,
        &to_local_naive(&appointment.start_time, &tz)
            .format(LOCAL_FORMAT)
            .to_string(),
    );
    writer.property(
        "DTEND",
        &tzid,
        &to_local_naive(&appointment.end_time, &tz)
            .format(LOCAL_FORMAT)
            .to_string(),
    );
    writer.text_property("SUMMARY", appointment.kind.label());
    writer.text_property("DESCRIPTION", &description(appointment));
    writer.text_property("LOCATION", &appointment.location.display_text());
    writer.property("STATUS", &[], ics_status(appointment.status));

    writer.property(
        "ORGANIZER",
        &[("CN", escape_param_value(&options.organizer.name))],
        raw_value("ORGANIZER", &format!("mailto:{}", options.organizer.email))?,
    );

    for participant in &appointment.participants {
        let address =
            calendar_address(participant).map_err(|e| ConciergeError::validation(e.to_string()))?;
        let role = match participant.role {
            ParticipantRole::Buyer => "REQ-PARTICIPANT",
            _ => "OPT-PARTICIPANT",
        };
        writer.property(
            "ATTENDEE",
            &[
                ("CN", escape_param_value(&participant.name)),
                ("ROLE", role.to_string()),
                ("PARTSTAT", "NEEDS-ACTION".to_string()),
                ("RSVP", "TRUE".to_string()),
            ],
            raw_value("ATTENDEE", &address)?,
        );
    }

    if options.include_attachments {
        for attachment in &appointment.attachments {
            writer.property(
                "ATTACH",
                &[("FMTTYPE", escape_param_value(&attachment.mime_type))],
                raw_value("ATTACH", &attachment.url)?,
            );
        }
    }

    if options.include_recurrence {
        writer.property("RRULE", &[], &weekly_rule(now));
    }

    if let Some(url) = appointment.location.online_url() {
        writer.property("URL", &[], raw_value("URL", url)?);
    }

    if let Some(notes) = appointment.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        writer.text_property("COMMENT", notes);
    }

    writer.line("END:VEVENT");
    writer.line("END:VCALENDAR");

    Ok(())
}

/// Values written without TEXT escaping must stay on one content line
fn raw_value<'a>(name: &str, value: &'a str) -> ConciergeResult<&'a str> {
    if value.contains(['\r', '\n']) {
        return Err(ConciergeError::Generation(format!(
            "{name} value contains a line break"
        )));
    }
    Ok(value)
}

fn description(appointment: &Appointment) -> String {
    let mut parts = vec![appointment.title.clone()];
    if let Some(desc) = appointment
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
    {
        parts.push(desc.to_string());
    }
    parts.push(format!("Progetto: {}", appointment.project_id));
    parts.join("\n")
}

fn ics_status(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Scheduled => "TENTATIVE",
        AppointmentStatus::Confirmed | AppointmentStatus::Completed => "CONFIRMED",
        AppointmentStatus::Cancelled => "CANCELLED",
    }
}
