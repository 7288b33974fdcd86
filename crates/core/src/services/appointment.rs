//! Appointment scheduling and lifecycle

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::contact::calendar_address;
use crate::error::{ConciergeError, ConciergeResult};
use crate::models::{
    Appointment, AppointmentStatus, AppointmentType, Attachment, Location, Participant,
};
use crate::ports::Repository;
use crate::timezone::Timezone;
use crate::types::{AppointmentId, BuyerId, ParticipantId, ProjectId};

/// Duration used when a request carries no end time
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Scheduling request
#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub buyer_id: BuyerId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub timezone: Option<Timezone>,
    pub location: Location,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub notes: Option<String>,
}

pub struct AppointmentService {
    repo: Arc<dyn Repository<Appointment>>,
    default_timezone: Timezone,
}

impl AppointmentService {
    pub fn new(repo: Arc<dyn Repository<Appointment>>, default_timezone: Timezone) -> Self {
        Self {
            repo,
            default_timezone,
        }
    }

    /// Validate and store a new appointment in `scheduled` state
    #[instrument(skip(self, request), fields(buyer_id = %request.buyer_id))]
    pub async fn schedule(&self, request: NewAppointment) -> ConciergeResult<Appointment> {
        let start_time = request
            .start_time
            .ok_or_else(|| ConciergeError::validation("start_time is required"))?;
        let end_time = request
            .end_time
            .unwrap_or_else(|| start_time + Duration::minutes(DEFAULT_DURATION_MINUTES));

        if request.title.trim().is_empty() {
            return Err(ConciergeError::validation("title is required"));
        }
        check_time_range(start_time, end_time)?;
        request
            .location
            .validate()
            .map_err(ConciergeError::Validation)?;
        for participant in &request.participants {
            check_participant(participant)?;
        }
        check_unique_participants(&request.participants)?;
        for attachment in &request.attachments {
            attachment.validate().map_err(ConciergeError::Validation)?;
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: AppointmentId::new(),
            buyer_id: request.buyer_id,
            project_id: request.project_id,
            title: request.title,
            description: request.description,
            start_time,
            end_time,
            timezone: request
                .timezone
                .unwrap_or_else(|| self.default_timezone.clone()),
            location: request.location,
            kind: request.kind,
            participants: request.participants,
            status: AppointmentStatus::Scheduled,
            attachments: request.attachments,
            notes: request.notes,
            created_at: now,
            updated_at: now,
            removed_at: None,
        };

        self.repo.put(appointment.clone()).await?;
        info!(appointment_id = %appointment.id, kind = ?appointment.kind, "Appointment scheduled");

        Ok(appointment)
    }

    /// Fetch a live (not removed) appointment
    pub async fn get(&self, id: AppointmentId) -> ConciergeResult<Appointment> {
        self.repo
            .get(&id)
            .await?
            .filter(|a| !a.is_removed())
            .ok_or_else(|| ConciergeError::not_found("Appointment", id))
    }

    /// Live appointments of a buyer, earliest first
    pub async fn list_for_buyer(&self, buyer_id: BuyerId) -> ConciergeResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|a| a.buyer_id == buyer_id && !a.is_removed())
            .collect();
        appointments.sort_by_key(|a| a.start_time);
        Ok(appointments)
    }

    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        id: AppointmentId,
        next: AppointmentStatus,
    ) -> ConciergeResult<Appointment> {
        let mut appointment = self.get(id).await?;
        if !appointment.status.can_transition_to(next) {
            return Err(ConciergeError::InvalidTransition {
                from: appointment.status.to_string(),
                to: next.to_string(),
            });
        }

        let previous = appointment.status;
        appointment.status = next;
        self.save(&mut appointment).await?;
        info!(appointment_id = %id, from = %previous, to = %next, "Appointment status changed");

        Ok(appointment)
    }

    pub async fn reschedule(
        &self,
        id: AppointmentId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> ConciergeResult<Appointment> {
        let mut appointment = self.get(id).await?;
        if !appointment.status.is_open() {
            return Err(ConciergeError::validation(format!(
                "cannot reschedule a {} appointment",
                appointment.status
            )));
        }
        check_time_range(start_time, end_time)?;

        appointment.start_time = start_time;
        appointment.end_time = end_time;
        self.save(&mut appointment).await?;
        info!(appointment_id = %id, %start_time, "Appointment rescheduled");

        Ok(appointment)
    }

    pub async fn add_participant(
        &self,
        id: AppointmentId,
        participant: Participant,
    ) -> ConciergeResult<Appointment> {
        check_participant(&participant)?;
        let mut appointment = self.get(id).await?;
        if appointment.participant(participant.id).is_some() {
            return Err(ConciergeError::validation(format!(
                "participant {} already present",
                participant.id
            )));
        }

        appointment.participants.push(participant);
        self.save(&mut appointment).await?;
        Ok(appointment)
    }

    pub async fn remove_participant(
        &self,
        id: AppointmentId,
        participant_id: ParticipantId,
    ) -> ConciergeResult<Appointment> {
        let mut appointment = self.get(id).await?;
        let before = appointment.participants.len();
        appointment.participants.retain(|p| p.id != participant_id);
        if appointment.participants.len() == before {
            return Err(ConciergeError::not_found("Participant", participant_id));
        }

        self.save(&mut appointment).await?;
        Ok(appointment)
    }

    /// Soft removal: the record stays in storage but disappears from reads
    #[instrument(skip(self))]
    pub async fn remove(&self, id: AppointmentId) -> ConciergeResult<()> {
        let mut appointment = self.get(id).await?;
        appointment.removed_at = Some(Utc::now());
        self.save(&mut appointment).await?;
        info!(appointment_id = %id, "Appointment removed");
        Ok(())
    }

    pub async fn ping(&self) -> ConciergeResult<()> {
        self.repo.ping().await
    }

    async fn save(&self, appointment: &mut Appointment) -> ConciergeResult<()> {
        appointment.updated_at = Utc::now();
        self.repo.put(appointment.clone()).await
    }
}

fn check_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> ConciergeResult<()> {
    if end <= start {
        return Err(ConciergeError::validation(
            "appointment end time must be after start time",
        ));
    }
    Ok(())
}

fn check_participant(participant: &Participant) -> ConciergeResult<()> {
    if participant.name.trim().is_empty() {
        return Err(ConciergeError::validation("participant name is required"));
    }
    calendar_address(participant)
        .map(|_| ())
        .map_err(|e| ConciergeError::validation(e.to_string()))
}

fn check_unique_participants(participants: &[Participant]) -> ConciergeResult<()> {
    for (idx, participant) in participants.iter().enumerate() {
        if participants[..idx].iter().any(|p| p.id == participant.id) {
            return Err(ConciergeError::validation(format!(
                "duplicate participant id {}",
                participant.id
            )));
        }
    }
    Ok(())
}
