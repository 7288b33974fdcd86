//! Core domain models for the Urbanova buyer concierge
//!
//! These models represent the business entities stored through the repository ports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ports::VerificationResult;
use crate::timezone::Timezone;
use crate::types::{
    AppointmentId, BuyerId, IcsFileId, KycCaseId, ParticipantId, ProjectId, ReminderId,
};

/// Appointment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub buyer_id: BuyerId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub timezone: Timezone,
    pub location: Location,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub participants: Vec<Participant>,
    pub status: AppointmentStatus,
    pub attachments: Vec<Attachment>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft removal marker; removed appointments are invisible to reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }
}

/// Appointment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Fitting,
    Visit,
    Consultation,
    Payment,
    Delivery,
}

impl AppointmentType {
    /// Customer-facing label, used as the calendar SUMMARY
    pub fn label(self) -> &'static str {
        match self {
            Self::Fitting => "Finiture Appartamento",
            Self::Visit => "Visita Immobile",
            Self::Consultation => "Consulenza",
            Self::Payment => "Appuntamento Pagamento",
            Self::Delivery => "Consegna Immobile",
        }
    }
}

/// Appointment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Allowed lifecycle moves
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Confirmed)
                | (Self::Scheduled, Self::Cancelled)
                | (Self::Confirmed, Self::Completed)
                | (Self::Confirmed, Self::Cancelled)
        )
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an appointment takes place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub kind: LocationKind,
    pub address: Option<String>,
    pub meeting_url: Option<String>,
}

impl Location {
    pub fn physical(address: impl Into<String>) -> Self {
        Self {
            kind: LocationKind::Physical,
            address: Some(address.into()),
            meeting_url: None,
        }
    }

    pub fn virtual_meeting(url: impl Into<String>) -> Self {
        Self {
            kind: LocationKind::Virtual,
            address: None,
            meeting_url: Some(url.into()),
        }
    }

    pub fn hybrid(address: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: LocationKind::Hybrid,
            address: Some(address.into()),
            meeting_url: Some(url.into()),
        }
    }

    /// Text for the LOCATION property
    pub fn display_text(&self) -> String {
        match self.kind {
            LocationKind::Physical => self.address.clone().unwrap_or_default(),
            LocationKind::Virtual => self
                .meeting_url
                .as_deref()
                .map(|url| format!("Online: {url}"))
                .unwrap_or_default(),
            LocationKind::Hybrid => match (&self.address, &self.meeting_url) {
                (Some(address), Some(url)) => format!("{address} / Online: {url}"),
                (Some(address), None) => address.clone(),
                (None, Some(url)) => format!("Online: {url}"),
                (None, None) => String::new(),
            },
        }
    }

    /// Meeting link, if the location has an online component
    pub fn online_url(&self) -> Option<&str> {
        match self.kind {
            LocationKind::Physical => None,
            LocationKind::Virtual | LocationKind::Hybrid => self.meeting_url.as_deref(),
        }
    }

    /// Check that the fields required by the location kind are present
    pub fn validate(&self) -> Result<(), String> {
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        match self.kind {
            LocationKind::Physical if !has(&self.address) => {
                Err("physical location requires an address".to_string())
            }
            LocationKind::Virtual if !has(&self.meeting_url) => {
                Err("virtual location requires a meeting URL".to_string())
            }
            LocationKind::Hybrid if !has(&self.address) || !has(&self.meeting_url) => {
                Err("hybrid location requires both an address and a meeting URL".to_string())
            }
            _ => match self.meeting_url.as_deref() {
                Some(url) if !is_single_token_uri(url) => {
                    Err(format!("meeting URL must be a single URI: {url:?}"))
                }
                _ => Ok(()),
            },
        }
    }
}

/// URI values are written verbatim into calendar lines, so they may not
/// carry whitespace or control characters
pub fn is_single_token_uri(uri: &str) -> bool {
    !uri.is_empty() && !uri.chars().any(|c| c.is_control() || c.is_whitespace())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Physical,
    Virtual,
    Hybrid,
}

/// Person taking part in an appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub id: ParticipantId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Buyer,
    Agent,
    Vendor,
    Other,
}

/// File linked to an appointment (floor plans, finishing catalogues, receipts)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
    pub mime_type: String,
}

impl Attachment {
    pub fn validate(&self) -> Result<(), String> {
        if !is_single_token_uri(&self.url) {
            return Err(format!("attachment URL must be a single URI: {:?}", self.url));
        }
        if self.mime_type.chars().any(char::is_control) {
            return Err(format!("invalid attachment type: {:?}", self.mime_type));
        }
        Ok(())
    }
}

/// Generated calendar file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcsFile {
    pub id: IcsFileId,
    pub filename: String,
    pub content: String,
    /// Appointments covered by this file
    pub events: Vec<AppointmentId>,
    pub generated_at: DateTime<Utc>,
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
}

impl IcsFile {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Reminder delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderChannel {
    Whatsapp,
    Email,
}

impl fmt::Display for ReminderChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Whatsapp => "whatsapp",
            Self::Email => "email",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl ReminderStatus {
    /// Stored (serialized) form
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Scheduled notification about an upcoming appointment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub appointment_id: AppointmentId,
    pub participant_id: ParticipantId,
    pub channel: ReminderChannel,
    pub recipient: String,
    pub subject: String,
    pub message: String,
    pub remind_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// KYC document categories accepted by the verifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    IdentityCard,
    Passport,
    TaxCode,
    ProofOfIncome,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycDocument {
    /// Identifier of the document in the verification provider
    pub id: String,
    pub kind: DocumentKind,
    pub verification: Option<VerificationResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Pending,
    Verified,
    Rejected,
    NeedsReview,
}

/// Identity verification case for a buyer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycCase {
    pub id: KycCaseId,
    pub buyer_id: BuyerId,
    pub documents: Vec<KycDocument>,
    pub status: KycStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
