//! Generated calendar files: upload, expiry and overwrite

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::AppointmentService;
use crate::config::CoreConfig;
use crate::error::{ConciergeError, ConciergeResult};
use crate::ics::{GenerationOptions, Organizer, generate_ics_content_at, validate_ics};
use crate::models::IcsFile;
use crate::ports::{DeliveryResult, EmailAttachment, EmailSender, ObjectStorage, Repository};
use crate::timezone::{Timezone, to_timezone};
use crate::types::{AppointmentId, IcsFileId};

pub const ICS_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Caller-controlled generation knobs; the organizer comes from configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CalendarRequest {
    pub include_attachments: bool,
    pub include_recurrence: bool,
    /// Overrides the appointment's own timezone
    pub timezone: Option<Timezone>,
}

impl Default for CalendarRequest {
    fn default() -> Self {
        Self {
            include_attachments: true,
            include_recurrence: false,
            timezone: None,
        }
    }
}

/// Strong ETag for calendar downloads
pub fn content_etag(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("\"{}\"", hex::encode(hasher.finalize()))
}

pub struct IcsFileService {
    appointments: Arc<AppointmentService>,
    files: Arc<dyn Repository<IcsFile>>,
    storage: Arc<dyn ObjectStorage>,
    email: Arc<dyn EmailSender>,
    bucket: String,
    link_ttl: Duration,
    organizer: Organizer,
}

impl IcsFileService {
    pub fn new(
        appointments: Arc<AppointmentService>,
        files: Arc<dyn Repository<IcsFile>>,
        storage: Arc<dyn ObjectStorage>,
        email: Arc<dyn EmailSender>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            appointments,
            files,
            storage,
            email,
            bucket: config.ics_bucket.clone(),
            link_ttl: config.ics_link_ttl(),
            organizer: config.organizer.clone(),
        }
    }

    /// Generate, upload and record the calendar file of an appointment
    #[instrument(skip(self, request))]
    pub async fn generate(
        &self,
        appointment_id: AppointmentId,
        request: CalendarRequest,
    ) -> ConciergeResult<IcsFile> {
        self.generate_at(appointment_id, request, Utc::now()).await
    }

    pub async fn generate_at(
        &self,
        appointment_id: AppointmentId,
        request: CalendarRequest,
        now: DateTime<Utc>,
    ) -> ConciergeResult<IcsFile> {
        let appointment = self.appointments.get(appointment_id).await?;

        let options = GenerationOptions {
            include_attachments: request.include_attachments,
            include_recurrence: request.include_recurrence,
            timezone: request
                .timezone
                .as_ref()
                .unwrap_or(&appointment.timezone)
                .as_str()
                .to_string(),
            organizer: self.organizer.clone(),
        };
        let content = generate_ics_content_at(&appointment, &options, now)?;

        let id = IcsFileId::new();
        let download_url = self.upload(id, &content).await?;
        let local_day = to_timezone(&appointment.start_time, &appointment.timezone.tz());

        let file = IcsFile {
            id,
            filename: format!(
                "urbanova-{}-{}.ics",
                local_day.format("%Y%m%d"),
                appointment.id
            ),
            content,
            events: vec![appointment.id],
            generated_at: now,
            download_url,
            expires_at: now + self.link_ttl,
        };
        self.files.put(file.clone()).await?;
        info!(ics_file_id = %file.id, %appointment_id, "Calendar file generated");

        Ok(file)
    }

    pub async fn get(&self, id: IcsFileId) -> ConciergeResult<IcsFile> {
        self.files
            .get(&id)
            .await?
            .ok_or_else(|| ConciergeError::not_found("IcsFile", id))
    }

    /// Like [`Self::get`], but expired links are gone
    pub async fn download(&self, id: IcsFileId, now: DateTime<Utc>) -> ConciergeResult<IcsFile> {
        let file = self.get(id).await?;
        if file.is_expired(now) {
            return Err(ConciergeError::not_found("IcsFile", id));
        }
        Ok(file)
    }

    /// Replace the stored content of a live file after validating it
    #[instrument(skip(self, content))]
    pub async fn overwrite_content(
        &self,
        id: IcsFileId,
        content: String,
        now: DateTime<Utc>,
    ) -> ConciergeResult<IcsFile> {
        let report = validate_ics(&content);
        if !report.valid {
            return Err(ConciergeError::validation(format!(
                "invalid calendar content: {}",
                report.errors.join("; ")
            )));
        }

        let mut file = self.download(id, now).await?;
        file.download_url = self.upload(id, &content).await?;
        file.content = content;
        self.files.put(file.clone()).await?;
        info!(ics_file_id = %id, "Calendar content overwritten");

        Ok(file)
    }

    pub async fn overwrite_download_url(&self, id: IcsFileId, url: &str) -> ConciergeResult<IcsFile> {
        let url = url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConciergeError::validation(format!(
                "download url must be http(s): {url}"
            )));
        }

        let mut file = self.get(id).await?;
        file.download_url = url.to_string();
        self.files.put(file.clone()).await?;
        Ok(file)
    }

    /// E-mail a live calendar file to every participant with an address
    #[instrument(skip(self))]
    pub async fn share(
        &self,
        id: IcsFileId,
        now: DateTime<Utc>,
    ) -> ConciergeResult<Vec<DeliveryResult>> {
        let file = self.download(id, now).await?;
        let attachment = EmailAttachment {
            filename: file.filename.clone(),
            content_type: ICS_CONTENT_TYPE.to_string(),
            content: file.content.clone().into_bytes(),
        };

        let mut deliveries = Vec::new();
        for appointment_id in &file.events {
            let appointment = self.appointments.get(*appointment_id).await?;
            let local = to_timezone(&appointment.start_time, &appointment.timezone.tz());
            let subject = format!("Invito: {}", appointment.kind.label());
            let body = format!(
                "{} il {} alle {}.\nLuogo: {}\n\nIn allegato l'invito da aggiungere al calendario.",
                appointment.kind.label(),
                local.format("%d/%m/%Y"),
                local.format("%H:%M"),
                appointment.location.display_text()
            );

            for email in appointment.participants.iter().filter_map(|p| p.email.as_deref()) {
                deliveries.push(
                    self.email
                        .send_email(email, &subject, &body, Some(&attachment))
                        .await?,
                );
            }
        }

        if deliveries.is_empty() {
            warn!(ics_file_id = %id, "No participant with an e-mail address");
        }
        Ok(deliveries)
    }

    /// Delete expired files, returning how many were removed
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> ConciergeResult<usize> {
        let mut purged = 0;
        for file in self.files.list().await? {
            if file.is_expired(now) && self.files.delete(&file.id).await? {
                purged += 1;
            }
        }
        if purged > 0 {
            info!(purged, "Expired calendar files purged");
        }
        Ok(purged)
    }

    async fn upload(&self, id: IcsFileId, content: &str) -> ConciergeResult<String> {
        self.storage
            .upload_object(
                &self.bucket,
                &format!("calendars/{id}.ics"),
                content.as_bytes().to_vec(),
                ICS_CONTENT_TYPE,
            )
            .await
    }
}
