//! Appointment reminders over WhatsApp and e-mail

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::contact::preferred_channel;
use crate::error::ConciergeResult;
use crate::models::{Appointment, Reminder, ReminderChannel, ReminderStatus};
use crate::ports::{DeliveryResult, EmailSender, MessagingChannel, Repository};
use crate::timezone::to_timezone;
use crate::types::{AppointmentId, ReminderId};

/// Hours before the start at which reminders go out
pub const DEFAULT_REMINDER_OFFSETS_HOURS: [i64; 2] = [24, 1];

pub fn default_offsets() -> Vec<Duration> {
    DEFAULT_REMINDER_OFFSETS_HOURS
        .iter()
        .map(|h| Duration::hours(*h))
        .collect()
}

pub struct ReminderService {
    reminders: Arc<dyn Repository<Reminder>>,
    whatsapp: Arc<dyn MessagingChannel>,
    email: Arc<dyn EmailSender>,
    max_retry_count: u32,
}

impl ReminderService {
    pub fn new(
        reminders: Arc<dyn Repository<Reminder>>,
        whatsapp: Arc<dyn MessagingChannel>,
        email: Arc<dyn EmailSender>,
        max_retry_count: u32,
    ) -> Self {
        Self {
            reminders,
            whatsapp,
            email,
            max_retry_count,
        }
    }

    /// Create one reminder per participant and offset
    ///
    /// Offsets that already lie in the past are skipped, as are participants
    /// without a usable contact and slots that already hold a pending reminder.
    /// Calling it again for the same appointment therefore adds nothing.
    #[instrument(skip(self, appointment, offsets), fields(appointment_id = %appointment.id))]
    pub async fn schedule_for(
        &self,
        appointment: &Appointment,
        offsets: &[Duration],
        now: DateTime<Utc>,
    ) -> ConciergeResult<Vec<Reminder>> {
        let subject = format!("Promemoria Urbanova: {}", appointment.kind.label());
        let message = reminder_message(appointment);

        let mut taken: HashSet<_> = self
            .list_for_appointment(appointment.id)
            .await?
            .into_iter()
            .filter(|r| r.status == ReminderStatus::Pending)
            .map(|r| (r.participant_id, r.remind_at))
            .collect();

        let mut pending = Vec::new();
        for participant in &appointment.participants {
            let (channel, recipient) = match preferred_channel(participant) {
                Ok(contact) => contact,
                Err(e) => {
                    warn!(participant_id = %participant.id, "Skipping reminder: {}", e);
                    continue;
                }
            };
            for offset in offsets {
                let remind_at = appointment.start_time - *offset;
                if remind_at <= now || !taken.insert((participant.id, remind_at)) {
                    continue;
                }
                pending.push(Reminder {
                    id: ReminderId::new(),
                    appointment_id: appointment.id,
                    participant_id: participant.id,
                    channel,
                    recipient: recipient.clone(),
                    subject: subject.clone(),
                    message: message.clone(),
                    remind_at,
                    status: ReminderStatus::Pending,
                    attempts: 0,
                    last_error: None,
                    sent_at: None,
                });
            }
        }

        try_join_all(pending.iter().map(|r| self.reminders.put(r.clone()))).await?;
        info!(count = pending.len(), "Reminders scheduled");

        Ok(pending)
    }

    /// Pending reminders due at `now`, oldest first
    pub async fn due(&self, now: DateTime<Utc>, limit: usize) -> ConciergeResult<Vec<Reminder>> {
        let mut due: Vec<Reminder> = self
            .reminders
            .list_by_field("status", ReminderStatus::Pending.as_str())
            .await?
            .into_iter()
            .filter(|r| r.remind_at <= now)
            .collect();
        due.sort_by_key(|r| r.remind_at);
        due.truncate(limit);
        Ok(due)
    }

    pub async fn list_for_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> ConciergeResult<Vec<Reminder>> {
        let mut reminders = self
            .reminders
            .list_by_field("appointment_id", &appointment_id.to_string())
            .await?;
        reminders.sort_by_key(|r| r.remind_at);
        Ok(reminders)
    }

    /// Cancel the pending reminders of an appointment, returning how many changed
    pub async fn cancel_for_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> ConciergeResult<usize> {
        let mut cancelled = 0;
        for mut reminder in self.list_for_appointment(appointment_id).await? {
            if reminder.status == ReminderStatus::Pending {
                reminder.status = ReminderStatus::Cancelled;
                self.reminders.put(reminder).await?;
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            info!(%appointment_id, cancelled, "Reminders cancelled");
        }
        Ok(cancelled)
    }

    /// Delete sent, failed and cancelled reminders due before `older_than`
    pub async fn purge_finished(&self, older_than: DateTime<Utc>) -> ConciergeResult<usize> {
        let mut purged = 0;
        for status in [
            ReminderStatus::Sent,
            ReminderStatus::Failed,
            ReminderStatus::Cancelled,
        ] {
            for reminder in self.reminders.list_by_field("status", status.as_str()).await? {
                if reminder.remind_at < older_than && self.reminders.delete(&reminder.id).await? {
                    purged += 1;
                }
            }
        }
        if purged > 0 {
            info!(purged, "Finished reminders purged");
        }
        Ok(purged)
    }

    /// Send one reminder and persist the outcome
    ///
    /// A failed send is rescheduled `2^attempts` minutes later until
    /// `max_retry_count` attempts have been made, then marked failed.
    #[instrument(skip(self, reminder), fields(reminder_id = %reminder.id, channel = %reminder.channel))]
    pub async fn deliver(
        &self,
        mut reminder: Reminder,
        now: DateTime<Utc>,
    ) -> ConciergeResult<Reminder> {
        reminder.attempts += 1;

        match self.send(&reminder).await {
            Ok(delivery) => {
                debug!(provider_id = %delivery.provider_id, "Reminder accepted");
                reminder.status = ReminderStatus::Sent;
                reminder.sent_at = Some(delivery.accepted_at);
                reminder.last_error = None;
            }
            Err(e) => {
                reminder.last_error = Some(e.to_string());
                if reminder.attempts >= self.max_retry_count {
                    warn!(attempts = reminder.attempts, "Reminder failed permanently: {}", e);
                    reminder.status = ReminderStatus::Failed;
                } else {
                    let backoff = Duration::minutes(1_i64 << reminder.attempts.min(20));
                    warn!(attempts = reminder.attempts, ?backoff, "Reminder failed, retrying: {}", e);
                    reminder.remind_at = now + backoff;
                }
            }
        }

        self.reminders.put(reminder.clone()).await?;
        Ok(reminder)
    }

    async fn send(&self, reminder: &Reminder) -> ConciergeResult<DeliveryResult> {
        match reminder.channel {
            ReminderChannel::Whatsapp => {
                self.whatsapp
                    .send_whatsapp(&reminder.recipient, &reminder.message)
                    .await
            }
            ReminderChannel::Email => {
                self.email
                    .send_email(&reminder.recipient, &reminder.subject, &reminder.message, None)
                    .await
            }
        }
    }
}

fn reminder_message(appointment: &Appointment) -> String {
    let local = to_timezone(&appointment.start_time, &appointment.timezone.tz());
    format!(
        "Promemoria: {} il {} alle {}. Luogo: {}",
        appointment.kind.label(),
        local.format("%d/%m/%Y"),
        local.format("%H:%M"),
        appointment.location.display_text()
    )
}
