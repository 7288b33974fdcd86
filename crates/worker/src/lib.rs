//! Urbanova Worker - Background reminder delivery
//!
//! Polls for due reminders, delivers them over WhatsApp or e-mail with
//! retry/backoff, and periodically sweeps expired calendar files.

mod config;
mod processors;

pub use config::Config;
pub use processors::{
    BatchOutcome, deliver_due_reminders, purge_expired_files, purge_finished_reminders,
};

use anyhow::Result;
use chrono::Utc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use urbanova_core::services::ConciergeServices;

/// Run the background worker until cancelled
///
/// # Arguments
/// * `services` - Service bundle shared with the API
/// * `config` - Worker configuration
/// * `shutdown` - Optional cancellation token for graceful shutdown
pub async fn run_worker(
    services: ConciergeServices,
    config: Config,
    shutdown: Option<CancellationToken>,
) -> Result<()> {
    info!(
        "Starting worker: poll_interval={}s, max_retries={}, batch_size={}",
        config.poll_interval_secs, config.max_retry_count, config.batch_size
    );

    let shutdown = shutdown.unwrap_or_default();
    let poll_interval = Duration::from_secs(config.poll_interval_secs);
    let status_interval = Duration::from_secs(config.status_log_interval_secs);
    let purge_interval = Duration::from_secs(config.purge_interval_secs);

    let mut last_status_log = Instant::now();
    let mut last_purge: Option<Instant> = None;

    loop {
        if shutdown.is_cancelled() {
            info!("Worker received shutdown signal");
            break;
        }

        let now = Utc::now();
        let outcome = match deliver_due_reminders(&services, config.batch_size, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to fetch due reminders: {}", e);
                BatchOutcome::default()
            }
        };

        if last_purge.is_none_or(|t| t.elapsed() >= purge_interval) {
            if let Err(e) = purge_expired_files(&services, now).await {
                error!("Failed to purge expired calendar files: {}", e);
            }
            if let Err(e) =
                purge_finished_reminders(&services, config.reminder_retention_days, now).await
            {
                error!("Failed to purge finished reminders: {}", e);
            }
            last_purge = Some(Instant::now());
        }

        if last_status_log.elapsed() >= status_interval {
            if let Ok(pending) = services.reminders.due(now, usize::MAX).await
                && !pending.is_empty()
            {
                info!("Queue status: {} due reminders remaining", pending.len());
            }
            last_status_log = Instant::now();
        }

        // A full batch means more work is probably waiting
        if outcome.processed() >= config.batch_size {
            continue;
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Worker received shutdown signal");
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use integrations::{LoggingEmailSender, LoggingWhatsApp, ManualReviewVerifier};
    use std::sync::Arc;
    use urbanova_core::config::CoreConfig;
    use urbanova_core::models::{
        AppointmentType, Location, Participant, ParticipantRole, ReminderStatus,
    };
    use urbanova_core::ports::{DeliveryResult, MessagingChannel, ObjectStorage};
    use urbanova_core::services::{Adapters, NewAppointment, Repositories};
    use urbanova_core::types::{BuyerId, ParticipantId, ProjectId};
    use urbanova_core::{ConciergeError, ConciergeResult};

    struct NullStorage;

    #[async_trait]
    impl ObjectStorage for NullStorage {
        async fn upload_object(
            &self,
            bucket: &str,
            key: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
        ) -> ConciergeResult<String> {
            Ok(format!("https://storage.test/{bucket}/{key}"))
        }
    }

    struct DownWhatsApp;

    #[async_trait]
    impl MessagingChannel for DownWhatsApp {
        async fn send_whatsapp(&self, _to: &str, _body: &str) -> ConciergeResult<DeliveryResult> {
            Err(ConciergeError::external("twilio", "503 Service Unavailable"))
        }
    }

    fn services(whatsapp: Arc<dyn MessagingChannel>) -> ConciergeServices {
        ConciergeServices::new(
            &CoreConfig::default(),
            Repositories::in_memory(),
            Adapters {
                whatsapp,
                email: Arc::new(LoggingEmailSender),
                storage: Arc::new(NullStorage),
                verifier: Arc::new(ManualReviewVerifier),
            },
            2,
        )
    }

    fn request() -> NewAppointment {
        let start = Utc::now() + ChronoDuration::hours(30);
        NewAppointment {
            buyer_id: BuyerId::new(),
            project_id: ProjectId::new(),
            title: "Consegna chiavi".to_string(),
            description: None,
            start_time: Some(start),
            end_time: Some(start + ChronoDuration::hours(1)),
            timezone: None,
            location: Location::physical("Via Roma 1, Milano"),
            kind: AppointmentType::Delivery,
            participants: vec![
                Participant {
                    id: ParticipantId::new(),
                    name: "Giulia Bianchi".to_string(),
                    email: Some("giulia@example.it".to_string()),
                    phone: None,
                    role: ParticipantRole::Buyer,
                },
                Participant {
                    id: ParticipantId::new(),
                    name: "Marco Rossi".to_string(),
                    email: None,
                    phone: Some("+393331234567".to_string()),
                    role: ParticipantRole::Agent,
                },
            ],
            attachments: vec![],
            notes: None,
        }
    }

    #[test]
    fn test_batch_outcome_processed() {
        let outcome = BatchOutcome {
            sent: 2,
            retried: 1,
            failed: 1,
        };
        assert_eq!(outcome.processed(), 4);
    }

    #[tokio::test]
    async fn test_deliver_due_reminders() {
        let services = services(Arc::new(LoggingWhatsApp));
        let appointment = services.appointments.schedule(request()).await.unwrap();
        services
            .reminders
            .schedule_for(&appointment, &[ChronoDuration::hours(24)], Utc::now())
            .await
            .unwrap();

        let too_early = deliver_due_reminders(&services, 10, Utc::now()).await.unwrap();
        assert_eq!(too_early, BatchOutcome::default());

        let later = appointment.start_time - ChronoDuration::hours(23);
        let outcome = deliver_due_reminders(&services, 10, later).await.unwrap();
        assert_eq!(outcome.sent, 2);

        let reminders = services
            .reminders
            .list_for_appointment(appointment.id)
            .await
            .unwrap();
        assert!(reminders.iter().all(|r| r.status == ReminderStatus::Sent));
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried_then_failed() {
        let services = services(Arc::new(DownWhatsApp));
        let appointment = services.appointments.schedule(request()).await.unwrap();
        services
            .reminders
            .schedule_for(&appointment, &[ChronoDuration::hours(1)], Utc::now())
            .await
            .unwrap();

        let now = appointment.start_time;
        let first = deliver_due_reminders(&services, 10, now).await.unwrap();
        assert_eq!(first.sent, 1);
        assert_eq!(first.retried, 1);

        let second = deliver_due_reminders(&services, 10, now + ChronoDuration::minutes(3))
            .await
            .unwrap();
        assert_eq!(second.failed, 1);
    }

    #[tokio::test]
    async fn test_purge_finished_reminders_respects_retention() {
        let services = services(Arc::new(LoggingWhatsApp));
        let appointment = services.appointments.schedule(request()).await.unwrap();
        services
            .reminders
            .schedule_for(&appointment, &[ChronoDuration::hours(24)], Utc::now())
            .await
            .unwrap();
        let sent_at = appointment.start_time - ChronoDuration::hours(23);
        deliver_due_reminders(&services, 10, sent_at).await.unwrap();

        assert_eq!(purge_finished_reminders(&services, 30, sent_at).await.unwrap(), 0);

        let much_later = sent_at + ChronoDuration::days(31);
        assert_eq!(purge_finished_reminders(&services, 30, much_later).await.unwrap(), 2);
        assert!(
            services
                .reminders
                .list_for_appointment(appointment.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_run_worker_stops_on_cancel() {
        let services = services(Arc::new(LoggingWhatsApp));
        let token = CancellationToken::new();
        let config = Config {
            core: CoreConfig::default(),
            integrations: integrations::IntegrationsConfig {
                smtp: None,
                twilio: None,
                doc_hunter: None,
                storage: integrations::StorageConfig::Filesystem {
                    root: "unused".into(),
                    public_base_url: "http://localhost".to_string(),
                },
            },
            poll_interval_secs: 3600,
            max_retry_count: 2,
            batch_size: 10,
            status_log_interval_secs: 60,
            purge_interval_secs: 3600,
            reminder_retention_days: 30,
        };

        let handle = tokio::spawn(run_worker(services, config, Some(token.clone())));
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
