//! Domain services
//!
//! Services own the business rules and talk to the outside world only
//! through the traits in [`crate::ports`].

mod appointment;
mod calendar_file;
mod kyc;
mod reminder;

pub use appointment::{AppointmentService, DEFAULT_DURATION_MINUTES, NewAppointment};
pub use calendar_file::{CalendarRequest, IcsFileService, content_etag};
pub use kyc::{KycService, NewKycDocument};
pub use reminder::{DEFAULT_REMINDER_OFFSETS_HOURS, ReminderService, default_offsets};

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::CoreConfig;
use crate::models::{Appointment, IcsFile, KycCase, Reminder};
use crate::ports::{DocumentVerifier, EmailSender, MessagingChannel, ObjectStorage, Repository};
use crate::store::{InMemoryRepository, PgRepository};

/// Storage for every entity the services persist
#[derive(Clone)]
pub struct Repositories {
    pub appointments: Arc<dyn Repository<Appointment>>,
    pub ics_files: Arc<dyn Repository<IcsFile>>,
    pub reminders: Arc<dyn Repository<Reminder>>,
    pub kyc_cases: Arc<dyn Repository<KycCase>>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            appointments: Arc::new(InMemoryRepository::new()),
            ics_files: Arc::new(InMemoryRepository::new()),
            reminders: Arc::new(InMemoryRepository::new()),
            kyc_cases: Arc::new(InMemoryRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            appointments: Arc::new(PgRepository::new(pool.clone())),
            ics_files: Arc::new(PgRepository::new(pool.clone())),
            reminders: Arc::new(PgRepository::new(pool.clone())),
            kyc_cases: Arc::new(PgRepository::new(pool)),
        }
    }
}

/// Outbound providers
#[derive(Clone)]
pub struct Adapters {
    pub whatsapp: Arc<dyn MessagingChannel>,
    pub email: Arc<dyn EmailSender>,
    pub storage: Arc<dyn ObjectStorage>,
    pub verifier: Arc<dyn DocumentVerifier>,
}

/// All services, wired together
#[derive(Clone)]
pub struct ConciergeServices {
    pub appointments: Arc<AppointmentService>,
    pub calendars: Arc<IcsFileService>,
    pub reminders: Arc<ReminderService>,
    pub kyc: Arc<KycService>,
}

impl ConciergeServices {
    pub fn new(
        config: &CoreConfig,
        repos: Repositories,
        adapters: Adapters,
        max_retry_count: u32,
    ) -> Self {
        let appointments = Arc::new(AppointmentService::new(
            repos.appointments,
            config.default_timezone.clone(),
        ));
        let calendars = Arc::new(IcsFileService::new(
            appointments.clone(),
            repos.ics_files,
            adapters.storage,
            adapters.email.clone(),
            config,
        ));
        let reminders = Arc::new(ReminderService::new(
            repos.reminders,
            adapters.whatsapp,
            adapters.email,
            max_retry_count,
        ));
        let kyc = Arc::new(KycService::new(repos.kyc_cases, adapters.verifier));

        Self {
            appointments,
            calendars,
            reminders,
            kyc,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Recording fakes for the outbound ports

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::NewAppointment;
    use crate::error::{ConciergeError, ConciergeResult};
    use crate::models::{AppointmentType, Location, Participant, ParticipantRole};
    use crate::ports::{
        DeliveryResult, DocumentVerifier, EmailAttachment, EmailSender, MessagingChannel,
        ObjectStorage, VerificationOutcome, VerificationResult,
    };
    use crate::timezone::Timezone;
    use crate::types::{BuyerId, ParticipantId, ProjectId};

    /// Fitting appointment in Milan with a buyer (e-mail) and an agent (phone)
    pub fn new_appointment() -> NewAppointment {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        NewAppointment {
            buyer_id: BuyerId::new(),
            project_id: ProjectId::new(),
            title: "Scelta finiture".to_string(),
            description: Some("Pavimenti e rivestimenti".to_string()),
            start_time: Some(start),
            end_time: Some(start + chrono::Duration::minutes(90)),
            timezone: Some(Timezone::default()),
            location: Location::physical("Via Roma 1, Milano"),
            kind: AppointmentType::Fitting,
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
                    phone: Some("+39 333 123 4567".to_string()),
                    role: ParticipantRole::Agent,
                },
            ],
            attachments: vec![],
            notes: None,
        }
    }

    fn accepted(prefix: &str, n: usize) -> DeliveryResult {
        DeliveryResult {
            provider_id: format!("{prefix}-{n}"),
            accepted_at: Utc::now(),
        }
    }

    #[derive(Default)]
    pub struct RecordingWhatsapp {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail: AtomicBool,
    }

    impl RecordingWhatsapp {
        pub fn failing() -> Self {
            let channel = Self::default();
            channel.fail.store(true, Ordering::SeqCst);
            channel
        }
    }

    #[async_trait]
    impl MessagingChannel for RecordingWhatsapp {
        async fn send_whatsapp(&self, to: &str, body: &str) -> ConciergeResult<DeliveryResult> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ConciergeError::external("twilio", "503 Service Unavailable"));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push((to.to_string(), body.to_string()));
            Ok(accepted("SM", sent.len()))
        }
    }

    #[derive(Debug, Clone)]
    pub struct SentEmail {
        pub to: String,
        pub subject: String,
        pub body: String,
        pub attachment: Option<EmailAttachment>,
    }

    #[derive(Default)]
    pub struct RecordingEmail {
        pub sent: Mutex<Vec<SentEmail>>,
    }

    #[async_trait]
    impl EmailSender for RecordingEmail {
        async fn send_email(
            &self,
            to: &str,
            subject: &str,
            body: &str,
            attachment: Option<&EmailAttachment>,
        ) -> ConciergeResult<DeliveryResult> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
                attachment: attachment.cloned(),
            });
            Ok(accepted("email", sent.len()))
        }
    }

    #[derive(Default)]
    pub struct MemoryStorage {
        pub objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl ObjectStorage for MemoryStorage {
        async fn upload_object(
            &self,
            bucket: &str,
            key: &str,
            bytes: Vec<u8>,
            _content_type: &str,
        ) -> ConciergeResult<String> {
            let path = format!("{bucket}/{key}");
            self.objects.lock().unwrap().insert(path.clone(), bytes);
            Ok(format!("https://storage.test/{path}"))
        }
    }

    /// Verifier answering from a fixed table; unknown documents are an error
    #[derive(Default)]
    pub struct TableVerifier {
        pub outcomes: HashMap<String, VerificationOutcome>,
    }

    impl TableVerifier {
        pub fn with(entries: &[(&str, VerificationOutcome)]) -> Self {
            Self {
                outcomes: entries
                    .iter()
                    .map(|(id, outcome)| (id.to_string(), *outcome))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl DocumentVerifier for TableVerifier {
        async fn verify_document(&self, document_id: &str) -> ConciergeResult<VerificationResult> {
            let outcome = self
                .outcomes
                .get(document_id)
                .copied()
                .ok_or_else(|| ConciergeError::external("doc_hunter", "document not found"))?;
            Ok(VerificationResult {
                document_id: document_id.to_string(),
                outcome,
                confidence: 0.9,
                reasons: vec![],
                checked_at: Utc::now(),
            })
        }
    }
}
