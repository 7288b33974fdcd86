//! Urbanova Integrations - outbound provider adapters
//!
//! Implementations of the core ports: SMTP e-mail, Twilio WhatsApp,
//! Doc Hunter verification and object storage.

pub mod config;
pub mod doc_hunter;
pub mod logging;
pub mod smtp;
pub mod storage;
pub mod twilio;

use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use urbanova_core::ports::{DocumentVerifier, EmailSender, MessagingChannel, ObjectStorage};
use urbanova_core::services::Adapters;

pub use config::{DocHunterConfig, IntegrationsConfig, SmtpConfig, StorageConfig, TwilioConfig};
pub use doc_hunter::DocHunterClient;
pub use logging::{LoggingEmailSender, LoggingWhatsApp, ManualReviewVerifier};
pub use smtp::SmtpEmailSender;
pub use storage::{FilesystemStorage, GcsStorage};
pub use twilio::TwilioWhatsApp;

/// Build the adapter set, falling back to logging adapters for missing providers
pub fn build_adapters(config: &IntegrationsConfig) -> Result<Adapters> {
    let http = Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .context("Failed to build HTTP client")?;

    let email: Arc<dyn EmailSender> = match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "SMTP delivery enabled");
            Arc::new(SmtpEmailSender::new(smtp).context("Failed to create SMTP transport")?)
        }
        None => Arc::new(LoggingEmailSender),
    };

    let whatsapp: Arc<dyn MessagingChannel> = match &config.twilio {
        Some(twilio) => {
            info!("Twilio WhatsApp delivery enabled");
            Arc::new(TwilioWhatsApp::new(http.clone(), twilio.clone()))
        }
        None => Arc::new(LoggingWhatsApp),
    };

    let verifier: Arc<dyn DocumentVerifier> = match &config.doc_hunter {
        Some(doc_hunter) => Arc::new(DocHunterClient::new(http.clone(), doc_hunter.clone())),
        None => Arc::new(ManualReviewVerifier),
    };

    let storage: Arc<dyn ObjectStorage> = match &config.storage {
        StorageConfig::Gcs {
            base_url,
            access_token,
            public_base_url,
        } => Arc::new(GcsStorage::new(
            http,
            base_url.clone(),
            access_token.clone(),
            public_base_url.clone(),
        )),
        StorageConfig::Filesystem {
            root,
            public_base_url,
        } => Arc::new(FilesystemStorage::new(root.clone(), public_base_url.clone())),
    };

    Ok(Adapters {
        whatsapp,
        email,
        storage,
        verifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_adapters_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let config = IntegrationsConfig {
            smtp: None,
            twilio: None,
            doc_hunter: None,
            storage: StorageConfig::Filesystem {
                root: dir.path().to_path_buf(),
                public_base_url: "http://localhost:3000/files".to_string(),
            },
        };

        let adapters = build_adapters(&config).unwrap();
        let url = adapters
            .storage
            .upload_object("cal", "a.ics", b"x".to_vec(), "text/calendar")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/files/cal/a.ics");
        assert!(
            adapters
                .whatsapp
                .send_whatsapp("+393331234567", "ciao")
                .await
                .is_ok()
        );
    }
}
