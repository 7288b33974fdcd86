//! SMTP e-mail delivery
//!
//! Plain-text messages, optionally with a single attachment (the calendar
//! invite) sent as `multipart/mixed`.

use async_trait::async_trait;
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::PoolConfig;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;
use urbanova_core::ports::{DeliveryResult, EmailAttachment, EmailSender};
use urbanova_core::{ConciergeError, ConciergeResult};

use crate::config::SmtpConfig;

/// Mailer errors
#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Failed to send email: {0}")]
    SendFailed(String),
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
    #[error("SMTP connection failed: {0}")]
    ConnectionFailed(String),
}

impl From<MailerError> for ConciergeError {
    fn from(err: MailerError) -> Self {
        match err {
            MailerError::InvalidAddress(msg) => ConciergeError::Validation(msg),
            other => ConciergeError::external("smtp", other),
        }
    }
}

pub type Mailer = AsyncSmtpTransport<Tokio1Executor>;

/// Create a reusable SMTP transport
pub fn create_mailer(config: &SmtpConfig) -> Result<Mailer, MailerError> {
    let pool = PoolConfig::new().max_size(config.pool_size);

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        Ok(AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| MailerError::ConnectionFailed(format!("Failed to create transport: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .pool_config(pool)
            .build())
    } else {
        // Unauthenticated SMTP (local relays, mailpit)
        Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .pool_config(pool)
            .build())
    }
}

/// Build the MIME message
pub fn build_message(
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
    attachment: Option<&EmailAttachment>,
) -> Result<Message, MailerError> {
    let builder = Message::builder()
        .from(
            from.parse()
                .map_err(|e| MailerError::InvalidAddress(format!("Invalid from address: {}", e)))?,
        )
        .to(to
            .parse()
            .map_err(|e| MailerError::InvalidAddress(format!("Invalid to address: {}", e)))?)
        .subject(subject);

    let message = match attachment {
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string()),
        Some(file) => {
            let content_type = ContentType::parse(&file.content_type).map_err(|e| {
                MailerError::SendFailed(format!("Invalid attachment content type: {}", e))
            })?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(
                        Attachment::new(file.filename.clone())
                            .body(file.content.clone(), content_type),
                    ),
            )
        }
    };

    message.map_err(|e| MailerError::SendFailed(format!("Failed to build message: {}", e)))
}

pub struct SmtpEmailSender {
    mailer: Mailer,
    from: String,
}

impl SmtpEmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        Ok(Self {
            mailer: create_mailer(config)?,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<&EmailAttachment>,
    ) -> ConciergeResult<DeliveryResult> {
        let message = build_message(&self.from, to, subject, body, attachment)?;

        let response = self
            .mailer
            .send(message)
            .await
            .map_err(|e| MailerError::SendFailed(format!("Failed to send email: {}", e)))?;

        info!("Email sent successfully to {}", to);

        Ok(DeliveryResult {
            provider_id: response.message().collect::<Vec<_>>().join(" "),
            accepted_at: Utc::now(),
        })
    }
}
