//! Fallback adapters used when a provider is not configured
//!
//! Nothing leaves the process: messages are logged and accepted, documents
//! are left for manual review.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use urbanova_core::ConciergeResult;
use urbanova_core::ports::{
    DeliveryResult, DocumentVerifier, EmailAttachment, EmailSender, MessagingChannel,
    VerificationOutcome, VerificationResult,
};
use uuid::Uuid;

fn logged() -> DeliveryResult {
    DeliveryResult {
        provider_id: format!("logged-{}", Uuid::new_v4()),
        accepted_at: Utc::now(),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingWhatsApp;

#[async_trait]
impl MessagingChannel for LoggingWhatsApp {
    async fn send_whatsapp(&self, to: &str, body: &str) -> ConciergeResult<DeliveryResult> {
        info!(to, body, "WhatsApp delivery skipped (Twilio not configured)");
        Ok(logged())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        _body: &str,
        attachment: Option<&EmailAttachment>,
    ) -> ConciergeResult<DeliveryResult> {
        info!(
            to,
            subject,
            attachment = attachment.map(|a| a.filename.as_str()),
            "Email delivery skipped (SMTP not configured)"
        );
        Ok(logged())
    }
}

/// Marks every document inconclusive so cases land in `needs_review`
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualReviewVerifier;

#[async_trait]
impl DocumentVerifier for ManualReviewVerifier {
    async fn verify_document(&self, document_id: &str) -> ConciergeResult<VerificationResult> {
        warn!(document_id, "Doc Hunter not configured, document queued for manual review");
        Ok(VerificationResult {
            document_id: document_id.to_string(),
            outcome: VerificationOutcome::Inconclusive,
            confidence: 0.0,
            reasons: vec!["automatic verification unavailable".to_string()],
            checked_at: Utc::now(),
        })
    }
}
