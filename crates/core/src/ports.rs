//! Injected interfaces between the domain services and the outside world
//!
//! Persistence goes through [`Repository`]; each third-party system gets a
//! narrow capability trait so real SDK adapters (see the `integrations` crate)
//! and in-process fakes are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt::Display;
use std::hash::Hash;

use crate::error::ConciergeResult;

/// A record that can be stored in a [`Repository`]
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + Display + Send + Sync + 'static;

    /// Collection (table partition) the entity lives in
    const COLLECTION: &'static str;

    fn id(&self) -> Self::Id;
}

/// Keyed storage for one entity type
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn get(&self, id: &T::Id) -> ConciergeResult<Option<T>>;

    /// Insert or replace
    async fn put(&self, entity: T) -> ConciergeResult<()>;

    async fn list(&self) -> ConciergeResult<Vec<T>>;

    /// Returns whether a record was removed
    async fn delete(&self, id: &T::Id) -> ConciergeResult<bool>;

    /// Records whose top-level string field `field` equals `value`
    ///
    /// The default scans [`Repository::list`]; stores that can filter
    /// natively override it.
    async fn list_by_field(&self, field: &str, value: &str) -> ConciergeResult<Vec<T>> {
        let mut matching = Vec::new();
        for entity in self.list().await? {
            if serde_json::to_value(&entity)?.get(field).and_then(Value::as_str) == Some(value) {
                matching.push(entity);
            }
        }
        Ok(matching)
    }

    /// Cheap reachability check for health endpoints
    async fn ping(&self) -> ConciergeResult<()> {
        Ok(())
    }
}

/// Provider acknowledgement for an outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Message id assigned by the provider
    pub provider_id: String,
    pub accepted_at: DateTime<Utc>,
}

/// WhatsApp / SMS delivery (Twilio)
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    /// `to` is an E.164 phone number
    async fn send_whatsapp(&self, to: &str, body: &str) -> ConciergeResult<DeliveryResult>;
}

/// File attached to an outbound e-mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Transactional e-mail delivery
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<&EmailAttachment>,
    ) -> ConciergeResult<DeliveryResult>;
}

/// Blob storage for generated artifacts
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `bucket/key` and return a URL clients can download from
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ConciergeResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified,
    Rejected,
    Inconclusive,
}

/// Verdict on a single identity document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub document_id: String,
    pub outcome: VerificationOutcome,
    /// Provider confidence in `[0, 1]`
    pub confidence: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

/// Identity-document verification (Doc Hunter)
#[async_trait]
pub trait DocumentVerifier: Send + Sync {
    async fn verify_document(&self, document_id: &str) -> ConciergeResult<VerificationResult>;
}
