//! Identity-document verification through the Doc Hunter API

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};
use urbanova_core::ports::{DocumentVerifier, VerificationOutcome, VerificationResult};
use urbanova_core::{ConciergeError, ConciergeResult};

use crate::config::DocHunterConfig;

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasons: Vec<String>,
}

fn outcome(status: &str) -> VerificationOutcome {
    match status.to_ascii_lowercase().as_str() {
        "verified" | "approved" => VerificationOutcome::Verified,
        "rejected" | "declined" => VerificationOutcome::Rejected,
        _ => VerificationOutcome::Inconclusive,
    }
}

pub struct DocHunterClient {
    client: Client,
    config: DocHunterConfig,
}

impl DocHunterClient {
    pub fn new(client: Client, config: DocHunterConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl DocumentVerifier for DocHunterClient {
    async fn verify_document(&self, document_id: &str) -> ConciergeResult<VerificationResult> {
        let url = format!(
            "{}/v1/documents/{}/verify",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(document_id)
        );

        let res = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                error!("Doc Hunter connection error: {}", e);
                ConciergeError::external("doc_hunter", e)
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            error!(%status, document_id, "Doc Hunter verification failed: {}", text);
            return Err(ConciergeError::external(
                "doc_hunter",
                format!("status {status}: {text}"),
            ));
        }

        let body: VerifyResponse = res
            .json()
            .await
            .map_err(|e| ConciergeError::external("doc_hunter", e))?;
        debug!(document_id, status = %body.status, "Document checked");

        Ok(VerificationResult {
            document_id: document_id.to_string(),
            outcome: outcome(&body.status),
            confidence: body.confidence.clamp(0.0, 1.0),
            reasons: body.reasons,
            checked_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn verify(Path(id): Path<String>, headers: HeaderMap) -> impl IntoResponse {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer dh-key") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
        }
        match id.as_str() {
            "passport-ok" => (
                StatusCode::OK,
                Json(json!({"status": "verified", "confidence": 0.97})),
            ),
            "blurry" => (
                StatusCode::OK,
                Json(json!({"status": "inconclusive", "confidence": 0.4, "reasons": ["low resolution"]})),
            ),
            _ => (StatusCode::NOT_FOUND, Json(json!({"error": "unknown document"}))),
        }
    }

    async fn mock_doc_hunter() -> String {
        let app = Router::new().route("/v1/documents/{id}/verify", post(verify));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn client(base_url: String, api_key: &str) -> DocHunterClient {
        DocHunterClient::new(
            Client::new(),
            DocHunterConfig {
                base_url,
                api_key: api_key.to_string(),
            },
        )
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(outcome("VERIFIED"), VerificationOutcome::Verified);
        assert_eq!(outcome("declined"), VerificationOutcome::Rejected);
        assert_eq!(outcome("manual_review"), VerificationOutcome::Inconclusive);
    }

    #[tokio::test]
    async fn test_verify_document() {
        let base_url = mock_doc_hunter().await;
        let client = client(base_url, "dh-key");

        let result = client.verify_document("passport-ok").await.unwrap();
        assert_eq!(result.outcome, VerificationOutcome::Verified);
        assert_eq!(result.document_id, "passport-ok");

        let result = client.verify_document("blurry").await.unwrap();
        assert_eq!(result.outcome, VerificationOutcome::Inconclusive);
        assert_eq!(result.reasons, vec!["low resolution".to_string()]);
    }

    #[tokio::test]
    async fn test_verify_document_errors() {
        let base_url = mock_doc_hunter().await;

        assert!(matches!(
            client(base_url.clone(), "dh-key").verify_document("missing").await,
            Err(ConciergeError::ExternalService { service: "doc_hunter", .. })
        ));
        assert!(matches!(
            client(base_url, "wrong").verify_document("passport-ok").await,
            Err(ConciergeError::ExternalService { .. })
        ));
    }
}
