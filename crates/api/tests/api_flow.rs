use api::{AppState, create_router};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use integrations::{FilesystemStorage, LoggingEmailSender, LoggingWhatsApp};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use urbanova_core::ConciergeResult;
use urbanova_core::config::CoreConfig;
use urbanova_core::ports::{DocumentVerifier, VerificationOutcome, VerificationResult};
use urbanova_core::services::{Adapters, ConciergeServices, Repositories};

/// Verifier that rejects documents whose id starts with `fake`
struct PrefixVerifier;

#[async_trait]
impl DocumentVerifier for PrefixVerifier {
    async fn verify_document(&self, document_id: &str) -> ConciergeResult<VerificationResult> {
        let outcome = if document_id.starts_with("fake") {
            VerificationOutcome::Rejected
        } else {
            VerificationOutcome::Verified
        };
        Ok(VerificationResult {
            document_id: document_id.to_string(),
            outcome,
            confidence: 0.95,
            reasons: vec![],
            checked_at: Utc::now(),
        })
    }
}

fn setup() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let adapters = Adapters {
        whatsapp: Arc::new(LoggingWhatsApp),
        email: Arc::new(LoggingEmailSender),
        storage: Arc::new(FilesystemStorage::new(
            dir.path(),
            "http://localhost:3000/files",
        )),
        verifier: Arc::new(PrefixVerifier),
    };
    let services = ConciergeServices::new(
        &CoreConfig::default(),
        Repositories::in_memory(),
        adapters,
        3,
    );
    let app = create_router(AppState::new(services), "*").unwrap();
    (app, dir)
}

fn create_request(method: &str, uri: impl AsRef<str>, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri.as_ref())
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

async fn call(app: &Router, method: &str, uri: impl AsRef<str>, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map_or_else(Body::empty, |v| Body::from(v.to_string()));
    let response = app
        .clone()
        .oneshot(create_request(method, uri, body))
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn appointment_body(buyer_id: uuid::Uuid) -> Value {
    json!({
        "buyer_id": buyer_id,
        "project_id": uuid::Uuid::new_v4(),
        "title": "Scelta finiture",
        "start_time": "2030-03-11T09:00:00Z",
        "end_time": "2030-03-11T10:30:00Z",
        "timezone": "Europe/Rome",
        "location": { "kind": "physical", "address": "Via Roma 1, Milano" },
        "type": "fitting",
        "participants": [
            { "name": "Giulia Bianchi", "email": "giulia@example.it", "role": "buyer" },
            { "name": "Marco Rossi", "phone": "+39 333 123 4567", "role": "agent" }
        ]
    })
}

#[tokio::test]
async fn test_health() {
    let (app, _dir) = setup();
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_appointment_lifecycle() {
    let (app, _dir) = setup();
    let buyer_id = uuid::Uuid::new_v4();

    // 1. Schedule
    let (status, created) = call(&app, "POST", "/api/appointments", Some(appointment_body(buyer_id))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "scheduled");
    assert_eq!(created["type"], "fitting");
    let id = created["id"].as_str().unwrap().to_string();

    // 2. Read back and list
    let (status, fetched) = call(&app, "GET", format!("/api/appointments/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Scelta finiture");

    let (_, listed) = call(&app, "GET", format!("/api/buyers/{buyer_id}/appointments"), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // 3. Participants
    let (status, updated) = call(
        &app,
        "POST",
        format!("/api/appointments/{id}/participants"),
        Some(json!({ "name": "Ceramiche Lombarde", "email": "ordini@ceramiche.example.it", "role": "vendor" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let participants = updated["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 3);
    let vendor_id = participants[2]["id"].as_str().unwrap().to_string();

    let (status, updated) = call(
        &app,
        "DELETE",
        format!("/api/appointments/{id}/participants/{vendor_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["participants"].as_array().unwrap().len(), 2);

    // 4. Status transitions
    let (status, confirmed) = call(
        &app,
        "POST",
        format!("/api/appointments/{id}/status"),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (status, _) = call(
        &app,
        "POST",
        format!("/api/appointments/{id}/status"),
        Some(json!({ "status": "scheduled" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, moved) = call(
        &app,
        "POST",
        format!("/api/appointments/{id}/reschedule"),
        Some(json!({ "start_time": "2030-03-12T09:00:00Z", "end_time": "2030-03-12T10:30:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["start_time"], "2030-03-12T09:00:00Z");

    // 5. Soft removal
    let (status, _) = call(&app, "DELETE", format!("/api/appointments/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, "GET", format!("/api/appointments/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn test_schedule_validation_errors() {
    let (app, _dir) = setup();

    let mut body = appointment_body(uuid::Uuid::new_v4());
    body.as_object_mut().unwrap().remove("start_time");
    let (status, err) = call(&app, "POST", "/api/appointments", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["details"].as_str().unwrap().contains("start_time"));

    let mut body = appointment_body(uuid::Uuid::new_v4());
    body["end_time"] = json!("2030-03-11T08:00:00Z");
    let (status, _) = call(&app, "POST", "/api/appointments", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "GET", format!("/api/appointments/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ics_flow() {
    let (app, _dir) = setup();
    let (_, created) = call(&app, "POST", "/api/appointments", Some(appointment_body(uuid::Uuid::new_v4()))).await;
    let id = created["id"].as_str().unwrap().to_string();

    // Generate with reminders
    let (status, file) = call(
        &app,
        "POST",
        format!("/api/appointments/{id}/ics"),
        Some(json!({ "schedule_reminders": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(file["reminders_scheduled"], 4);
    let file_id = file["id"].as_str().unwrap().to_string();
    let etag = file["etag"].as_str().unwrap().to_string();
    assert!(file["download_url"].as_str().unwrap().ends_with(".ics"));

    let (_, reminders) = call(&app, "GET", format!("/api/appointments/{id}/reminders"), None).await;
    assert_eq!(reminders.as_array().unwrap().len(), 4);

    // Download
    let response = app
        .clone()
        .oneshot(create_request("GET", format!("/api/ics/{file_id}/download"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/calendar; charset=utf-8"
    );
    assert_eq!(response.headers().get(header::ETAG).unwrap(), etag.as_str());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let content = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(content.contains("DTSTART;TZID=Europe/Rome:20300311T100000"));
    assert!(content.contains("SUMMARY:Finiture Appartamento"));

    // Conditional download
    let mut request = create_request("GET", format!("/api/ics/{file_id}/download"), Body::empty());
    request
        .headers_mut()
        .insert(header::IF_NONE_MATCH, etag.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

    // Validate raw content
    let response = app
        .clone()
        .oneshot(create_request("POST", "/api/ics/validate", Body::from(content.clone())))
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let report: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(report["valid"], true);

    let response = app
        .clone()
        .oneshot(create_request("POST", "/api/ics/validate", Body::empty()))
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let report: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(report["valid"], false);
    assert!(report["errors"].as_array().unwrap().len() >= 4);

    // Overwrite content: invalid rejected, valid accepted
    let response = app
        .clone()
        .oneshot(create_request("PUT", format!("/api/ics/{file_id}/content"), Body::from("BEGIN:VCALENDAR")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let replacement = content.replace("Finiture Appartamento", "Finiture Bagno");
    let response = app
        .clone()
        .oneshot(create_request("PUT", format!("/api/ics/{file_id}/content"), Body::from(replacement)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Overwrite URL
    let (status, updated) = call(
        &app,
        "PUT",
        format!("/api/ics/{file_id}/url"),
        Some(json!({ "download_url": "https://cdn.urbanova.app/invito.ics" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["download_url"], "https://cdn.urbanova.app/invito.ics");

    // Share by e-mail: only the buyer has an address
    let (status, shared) = call(&app, "POST", format!("/api/ics/{file_id}/share"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shared["sent"], 1);

    // Cancelling the appointment cancels its reminders
    call(
        &app,
        "POST",
        format!("/api/appointments/{id}/status"),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    let (_, reminders) = call(&app, "GET", format!("/api/appointments/{id}/reminders"), None).await;
    assert!(
        reminders
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["status"] == "cancelled")
    );
}

#[tokio::test]
async fn test_kyc_flow() {
    let (app, _dir) = setup();
    let buyer_id = uuid::Uuid::new_v4();

    let (status, case) = call(
        &app,
        "POST",
        "/api/kyc",
        Some(json!({
            "buyer_id": buyer_id,
            "documents": [
                { "id": "passport-123", "kind": "passport" },
                { "id": "cf-456", "kind": "tax_code" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(case["status"], "pending");
    let case_id = case["id"].as_str().unwrap().to_string();

    let (status, verified) = call(&app, "POST", format!("/api/kyc/{case_id}/verify"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["status"], "verified");

    let (_, fetched) = call(&app, "GET", format!("/api/kyc/{case_id}"), None).await;
    assert_eq!(fetched["status"], "verified");

    let (_, case) = call(
        &app,
        "POST",
        "/api/kyc",
        Some(json!({ "buyer_id": buyer_id, "documents": [{ "id": "fake-1", "kind": "identity_card" }] })),
    )
    .await;
    let case_id = case["id"].as_str().unwrap().to_string();
    let (_, rejected) = call(&app, "POST", format!("/api/kyc/{case_id}/verify"), None).await;
    assert_eq!(rejected["status"], "rejected");

    let (status, _) = call(&app, "POST", "/api/kyc", Some(json!({ "buyer_id": buyer_id, "documents": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
