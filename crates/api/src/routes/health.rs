//! Health check endpoint

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use urbanova_core::services::ConciergeServices;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
}

/// Returns 200 OK if the server and its repository are healthy
async fn health_check(State(services): State<ConciergeServices>) -> Response {
    let storage = match services.appointments.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::error!("Storage health check failed: {}", e);
            "unhealthy"
        }
    };

    let healthy = storage == "healthy";
    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        storage: storage.to_string(),
    };
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response)).into_response()
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
