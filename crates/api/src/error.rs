//! Error handling for API endpoints

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use urbanova_core::ConciergeError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// API error type that can be converted to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", Some(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", Some(msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg)),
            ApiError::BadGateway(msg) => {
                tracing::warn!("Upstream provider failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "Bad Gateway", Some(msg))
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<ConciergeError> for ApiError {
    fn from(err: ConciergeError) -> Self {
        match err {
            ConciergeError::Validation(_) | ConciergeError::InvalidTimezone(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ConciergeError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            ConciergeError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            ConciergeError::ExternalService { .. } => ApiError::BadGateway(err.to_string()),
            ConciergeError::Generation(_) | ConciergeError::Storage(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            error: "Not Found".to_string(),
            details: Some("Appointment not found: 42".to_string()),
        };

        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("Not Found"));
        assert!(json.contains("Appointment not found"));
    }

    #[test]
    fn test_error_response_without_details() {
        let error = ErrorResponse {
            error: "Internal Server Error".to_string(),
            details: None,
        };

        let json = serde_json::to_string(&error).unwrap();
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_concierge_error_conversion() {
        let cases = [
            (ConciergeError::validation("bad"), StatusCode::BAD_REQUEST),
            (ConciergeError::not_found("Appointment", "x"), StatusCode::NOT_FOUND),
            (
                ConciergeError::InvalidTransition {
                    from: "completed".to_string(),
                    to: "cancelled".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (ConciergeError::external("twilio", "down"), StatusCode::BAD_GATEWAY),
            (
                ConciergeError::Storage("disk full".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_not_found_keeps_details() {
        match ApiError::from(ConciergeError::not_found("KycCase", "abc")) {
            ApiError::NotFound(msg) => assert!(msg.contains("abc")),
            other => panic!("Expected NotFound error, got {other:?}"),
        }
    }
}
