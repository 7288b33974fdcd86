//! Calendar file endpoints: generation, download, overwrite and validation

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use urbanova_core::ics::{ValidationReport, validate_ics};
use urbanova_core::models::IcsFile;
use urbanova_core::services::{
    CalendarRequest, ConciergeServices, content_etag, default_offsets,
};
use urbanova_core::timezone::Timezone;
use urbanova_core::types::{AppointmentId, IcsFileId};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateIcsRequest {
    pub include_attachments: Option<bool>,
    pub include_recurrence: Option<bool>,
    pub timezone: Option<Timezone>,
    /// Also schedule the default reminders for every participant
    pub schedule_reminders: bool,
}

/// Calendar file metadata
#[derive(Debug, Serialize)]
pub struct IcsFileResponse {
    pub id: IcsFileId,
    pub filename: String,
    pub events: Vec<AppointmentId>,
    pub download_url: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub etag: String,
}

impl From<IcsFile> for IcsFileResponse {
    fn from(file: IcsFile) -> Self {
        Self {
            etag: content_etag(&file.content),
            id: file.id,
            filename: file.filename,
            events: file.events,
            download_url: file.download_url,
            generated_at: file.generated_at,
            expires_at: file.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateIcsResponse {
    #[serde(flatten)]
    pub file: IcsFileResponse,
    pub reminders_scheduled: usize,
}

#[derive(Debug, Deserialize)]
pub struct DownloadUrlRequest {
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub sent: usize,
}

async fn generate_ics(
    State(services): State<ConciergeServices>,
    Path(id): Path<AppointmentId>,
    Json(req): Json<GenerateIcsRequest>,
) -> Result<(StatusCode, Json<GenerateIcsResponse>), ApiError> {
    let defaults = CalendarRequest::default();
    let request = CalendarRequest {
        include_attachments: req.include_attachments.unwrap_or(defaults.include_attachments),
        include_recurrence: req.include_recurrence.unwrap_or(defaults.include_recurrence),
        timezone: req.timezone,
    };
    let file = services.calendars.generate(id, request).await?;

    let mut reminders_scheduled = 0;
    if req.schedule_reminders {
        let appointment = services.appointments.get(id).await?;
        reminders_scheduled = services
            .reminders
            .schedule_for(&appointment, &default_offsets(), Utc::now())
            .await?
            .len();
    }

    Ok((
        StatusCode::CREATED,
        Json(GenerateIcsResponse {
            file: file.into(),
            reminders_scheduled,
        }),
    ))
}

async fn get_ics(
    State(services): State<ConciergeServices>,
    Path(id): Path<IcsFileId>,
) -> Result<Json<IcsFileResponse>, ApiError> {
    Ok(Json(services.calendars.get(id).await?.into()))
}

/// Serve the calendar body; honours `If-None-Match`
async fn download_ics(
    State(services): State<ConciergeServices>,
    Path(id): Path<IcsFileId>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let file = services.calendars.download(id, Utc::now()).await?;
    let etag = content_etag(&file.content);

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag || tag.trim() == "*"));
    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
            (header::ETAG, etag),
        ],
        file.content,
    )
        .into_response())
}

async fn overwrite_content(
    State(services): State<ConciergeServices>,
    Path(id): Path<IcsFileId>,
    body: String,
) -> Result<Json<IcsFileResponse>, ApiError> {
    Ok(Json(
        services
            .calendars
            .overwrite_content(id, body, Utc::now())
            .await?
            .into(),
    ))
}

async fn overwrite_url(
    State(services): State<ConciergeServices>,
    Path(id): Path<IcsFileId>,
    Json(req): Json<DownloadUrlRequest>,
) -> Result<Json<IcsFileResponse>, ApiError> {
    Ok(Json(
        services
            .calendars
            .overwrite_download_url(id, &req.download_url)
            .await?
            .into(),
    ))
}

async fn share_ics(
    State(services): State<ConciergeServices>,
    Path(id): Path<IcsFileId>,
) -> Result<Json<ShareResponse>, ApiError> {
    let deliveries = services.calendars.share(id, Utc::now()).await?;
    Ok(Json(ShareResponse {
        sent: deliveries.len(),
    }))
}

async fn validate(body: String) -> Json<ValidationReport> {
    Json(validate_ics(&body))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/appointments/{id}/ics", post(generate_ics))
        .route("/ics/validate", post(validate))
        .route("/ics/{id}", get(get_ics))
        .route("/ics/{id}/download", get(download_ics))
        .route("/ics/{id}/content", put(overwrite_content))
        .route("/ics/{id}/url", put(overwrite_url))
        .route("/ics/{id}/share", post(share_ics))
}
