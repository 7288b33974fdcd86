//! Appointment REST API endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use urbanova_core::models::{Appointment, AppointmentStatus, Participant, Reminder};
use urbanova_core::services::{ConciergeServices, NewAppointment, default_offsets};
use urbanova_core::types::{AppointmentId, BuyerId, ParticipantId};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

async fn create_appointment(
    State(services): State<ConciergeServices>,
    Json(req): Json<NewAppointment>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let appointment = services.appointments.schedule(req).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn get_appointment(
    State(services): State<ConciergeServices>,
    Path(id): Path<AppointmentId>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(services.appointments.get(id).await?))
}

async fn list_buyer_appointments(
    State(services): State<ConciergeServices>,
    Path(buyer_id): Path<BuyerId>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(services.appointments.list_for_buyer(buyer_id).await?))
}

/// Change the lifecycle status; cancelling also drops pending reminders
async fn update_status(
    State(services): State<ConciergeServices>,
    Path(id): Path<AppointmentId>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let appointment = services.appointments.transition(id, req.status).await?;
    if appointment.status == AppointmentStatus::Cancelled {
        services.reminders.cancel_for_appointment(id).await?;
    }
    Ok(Json(appointment))
}

/// Move an appointment; reminders already scheduled follow it
async fn reschedule(
    State(services): State<ConciergeServices>,
    Path(id): Path<AppointmentId>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let appointment = services
        .appointments
        .reschedule(id, req.start_time, req.end_time)
        .await?;

    if services.reminders.cancel_for_appointment(id).await? > 0 {
        services
            .reminders
            .schedule_for(&appointment, &default_offsets(), Utc::now())
            .await?;
    }
    Ok(Json(appointment))
}

async fn add_participant(
    State(services): State<ConciergeServices>,
    Path(id): Path<AppointmentId>,
    Json(participant): Json<Participant>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let appointment = services.appointments.add_participant(id, participant).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn remove_participant(
    State(services): State<ConciergeServices>,
    Path((id, participant_id)): Path<(AppointmentId, ParticipantId)>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(
        services
            .appointments
            .remove_participant(id, participant_id)
            .await?,
    ))
}

async fn delete_appointment(
    State(services): State<ConciergeServices>,
    Path(id): Path<AppointmentId>,
) -> Result<StatusCode, ApiError> {
    services.appointments.remove(id).await?;
    services.reminders.cancel_for_appointment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_reminders(
    State(services): State<ConciergeServices>,
    Path(id): Path<AppointmentId>,
) -> Result<Json<Vec<Reminder>>, ApiError> {
    services.appointments.get(id).await?;
    Ok(Json(services.reminders.list_for_appointment(id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(create_appointment))
        .route(
            "/appointments/{id}",
            get(get_appointment).delete(delete_appointment),
        )
        .route("/appointments/{id}/status", post(update_status))
        .route("/appointments/{id}/reschedule", post(reschedule))
        .route("/appointments/{id}/participants", post(add_participant))
        .route(
            "/appointments/{id}/participants/{participant_id}",
            delete(remove_participant),
        )
        .route("/appointments/{id}/reminders", get(list_reminders))
        .route("/buyers/{buyer_id}/appointments", get(list_buyer_appointments))
}
