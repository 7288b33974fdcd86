//! KYC case endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use urbanova_core::models::KycCase;
use urbanova_core::services::{ConciergeServices, NewKycDocument};
use urbanova_core::types::{BuyerId, KycCaseId};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct OpenCaseRequest {
    pub buyer_id: BuyerId,
    pub documents: Vec<NewKycDocument>,
}

async fn open_case(
    State(services): State<ConciergeServices>,
    Json(req): Json<OpenCaseRequest>,
) -> Result<(StatusCode, Json<KycCase>), ApiError> {
    let case = services.kyc.open_case(req.buyer_id, req.documents).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

async fn verify_case(
    State(services): State<ConciergeServices>,
    Path(id): Path<KycCaseId>,
) -> Result<Json<KycCase>, ApiError> {
    Ok(Json(services.kyc.verify(id).await?))
}

async fn get_case(
    State(services): State<ConciergeServices>,
    Path(id): Path<KycCaseId>,
) -> Result<Json<KycCase>, ApiError> {
    Ok(Json(services.kyc.get(id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/kyc", post(open_case))
        .route("/kyc/{id}", get(get_case))
        .route("/kyc/{id}/verify", post(verify_case))
}
