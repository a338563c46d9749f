//! Refund API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppError, AppResult};
use shared::models::{Refund, RefundStatus};

use crate::api::auth::{AdminUser, CurrentUser};
use crate::core::ServerState;
use crate::lifecycle::{RefundRequest, RefundTransitionExtras};

/// Own refunds; every refund for admins
pub async fn list(
    State(state): State<ServerState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<Vec<Refund>>> {
    let refunds = state.engine.list_refunds(&user)?;
    Ok(ApiResponse::success(refunds))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Refund>> {
    let refund = state.engine.get_refund(&user, &id)?;
    Ok(ApiResponse::success(refund))
}

/// Request a return for a delivered order
pub async fn create(
    State(state): State<ServerState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<RefundRequest>,
) -> AppResult<ApiResponse<Refund>> {
    let (refund, effects) = state.engine.create_refund(&user, req)?;
    state.deliver_effects(effects).await;
    Ok(ApiResponse::success(refund))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: RefundStatus,
    #[serde(flatten)]
    pub extras: RefundTransitionExtras,
}

/// Apply one refund transition (admin review workflow)
pub async fn update_status(
    State(state): State<ServerState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> AppResult<ApiResponse<Refund>> {
    let (refund, effects) = state
        .engine
        .update_refund_status(&admin, &id, body.status, body.extras)?;
    state.deliver_effects(effects).await;
    Ok(ApiResponse::success(refund))
}

/// Customer confirmation that the return parcel was handed over
pub async fn confirm_shipment(
    State(state): State<ServerState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Refund>> {
    let (refund, effects) = state.engine.confirm_shipment(&user, &id)?;
    state.deliver_effects(effects).await;
    Ok(ApiResponse::success(refund))
}

#[derive(Debug, Deserialize)]
pub struct EvidenceBody {
    /// Base64-encoded file content
    pub data: String,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct EvidenceUrl {
    pub url: String,
}

/// Upload one piece of refund evidence; returns the stored URL
pub async fn upload_evidence(
    State(state): State<ServerState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<EvidenceBody>,
) -> AppResult<ApiResponse<EvidenceUrl>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body.data.as_bytes())
        .map_err(|e| AppError::invalid_request(format!("Invalid base64 payload: {e}")))?;
    if bytes.is_empty() {
        return Err(AppError::invalid_request("Empty evidence payload"));
    }

    let url = state.evidence.store(bytes, &body.content_type).await?;
    tracing::debug!(user_id = %user.id, %url, "Evidence uploaded");
    Ok(ApiResponse::success(EvidenceUrl { url }))
}
