//! Order API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::models::{Order, OrderStatus, PaymentStatus, Refund};

use crate::api::auth::{AdminUser, CurrentUser};
use crate::core::ServerState;

/// Own orders; every order for admins
pub async fn list(
    State(state): State<ServerState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let orders = state.engine.list_orders(&user)?;
    Ok(ApiResponse::success(orders))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    let order = state.engine.get_order(&user, &id)?;
    Ok(ApiResponse::success(order))
}

#[derive(Debug, Deserialize)]
pub struct CancelBody {
    pub reason: String,
}

/// Result of a cancel: the order plus the compensating refund, if any
#[derive(Debug, serde::Serialize)]
pub struct CancelOutcome {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<Refund>,
}

pub async fn cancel(
    State(state): State<ServerState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<CancelBody>,
) -> AppResult<ApiResponse<CancelOutcome>> {
    let (order, refund, effects) = state.engine.cancel_order(&user, &id, &body.reason)?;
    state.deliver_effects(effects).await;
    Ok(ApiResponse::success(CancelOutcome { order, refund }))
}

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    pub payment_status: PaymentStatus,
}

pub async fn set_payment_status(
    State(state): State<ServerState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<PaymentBody>,
) -> AppResult<ApiResponse<Order>> {
    let (order, effects) = state
        .engine
        .set_payment_status(&admin, &id, body.payment_status)?;
    state.deliver_effects(effects).await;
    Ok(ApiResponse::success(order))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: OrderStatus,
}

pub async fn advance_status(
    State(state): State<ServerState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> AppResult<ApiResponse<Order>> {
    let (order, effects) = state.engine.advance_status(&admin, &id, body.status)?;
    state.deliver_effects(effects).await;
    Ok(ApiResponse::success(order))
}
