//! Checkout handler

use axum::{Json, extract::State};
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::Order;

use crate::api::auth::CurrentUser;
use crate::core::ServerState;
use crate::lifecycle::CheckoutRequest;

/// Create an order from the submitted cart
pub async fn checkout(
    State(state): State<ServerState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CheckoutRequest>,
) -> AppResult<ApiResponse<Order>> {
    // One checkout in flight per user; the guard releases on return
    let _guard = state
        .begin_checkout(&user.id)
        .ok_or_else(|| AppError::new(ErrorCode::CheckoutInFlight))?;

    let (order, effects) = state.engine.create_order(&user, req).await?;
    state.deliver_effects(effects).await;
    Ok(ApiResponse::success(order))
}
