//! Admin handlers

use axum::extract::State;
use shared::error::{ApiResponse, AppResult};
use shared::models::Refund;

use crate::api::auth::AdminUser;
use crate::core::ServerState;

/// Run the missing-refund reconciliation sweep; returns the refunds it
/// had to create
pub async fn reconcile(
    State(state): State<ServerState>,
    AdminUser(admin): AdminUser,
) -> AppResult<ApiResponse<Vec<Refund>>> {
    let created = state.engine.reconcile_missing_refunds(&admin)?;
    if !created.is_empty() {
        tracing::warn!(count = created.len(), "Reconciliation repaired refunds");
    }
    Ok(ApiResponse::success(created))
}
