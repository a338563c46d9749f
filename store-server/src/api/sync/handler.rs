//! Sync poll handler

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppResult};

use crate::api::auth::CurrentUser;
use crate::core::ServerState;
use crate::sync::SyncChanges;

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    /// Watermark from the previous poll; 0 for a full snapshot
    #[serde(default)]
    pub since: i64,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    #[serde(flatten)]
    pub changes: SyncChanges,
    /// Suggested delay before the next poll, milliseconds
    pub poll_interval_ms: u64,
}

/// Everything the caller may see that changed after `since`
pub async fn changes(
    State(state): State<ServerState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SyncQuery>,
) -> AppResult<ApiResponse<SyncResponse>> {
    let changes = state.sync.changes_since(&user, query.since)?;
    Ok(ApiResponse::success(SyncResponse {
        changes,
        poll_interval_ms: state.config.poll_interval_ms,
    }))
}
