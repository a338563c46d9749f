//! Health handler

use axum::extract::State;
use serde::Serialize;
use shared::error::ApiResponse;
use shared::util::now_millis;

use crate::core::ServerState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: i64,
}

pub async fn health(State(state): State<ServerState>) -> ApiResponse<Health> {
    ApiResponse::success(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        timestamp: now_millis(),
    })
}
