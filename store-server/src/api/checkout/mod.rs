//! Checkout API
//!
//! One endpoint: create an order from a cart. Single-flighted per user and
//! refused during maintenance windows.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/checkout", post(handler::checkout))
}
