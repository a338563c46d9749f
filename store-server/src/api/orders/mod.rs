//! Order API
//!
//! Customers see their own orders; admins see everything and drive
//! payment and fulfillment transitions.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/orders", get(handler::list))
        .nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/payment", post(handler::set_payment_status))
        .route("/{id}/status", post(handler::advance_status))
}
