//! Refund API
//!
//! Customers request returns and confirm shipments; admins drive the
//! review workflow. Evidence uploads go through the evidence store and
//! only the returned URL is kept.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/refunds", get(handler::list).post(handler::create))
        .nest("/api/refunds", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/evidence", post(handler::upload_evidence))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", post(handler::update_status))
        .route("/{id}/ship", post(handler::confirm_shipment))
}
