//! HTTP API
//!
//! One router per resource, merged here; cross-cutting middleware is
//! layered in `build_app`.

use axum::Router;
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;

pub mod auth;

mod admin;
mod checkout;
mod health;
mod orders;
mod refunds;
mod sync;

pub use auth::{AdminUser, CurrentUser};

/// Per-request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// All routes, no middleware or state
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Checkout - authentication required, single-flighted
        .merge(checkout::router())
        // Orders - authentication required
        .merge(orders::router())
        // Refunds - authentication required
        .merge(refunds::router())
        // Sync polling - authentication required
        .merge(sync::router())
        // Admin maintenance - admin permission required
        .merge(admin::router())
        // Health - public route
        .merge(health::router())
}

/// Fully configured application: routes, middleware and state
pub fn build_app(state: ServerState) -> Router {
    build_router()
        // CORS - handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Trace - request tracing at INFO level
        .layer(TraceLayer::new_for_http())
        // Request ID - unique ID per request, propagated to the response
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .with_state(state)
}
