//! End-to-end HTTP flow tests
//!
//! Drive the full router with in-memory collaborators: checkout, payment,
//! fulfillment, cancellation, the refund workflow and the sync poll.

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use shared::models::Identity;
use store_server::collaborators::{
    FlagMaintenanceGate, InMemoryCatalog, InMemoryEvidenceStore, ProductInfo,
    RecordingNotificationSink, StaticSessionGate,
};
use store_server::core::{Config, ServerState};
use store_server::storage::MemoryStore;

const CUSTOMER_TOKEN: &str = "tok-customer";
const ADMIN_TOKEN: &str = "tok-admin";

fn test_app() -> Router {
    let sessions = Arc::new(StaticSessionGate::new());
    sessions.insert(CUSTOMER_TOKEN, Identity::customer("u1"));
    sessions.insert(ADMIN_TOKEN, Identity::admin("staff-1"));

    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert(ProductInfo {
        id: "p1".into(),
        name: "Ceramic mug".into(),
        price: 50_000,
        stock: 10,
    });

    let state = ServerState::new(
        Config::with_overrides("/tmp/store-flow-test", 0),
        Arc::new(MemoryStore::new()),
        sessions,
        catalog,
        Arc::new(RecordingNotificationSink::new()),
        Arc::new(InMemoryEvidenceStore::new()),
        Arc::new(FlagMaintenanceGate::new()),
    );
    store_server::api::build_app(state)
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn checkout_body() -> Value {
    json!({
        "items": [{"product_id": "p1", "quantity": 2}],
        "shipping_address": "Jl. Example 1",
        "shipping_method": "PICKUP",
        "payment_method": "BANK_TRANSFER"
    })
}

async fn checkout(app: &Router) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/checkout",
        Some(CUSTOMER_TOKEN),
        Some(checkout_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "checkout failed: {body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn pay(app: &Router, order_id: &str) {
    let (status, _) = call(
        app,
        "POST",
        &format!("/api/orders/{order_id}/payment"),
        Some(ADMIN_TOKEN),
        Some(json!({"payment_status": "PAID"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn advance(app: &Router, order_id: &str, to: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        &format!("/api/orders/{order_id}/status"),
        Some(ADMIN_TOKEN),
        Some(json!({"status": to})),
    )
    .await
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let (status, body) = call(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_auth_required_and_token_validated() {
    let app = test_app();

    let (status, _) = call(&app, "GET", "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, "GET", "/api/orders", Some("tok-bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1002);
}

#[tokio::test]
async fn test_checkout_to_delivery() {
    let app = test_app();
    let order_id = checkout(&app).await;

    // Paying is a prerequisite for processing
    let (status, body) = advance(&app, &order_id, "PROCESSING").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["code"], 4005);

    pay(&app, &order_id).await;
    for step in ["PROCESSING", "PACKED", "SHIPPED", "DELIVERED"] {
        let (status, body) = advance(&app, &order_id, step).await;
        assert_eq!(status, StatusCode::OK, "{step}: {body}");
        assert_eq!(body["data"]["status"], *step);
    }

    // Skipping steps is rejected with both statuses in the details
    let order_id = checkout(&app).await;
    pay(&app, &order_id).await;
    let (status, body) = advance(&app, &order_id, "SHIPPED").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 4002);
    assert_eq!(body["details"]["current"], "WAITING_PAYMENT");
    assert_eq!(body["details"]["requested"], "SHIPPED");
}

#[tokio::test]
async fn test_customer_cannot_drive_fulfillment() {
    let app = test_app();
    let order_id = checkout(&app).await;
    pay(&app, &order_id).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/status"),
        Some(CUSTOMER_TOKEN),
        Some(json!({"status": "PROCESSING"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2002);
}

#[tokio::test]
async fn test_cancel_paid_order_returns_refund() {
    let app = test_app();
    let order_id = checkout(&app).await;
    pay(&app, &order_id).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/cancel"),
        Some(CUSTOMER_TOKEN),
        Some(json!({"reason": "Ordered by mistake"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["order"]["status"], "CANCELLED");
    assert_eq!(body["data"]["refund"]["type"], "ADMIN_CANCEL");
    assert_eq!(body["data"]["refund"]["status"], "PENDING");
    assert_eq!(body["data"]["refund"]["amount"], 100_000);

    // Second cancel reports the conflict
    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/cancel"),
        Some(CUSTOMER_TOKEN),
        Some(json!({"reason": "retry"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 4003);
}

#[tokio::test]
async fn test_refund_workflow_over_http() {
    let app = test_app();
    let order_id = checkout(&app).await;
    pay(&app, &order_id).await;
    for step in ["PROCESSING", "PACKED", "SHIPPED", "DELIVERED"] {
        advance(&app, &order_id, step).await;
    }

    // Upload evidence, then request the refund with the returned URL
    let (status, body) = call(
        &app,
        "POST",
        "/api/refunds/evidence",
        Some(CUSTOMER_TOKEN),
        Some(json!({"data": "aGVsbG8=", "content_type": "image/png"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let evidence_url = body["data"]["url"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "POST",
        "/api/refunds",
        Some(CUSTOMER_TOKEN),
        Some(json!({
            "order_id": order_id,
            "reason": "DAMAGED",
            "description": "Arrived cracked",
            "evidence": [evidence_url]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let refund_id = body["data"]["id"].as_str().unwrap().to_string();

    // Approve with courier, customer ships, admin receives and pays out
    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/refunds/{refund_id}/status"),
        Some(ADMIN_TOKEN),
        Some(json!({"status": "APPROVED", "courier": "JNE"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["return_shipping"]["courier"], "JNE");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/refunds/{refund_id}/ship"),
        Some(CUSTOMER_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/refunds/{refund_id}/status"),
        Some(ADMIN_TOKEN),
        Some(json!({"status": "RECEIVED"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/refunds/{refund_id}/status"),
        Some(ADMIN_TOKEN),
        Some(json!({"status": "REFUNDED", "refund_method": "BANK_TRANSFER"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "REFUNDED");

    // Payout flipped the order's payment status
    let (_, body) = call(
        &app,
        "GET",
        &format!("/api/orders/{order_id}"),
        Some(CUSTOMER_TOKEN),
        None,
    )
    .await;
    assert_eq!(body["data"]["payment_status"], "REFUNDED");
}

#[tokio::test]
async fn test_sync_returns_changes_after_watermark() {
    let app = test_app();

    let (status, body) = call(&app, "GET", "/api/sync?since=0", Some(CUSTOMER_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orders"].as_array().unwrap().len(), 0);
    let watermark = body["data"]["watermark"].as_i64().unwrap();

    checkout(&app).await;

    let (_, body) = call(
        &app,
        "GET",
        &format!("/api/sync?since={watermark}"),
        Some(CUSTOMER_TOKEN),
        None,
    )
    .await;
    assert_eq!(body["data"]["orders"].as_array().unwrap().len(), 1);
    assert!(body["data"]["poll_interval_ms"].as_u64().unwrap() > 0);

    // The new watermark drains the feed
    let next = body["data"]["watermark"].as_i64().unwrap();
    let (_, body) = call(
        &app,
        "GET",
        &format!("/api/sync?since={next}"),
        Some(CUSTOMER_TOKEN),
        None,
    )
    .await;
    assert_eq!(body["data"]["orders"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_admin_reconcile_requires_admin() {
    let app = test_app();

    let (status, _) = call(&app, "GET", "/api/admin/reconcile", Some(CUSTOMER_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "GET", "/api/admin/reconcile", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}
