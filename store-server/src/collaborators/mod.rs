//! Outward-facing collaborator seams
//!
//! The lifecycle engine never talks to auth, catalog, notification or file
//! storage directly; it goes through these traits. Production wires real
//! services in, tests use the in-memory implementations below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::AppResult;
use shared::models::Identity;
use shared::util::prefixed_id;

/// Catalog snapshot for a single product at checkout time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: String,
    pub name: String,
    /// Unit price in minor currency units
    pub price: i64,
    pub stock: u32,
}

/// Notification categories surfaced to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    OrderCreated,
    OrderStatusChanged,
    OrderCancelled,
    RefundRequested,
    RefundStatusChanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

/// Resolves bearer tokens into identities
#[async_trait]
pub trait SessionGate: Send + Sync {
    async fn resolve(&self, token: &str) -> AppResult<Option<Identity>>;
}

/// Read-only product lookup used at checkout
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn product(&self, product_id: &str) -> AppResult<Option<ProductInfo>>;
}

/// Fan-out target for user-facing notifications.
///
/// Publishing happens after the aggregate write and is best-effort; a
/// failed publish is logged and never rolls the write back.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, notification: Notification) -> AppResult<()>;
}

/// Persists uploaded refund evidence and returns a stable URL
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> AppResult<String>;
}

/// Gates checkout during maintenance windows
#[async_trait]
pub trait MaintenanceGate: Send + Sync {
    async fn is_under_maintenance(&self) -> bool;
}

// ============================================================================
// In-memory implementations
// ============================================================================

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixed token-to-identity table
#[derive(Default)]
pub struct StaticSessionGate {
    sessions: RwLock<HashMap<String, Identity>>,
}

impl StaticSessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: impl Into<String>, identity: Identity) {
        self.sessions.write().insert(token.into(), identity);
    }
}

#[async_trait]
impl SessionGate for StaticSessionGate {
    async fn resolve(&self, token: &str) -> AppResult<Option<Identity>> {
        Ok(self.sessions.read().get(token).cloned())
    }
}

/// Catalog backed by a hash map
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<String, ProductInfo>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: ProductInfo) {
        self.products.write().insert(product.id.clone(), product);
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn product(&self, product_id: &str) -> AppResult<Option<ProductInfo>> {
        Ok(self.products.read().get(product_id).cloned())
    }
}

/// Records published notifications for assertions
#[derive(Default)]
pub struct RecordingNotificationSink {
    published: RwLock<Vec<Notification>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<Notification> {
        self.published.read().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn publish(&self, notification: Notification) -> AppResult<()> {
        self.published.write().push(notification);
        Ok(())
    }
}

/// Keeps evidence bytes in memory and hands out synthetic URLs
#[derive(Default)]
pub struct InMemoryEvidenceStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvidenceStore for InMemoryEvidenceStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> AppResult<String> {
        let ext = match content_type {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            _ => "bin",
        };
        let url = format!("mem://evidence/{}.{ext}", prefixed_id("ev"));
        self.files.write().insert(url.clone(), bytes);
        Ok(url)
    }
}

/// Sink that writes notifications to the log.
///
/// The default for deployments without a real push channel: clients pick
/// state changes up through the sync poll anyway.
#[derive(Default)]
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn publish(&self, notification: Notification) -> AppResult<()> {
        tracing::info!(
            user_id = %notification.user_id,
            kind = ?notification.kind,
            message = %notification.message,
            "Notification"
        );
        Ok(())
    }
}

/// Evidence store backed by a directory under the working dir
pub struct FsEvidenceStore {
    root: std::path::PathBuf,
}

impl FsEvidenceStore {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl EvidenceStore for FsEvidenceStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> AppResult<String> {
        let ext = match content_type {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            _ => "bin",
        };
        let name = format!("{}.{ext}", prefixed_id("ev"));
        let path = self.root.join(&name);
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| shared::AppError::storage(e.to_string()))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| shared::AppError::storage(e.to_string()))?;
        Ok(format!("/evidence/{name}"))
    }
}

/// Maintenance flag toggled by tests or an admin endpoint
#[derive(Default)]
pub struct FlagMaintenanceGate {
    flag: AtomicBool,
}

impl FlagMaintenanceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, under_maintenance: bool) {
        self.flag.store(under_maintenance, Ordering::Relaxed);
    }
}

#[async_trait]
impl MaintenanceGate for FlagMaintenanceGate {
    async fn is_under_maintenance(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_session_gate() {
        let gate = StaticSessionGate::new();
        gate.insert("tok-1", Identity::customer("u1"));

        let identity = gate.resolve("tok-1").await.unwrap().unwrap();
        assert_eq!(identity.id, "u1");
        assert!(gate.resolve("tok-unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evidence_store_urls_are_unique() {
        let store = InMemoryEvidenceStore::new();
        let a = store.store(vec![1, 2], "image/png").await.unwrap();
        let b = store.store(vec![3, 4], "image/png").await.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_maintenance_flag() {
        let gate = FlagMaintenanceGate::new();
        assert!(!gate.is_under_maintenance().await);
        gate.set(true);
        assert!(gate.is_under_maintenance().await);
    }
}
