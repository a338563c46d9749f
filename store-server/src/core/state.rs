use dashmap::DashMap;
use std::sync::Arc;

use crate::collaborators::{EvidenceStore, MaintenanceGate, NotificationSink, SessionGate};
use crate::core::Config;
use crate::lifecycle::{LifecycleEngine, SideEffect};
use crate::storage::KvStore;
use crate::sync::SyncService;

/// Shared server state
///
/// Holds the engine plus every collaborator handle. `Clone` is shallow;
/// every field is an `Arc` or built on one.
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub engine: LifecycleEngine,
    pub sync: SyncService,
    pub sessions: Arc<dyn SessionGate>,
    pub notifications: Arc<dyn NotificationSink>,
    pub evidence: Arc<dyn EvidenceStore>,
    pub maintenance: Arc<dyn MaintenanceGate>,
    /// Single-flight checkout guard: one in-flight checkout per user
    checkout_inflight: Arc<DashMap<String, ()>>,
}

impl ServerState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        kv: Arc<dyn KvStore>,
        sessions: Arc<dyn SessionGate>,
        catalog: Arc<dyn crate::collaborators::Catalog>,
        notifications: Arc<dyn NotificationSink>,
        evidence: Arc<dyn EvidenceStore>,
        maintenance: Arc<dyn MaintenanceGate>,
    ) -> Self {
        let engine = LifecycleEngine::new(
            kv.clone(),
            catalog,
            maintenance.clone(),
            config.voucher_revert_policy,
        );
        Self {
            config,
            engine,
            sync: SyncService::new(kv),
            sessions,
            notifications,
            evidence,
            maintenance,
            checkout_inflight: Arc::new(DashMap::new()),
        }
    }

    /// Claim the checkout slot for a user. Returns a guard that releases
    /// the slot on drop, or `None` when a checkout is already in flight.
    pub fn begin_checkout(&self, user_id: &str) -> Option<CheckoutGuard> {
        use dashmap::mapref::entry::Entry;
        match self.checkout_inflight.entry(user_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(CheckoutGuard {
                    inflight: self.checkout_inflight.clone(),
                    user_id: user_id.to_string(),
                })
            }
        }
    }

    /// Deliver side effects of a committed operation, best-effort.
    ///
    /// Failures are logged and never surfaced to the caller; the write
    /// has already committed.
    pub async fn deliver_effects(&self, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                SideEffect::Notify(notification) => {
                    if let Err(e) = self.notifications.publish(notification).await {
                        tracing::warn!(error = %e, "Notification publish failed");
                    }
                }
                SideEffect::ClearCart { user_id } => {
                    tracing::debug!(%user_id, "Cart cleared after checkout");
                }
                SideEffect::VoucherReverted { code, order_id } => {
                    tracing::info!(%code, %order_id, "Voucher usage reverted");
                }
            }
        }
    }
}

/// RAII guard for the single-flight checkout slot
pub struct CheckoutGuard {
    inflight: Arc<DashMap<String, ()>>,
    user_id: String,
}

impl Drop for CheckoutGuard {
    fn drop(&mut self) {
        self.inflight.remove(&self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{
        FlagMaintenanceGate, InMemoryCatalog, InMemoryEvidenceStore, RecordingNotificationSink,
        StaticSessionGate,
    };
    use crate::storage::MemoryStore;

    fn test_state() -> ServerState {
        ServerState::new(
            Config::with_overrides("/tmp/store-test", 0),
            Arc::new(MemoryStore::new()),
            Arc::new(StaticSessionGate::new()),
            Arc::new(InMemoryCatalog::new()),
            Arc::new(RecordingNotificationSink::new()),
            Arc::new(InMemoryEvidenceStore::new()),
            Arc::new(FlagMaintenanceGate::new()),
        )
    }

    #[test]
    fn test_checkout_single_flight() {
        let state = test_state();

        let guard = state.begin_checkout("u1").unwrap();
        assert!(state.begin_checkout("u1").is_none());
        // Other users are unaffected
        assert!(state.begin_checkout("u2").is_some());

        drop(guard);
        assert!(state.begin_checkout("u1").is_some());
    }
}
