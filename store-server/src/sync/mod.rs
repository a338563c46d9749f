//! Polling sync
//!
//! There is no push channel: clients poll `changes_since` with their last
//! watermark and receive every order and refund touched after it, plus a
//! new server watermark. Observed state is eventually consistent with
//! staleness bounded by the poll interval.

use crate::lifecycle::LifecycleResult;
use crate::storage::KvStore;
use crate::stores::{OrderStore, RefundStore};
use serde::Serialize;
use shared::models::{Identity, Order, Refund};
use shared::util::now_millis;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One poll response: everything updated strictly after `since`
#[derive(Debug, Clone, Serialize, Default)]
pub struct SyncChanges {
    pub orders: Vec<Order>,
    pub refunds: Vec<Refund>,
    /// Server time at which this snapshot was taken; pass back as `since`
    pub watermark: i64,
}

/// Read side of the sync protocol
#[derive(Clone)]
pub struct SyncService {
    orders: OrderStore,
    refunds: RefundStore,
}

impl SyncService {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            orders: OrderStore::new(kv.clone()),
            refunds: RefundStore::new(kv),
        }
    }

    /// Everything the caller may see that changed after `since`.
    ///
    /// The watermark is taken before the scans, so a write racing the scan
    /// is picked up again on the next poll rather than lost.
    pub fn changes_since(&self, actor: &Identity, since: i64) -> LifecycleResult<SyncChanges> {
        let watermark = now_millis();

        let orders = if actor.is_admin() {
            self.orders.list_all()?
        } else {
            self.orders.list_for_user(&actor.id)?
        };
        let refunds = if actor.is_admin() {
            self.refunds.list_all()?
        } else {
            self.refunds.list_for_user(&actor.id)?
        };

        Ok(SyncChanges {
            orders: orders.into_iter().filter(|o| o.updated_at > since).collect(),
            refunds: refunds
                .into_iter()
                .filter(|r| r.updated_at > since)
                .collect(),
            watermark,
        })
    }
}

/// Client-side poll tracker: watermark plus the latest snapshot per id
#[derive(Debug, Default)]
pub struct PollState {
    watermark: i64,
    orders: HashMap<String, Order>,
    refunds: HashMap<String, Refund>,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn refund(&self, id: &str) -> Option<&Refund> {
        self.refunds.get(id)
    }

    /// Merge one poll response; returns the ids that actually changed
    pub fn apply(&mut self, changes: SyncChanges) -> Vec<String> {
        let mut touched = Vec::new();
        for order in changes.orders {
            let stale = self
                .orders
                .get(&order.id)
                .is_none_or(|prev| prev.updated_at < order.updated_at);
            if stale {
                touched.push(order.id.clone());
                self.orders.insert(order.id.clone(), order);
            }
        }
        for refund in changes.refunds {
            let stale = self
                .refunds
                .get(&refund.id)
                .is_none_or(|prev| prev.updated_at < refund.updated_at);
            if stale {
                touched.push(refund.id.clone());
                self.refunds.insert(refund.id.clone(), refund);
            }
        }
        self.watermark = self.watermark.max(changes.watermark);
        touched
    }
}

/// Drive a poll loop on a fixed interval, pushing each non-empty batch of
/// changed ids to the given callback. Runs until the task is aborted.
pub fn spawn_poller<F>(
    service: SyncService,
    actor: Identity,
    interval: Duration,
    mut on_change: F,
) -> tokio::task::JoinHandle<()>
where
    F: FnMut(&PollState, Vec<String>) + Send + 'static,
{
    tokio::spawn(async move {
        let mut state = PollState::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match service.changes_since(&actor, state.watermark()) {
                Ok(changes) => {
                    let touched = state.apply(changes);
                    if !touched.is_empty() {
                        on_change(&state, touched);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Sync poll failed, retrying next tick");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use shared::models::{OrderStatus, PaymentMethod, PaymentStatus};

    fn order_at(id: &str, user_id: &str, updated_at: i64) -> Order {
        Order {
            id: id.to_string(),
            user_id: user_id.to_string(),
            items: vec![],
            subtotal: 0,
            shipping_cost: 0,
            voucher_code: None,
            discount: 0,
            total_amount: 0,
            shipping_address: String::new(),
            shipping_method: "PICKUP".into(),
            payment_method: PaymentMethod::BankTransfer,
            payment_status: PaymentStatus::WaitingPayment,
            paid_at: None,
            status: OrderStatus::WaitingPayment,
            status_history: vec![],
            has_refund: false,
            refund_id: None,
            created_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn test_changes_since_filters_by_watermark_and_owner() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let orders = OrderStore::new(kv.clone());
        let service = SyncService::new(kv);

        orders.create(&order_at("ord_1", "u1", 100)).unwrap();
        orders.create(&order_at("ord_2", "u1", 200)).unwrap();
        orders.create(&order_at("ord_3", "u2", 300)).unwrap();

        let me = Identity::customer("u1");
        let changes = service.changes_since(&me, 150).unwrap();
        assert_eq!(changes.orders.len(), 1);
        assert_eq!(changes.orders[0].id, "ord_2");
        assert!(changes.watermark > 0);

        // Admin sees every user's changes
        let admin = Identity::admin("staff-1");
        assert_eq!(service.changes_since(&admin, 150).unwrap().orders.len(), 2);
    }

    #[test]
    fn test_poll_state_tracks_watermark_and_diffs() {
        let mut state = PollState::new();

        let touched = state.apply(SyncChanges {
            orders: vec![order_at("ord_1", "u1", 100)],
            refunds: vec![],
            watermark: 150,
        });
        assert_eq!(touched, vec!["ord_1".to_string()]);
        assert_eq!(state.watermark(), 150);

        // Re-delivering the same snapshot changes nothing
        let touched = state.apply(SyncChanges {
            orders: vec![order_at("ord_1", "u1", 100)],
            refunds: vec![],
            watermark: 200,
        });
        assert!(touched.is_empty());
        assert_eq!(state.watermark(), 200);

        // A newer snapshot replaces the stale one
        let mut newer = order_at("ord_1", "u1", 250);
        newer.status = OrderStatus::Processing;
        let touched = state.apply(SyncChanges {
            orders: vec![newer],
            refunds: vec![],
            watermark: 260,
        });
        assert_eq!(touched, vec!["ord_1".to_string()]);
        assert_eq!(
            state.order("ord_1").unwrap().status,
            OrderStatus::Processing
        );
    }
}
