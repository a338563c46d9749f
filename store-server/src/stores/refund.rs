//! Refund aggregate store
//!
//! Enforces the one-refund-per-order rule at the storage layer: `create`
//! claims the `refund_order:{order_id}` index with an atomic insert before
//! the aggregate itself is written, so two concurrent requests can never
//! both succeed.

use crate::lifecycle::{LifecycleError, LifecycleResult};
use crate::storage::{KvStore, get_json, put_json};
use shared::models::Refund;
use std::sync::Arc;

fn refund_key(id: &str) -> String {
    format!("refund:{id}")
}

fn order_index_key(order_id: &str) -> String {
    format!("refund_order:{order_id}")
}

fn user_index_key(user_id: &str, refund_id: &str) -> String {
    format!("refund_user:{user_id}:{refund_id}")
}

/// Store for the Refund aggregate
#[derive(Clone)]
pub struct RefundStore {
    kv: Arc<dyn KvStore>,
}

impl RefundStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Persist a new refund, claiming the per-order index first.
    ///
    /// Fails with `DuplicateRefund` when a refund already exists for the
    /// order, which makes retries of the cancel saga safe: a second attempt
    /// finds the index claimed and loads the existing refund instead.
    pub fn create(&self, refund: &Refund) -> LifecycleResult<()> {
        let claimed = self
            .kv
            .put_if_absent(&order_index_key(&refund.order_id), refund.id.as_bytes())?;
        if !claimed {
            return Err(LifecycleError::DuplicateRefund(refund.order_id.clone()));
        }
        put_json(self.kv.as_ref(), &refund_key(&refund.id), refund)?;
        self.kv
            .put(&user_index_key(&refund.user_id, &refund.id), b"")?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> LifecycleResult<Option<Refund>> {
        Ok(get_json(self.kv.as_ref(), &refund_key(id))?)
    }

    /// Load a refund or fail with `RefundNotFound`
    pub fn require(&self, id: &str) -> LifecycleResult<Refund> {
        self.get(id)?
            .ok_or_else(|| LifecycleError::RefundNotFound(id.to_string()))
    }

    /// Persist the current state of an existing refund
    pub fn save(&self, refund: &Refund) -> LifecycleResult<()> {
        put_json(self.kv.as_ref(), &refund_key(&refund.id), refund)?;
        Ok(())
    }

    /// The refund for an order, if one exists
    pub fn find_by_order(&self, order_id: &str) -> LifecycleResult<Option<Refund>> {
        match self.kv.get(&order_index_key(order_id))? {
            Some(id_bytes) => {
                let id = String::from_utf8(id_bytes)
                    .map_err(|e| LifecycleError::Internal(format!("Corrupt refund index: {e}")))?;
                self.get(&id)
            }
            None => Ok(None),
        }
    }

    /// All refunds belonging to a user, oldest first
    pub fn list_for_user(&self, user_id: &str) -> LifecycleResult<Vec<Refund>> {
        let prefix = format!("refund_user:{user_id}:");
        let mut refunds = Vec::new();
        for (key, _) in self.kv.scan_prefix(&prefix)? {
            let refund_id = &key[prefix.len()..];
            if let Some(refund) = self.get(refund_id)? {
                refunds.push(refund);
            }
        }
        refunds.sort_by_key(|r| r.created_at);
        Ok(refunds)
    }

    /// All refunds in the store (admin console)
    pub fn list_all(&self) -> LifecycleResult<Vec<Refund>> {
        let mut refunds = Vec::new();
        for (_, bytes) in self.kv.scan_prefix("refund:")? {
            let refund: Refund =
                serde_json::from_slice(&bytes).map_err(crate::storage::StorageError::from)?;
            refunds.push(refund);
        }
        refunds.sort_by_key(|r| r.created_at);
        Ok(refunds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use shared::models::{RefundStatus, RefundType};
    use shared::util::now_millis;

    fn test_refund(id: &str, order_id: &str, user_id: &str) -> Refund {
        let now = now_millis();
        Refund {
            id: id.to_string(),
            order_id: order_id.to_string(),
            user_id: user_id.to_string(),
            refund_type: RefundType::UserRequest,
            amount: 90_000,
            reason: "DAMAGED".into(),
            description: None,
            evidence: vec!["https://cdn.example/e1.jpg".into()],
            status: RefundStatus::Pending,
            return_shipping: None,
            status_history: vec![],
            admin_note: None,
            reviewed_by: None,
            refund_method: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn store() -> RefundStore {
        RefundStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_create_and_find_by_order() {
        let store = store();
        store.create(&test_refund("ref_1", "ord_1", "u1")).unwrap();

        let found = store.find_by_order("ord_1").unwrap().unwrap();
        assert_eq!(found.id, "ref_1");
        assert!(store.find_by_order("ord_other").unwrap().is_none());
    }

    #[test]
    fn test_second_refund_for_same_order_rejected() {
        let store = store();
        store.create(&test_refund("ref_1", "ord_1", "u1")).unwrap();

        let err = store
            .create(&test_refund("ref_2", "ord_1", "u1"))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::DuplicateRefund(o) if o == "ord_1"));

        // First refund untouched
        assert_eq!(store.find_by_order("ord_1").unwrap().unwrap().id, "ref_1");
    }

    #[test]
    fn test_list_for_user() {
        let store = store();
        store.create(&test_refund("ref_1", "ord_1", "u1")).unwrap();
        store.create(&test_refund("ref_2", "ord_2", "u2")).unwrap();
        store.create(&test_refund("ref_3", "ord_3", "u1")).unwrap();

        let mine = store.list_for_user("u1").unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.user_id == "u1"));
    }

    #[test]
    fn test_save_updates_status() {
        let store = store();
        let mut refund = test_refund("ref_1", "ord_1", "u1");
        store.create(&refund).unwrap();

        refund.status = RefundStatus::Approved;
        refund.push_history("Return approved", Some("admin-1"));
        store.save(&refund).unwrap();

        let loaded = store.require("ref_1").unwrap();
        assert_eq!(loaded.status, RefundStatus::Approved);
        assert_eq!(loaded.status_history.len(), 1);
    }
}
