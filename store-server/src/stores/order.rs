//! Order aggregate store
//!
//! Owns `Order` records and the per-user index. All mutations go through
//! `save`, which persists the aggregate and its history as one value, so
//! state and history can never diverge.

use crate::lifecycle::{LifecycleError, LifecycleResult};
use crate::storage::{KvStore, get_json, put_json};
use shared::models::Order;
use std::sync::Arc;

fn order_key(id: &str) -> String {
    format!("order:{id}")
}

fn user_index_key(user_id: &str, order_id: &str) -> String {
    format!("order_user:{user_id}:{order_id}")
}

/// Store for the Order aggregate
#[derive(Clone)]
pub struct OrderStore {
    kv: Arc<dyn KvStore>,
}

impl OrderStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Persist a freshly created order and its user index entry
    pub fn create(&self, order: &Order) -> LifecycleResult<()> {
        let bytes = serde_json::to_vec(order).map_err(crate::storage::StorageError::from)?;
        if !self.kv.put_if_absent(&order_key(&order.id), &bytes)? {
            // Snowflake collision would be the only path here
            return Err(LifecycleError::Internal(format!(
                "Order id already exists: {}",
                order.id
            )));
        }
        self.kv
            .put(&user_index_key(&order.user_id, &order.id), b"")?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> LifecycleResult<Option<Order>> {
        Ok(get_json(self.kv.as_ref(), &order_key(id))?)
    }

    /// Load an order or fail with `OrderNotFound`
    pub fn require(&self, id: &str) -> LifecycleResult<Order> {
        self.get(id)?
            .ok_or_else(|| LifecycleError::OrderNotFound(id.to_string()))
    }

    /// Persist the current state of an existing order
    pub fn save(&self, order: &Order) -> LifecycleResult<()> {
        put_json(self.kv.as_ref(), &order_key(&order.id), order)?;
        Ok(())
    }

    /// All orders belonging to a user, oldest first
    pub fn list_for_user(&self, user_id: &str) -> LifecycleResult<Vec<Order>> {
        let prefix = format!("order_user:{user_id}:");
        let mut orders = Vec::new();
        for (key, _) in self.kv.scan_prefix(&prefix)? {
            let order_id = &key[prefix.len()..];
            if let Some(order) = self.get(order_id)? {
                orders.push(order);
            }
        }
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    /// All orders in the store (admin console)
    pub fn list_all(&self) -> LifecycleResult<Vec<Order>> {
        let mut orders = Vec::new();
        for (_, bytes) in self.kv.scan_prefix("order:")? {
            let order: Order =
                serde_json::from_slice(&bytes).map_err(crate::storage::StorageError::from)?;
            orders.push(order);
        }
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }
}
