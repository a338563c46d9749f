//! Voucher validation and redemption
//!
//! Validation is read-only and runs the checks in a fixed order so clients
//! always see the most specific failure first. Redemption and revert are
//! keyed on a per-order marker, which makes both idempotent under the
//! cancel saga's retries.

use crate::lifecycle::{LifecycleError, LifecycleResult};
use crate::storage::{KvStore, get_json, put_json};
use shared::models::{Voucher, VoucherStatus};
use shared::util::now_millis;
use std::sync::Arc;

fn voucher_key(code: &str) -> String {
    format!("voucher:{}", code.to_uppercase())
}

fn use_marker_key(code: &str, order_id: &str) -> String {
    format!("voucher_use:{}:{order_id}", code.to_uppercase())
}

/// Voucher store plus the validate/redeem/revert operations
#[derive(Clone)]
pub struct VoucherService {
    kv: Arc<dyn KvStore>,
}

impl VoucherService {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn get(&self, code: &str) -> LifecycleResult<Option<Voucher>> {
        Ok(get_json(self.kv.as_ref(), &voucher_key(code))?)
    }

    pub fn save(&self, voucher: &Voucher) -> LifecycleResult<()> {
        put_json(self.kv.as_ref(), &voucher_key(&voucher.code), voucher)?;
        Ok(())
    }

    /// Check whether `user_id` may apply `code` to an order with the given
    /// subtotal. Read-only; never mutates the voucher.
    ///
    /// Check order: existence, active status, expiry, ownership, minimum
    /// purchase, usage caps.
    pub fn validate(&self, code: &str, user_id: &str, subtotal: i64) -> LifecycleResult<Voucher> {
        let voucher = self
            .get(code)?
            .ok_or_else(|| LifecycleError::VoucherNotFound(code.to_uppercase()))?;

        if voucher.status != VoucherStatus::Active {
            return Err(LifecycleError::VoucherInactive);
        }

        if let Some(expires_at) = voucher.expires_at
            && now_millis() > expires_at
        {
            return Err(LifecycleError::VoucherExpired);
        }

        if let Some(owner) = &voucher.user_id
            && owner != user_id
        {
            return Err(LifecycleError::VoucherNotOwned);
        }

        if let Some(min) = voucher.min_purchase
            && subtotal < min
        {
            return Err(LifecycleError::VoucherMinPurchase { required: min });
        }

        if let Some(max) = voucher.max_usage
            && voucher.usage_count >= max
        {
            return Err(LifecycleError::VoucherExhausted);
        }

        // Public vouchers are once per user
        if !voucher.is_personal() && voucher.used_by_user_ids.iter().any(|u| u == user_id) {
            return Err(LifecycleError::VoucherExhausted);
        }

        Ok(voucher)
    }

    /// Consume the voucher for an order. Idempotent: the per-order marker
    /// is claimed first, and a retry that finds it already set does nothing.
    pub fn redeem(&self, code: &str, user_id: &str, order_id: &str) -> LifecycleResult<()> {
        let claimed = self
            .kv
            .put_if_absent(&use_marker_key(code, order_id), user_id.as_bytes())?;
        if !claimed {
            return Ok(());
        }

        let mut voucher = self
            .get(code)?
            .ok_or_else(|| LifecycleError::VoucherNotFound(code.to_uppercase()))?;

        if voucher.is_personal() {
            voucher.status = VoucherStatus::Used;
        } else {
            voucher.usage_count += 1;
            if !voucher.used_by_user_ids.iter().any(|u| u == user_id) {
                voucher.used_by_user_ids.push(user_id.to_string());
            }
        }
        self.save(&voucher)?;

        tracing::info!(code = %code.to_uppercase(), %order_id, "Voucher redeemed");
        Ok(())
    }

    /// Undo a redemption when the order is cancelled. Idempotent: only the
    /// call that actually deletes the marker rolls the counters back.
    pub fn revert(&self, code: &str, user_id: &str, order_id: &str) -> LifecycleResult<bool> {
        let removed = self.kv.delete(&use_marker_key(code, order_id))?;
        if !removed {
            return Ok(false);
        }

        let mut voucher = match self.get(code)? {
            Some(v) => v,
            // Voucher deleted after redemption; nothing left to roll back
            None => return Ok(true),
        };

        if voucher.is_personal() {
            if voucher.status == VoucherStatus::Used {
                voucher.status = VoucherStatus::Active;
            }
        } else {
            voucher.usage_count = (voucher.usage_count - 1).max(0);
            voucher.used_by_user_ids.retain(|u| u != user_id);
        }
        self.save(&voucher)?;

        tracing::info!(code = %code.to_uppercase(), %order_id, "Voucher redemption reverted");
        Ok(true)
    }
}
