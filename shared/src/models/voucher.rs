//! Voucher model
//!
//! Two flavors: personal vouchers bound to one user for a single use, and
//! public vouchers usable by any eligible user up to an aggregate cap
//! (once per user).

use serde::{Deserialize, Serialize};

/// Discount flavor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `discount_value` is a percentage of the subtotal (0-100)
    Percentage,
    /// `discount_value` is a fixed amount in minor currency units
    Fixed,
}

/// Voucher lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherStatus {
    #[default]
    Active,
    /// Personal voucher consumed
    Used,
    Disabled,
}

/// Voucher record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Voucher {
    /// Unique code, looked up case-insensitively
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_purchase: Option<i64>,
    /// Caps percentage discounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub status: VoucherStatus,
    /// Set for personal vouchers; None for public ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Public voucher aggregate cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_usage: Option<i64>,
    #[serde(default)]
    pub usage_count: i64,
    #[serde(default)]
    pub used_by_user_ids: Vec<String>,
}

impl Voucher {
    pub fn is_personal(&self) -> bool {
        self.user_id.is_some()
    }

    /// Discount amount for the given subtotal.
    ///
    /// Percentage discounts are capped by `max_discount`; the result never
    /// exceeds the subtotal, so an order total can never go below zero.
    pub fn discount_for(&self, subtotal: i64) -> i64 {
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let pct = subtotal * self.discount_value / 100;
                match self.max_discount {
                    Some(cap) => pct.min(cap),
                    None => pct,
                }
            }
            DiscountType::Fixed => self.discount_value,
        };
        raw.clamp(0, subtotal)
    }
}
