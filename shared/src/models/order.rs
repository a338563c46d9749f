//! Order aggregate model
//!
//! All monetary amounts are integer minor currency units, snapshotted at
//! creation time. They are never recomputed from live catalog prices.
//!
//! `OrderStatus` carries the fulfillment transition table; it is the single
//! source of truth for which status moves are legal. Client-supplied status
//! strings are rejected at the boundary, never trusted.

use super::identity::Role;
use crate::util::now_millis;
use serde::{Deserialize, Serialize};

/// Payment rail selected at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
    EWallet,
    /// Cash on delivery - no payment captured in advance, so cancellation
    /// never produces a compensating refund
    Cod,
}

/// Payment status, tracked independently of fulfillment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    #[default]
    WaitingPayment,
    Paid,
    Failed,
    Expired,
    Refunded,
}

impl PaymentStatus {
    /// Stable string form used in history notes
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::WaitingPayment => "WAITING_PAYMENT",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

/// Fulfillment status
///
/// A forward-moving workflow with one escape hatch (`Cancelled`).
/// `Pending` exists in stored data from the admin console but no transition
/// produces it; `WaitingPayment` is the canonical initial status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    #[default]
    WaitingPayment,
    Processing,
    Packed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Stable string form used in history notes and error details
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::WaitingPayment => "WAITING_PAYMENT",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Packed => "PACKED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Terminal statuses have no outgoing transitions
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// The single legal forward successor, if any
    ///
    /// Strictly sequential: no skipping. Cancellation is not a successor,
    /// it is handled separately by `can_cancel`.
    pub const fn successor(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::WaitingPayment),
            OrderStatus::WaitingPayment => Some(OrderStatus::Processing),
            OrderStatus::Processing => Some(OrderStatus::Packed),
            OrderStatus::Packed => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// Whether `actor_role` may cancel an order in this status.
    ///
    /// Customers may cancel anything not yet packed for shipment; admins may
    /// cancel any order that has not been delivered.
    pub const fn can_cancel(&self, actor_role: Role) -> bool {
        match actor_role {
            Role::Customer => matches!(
                self,
                OrderStatus::Pending | OrderStatus::WaitingPayment | OrderStatus::Processing
            ),
            Role::Admin => !self.is_terminal(),
        }
    }
}

/// One append-only history entry
///
/// History is the single source of truth for "what happened when".
/// Entries are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusEntry {
    pub status: String,
    pub note: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// Order line item, snapshotted at creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    /// Unit price in minor currency units at checkout time
    pub unit_price: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * self.quantity
    }
}

/// Order aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub subtotal: i64,
    pub shipping_cost: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher_code: Option<String>,
    pub discount: i64,
    /// subtotal + shipping_cost - discount, fixed at creation
    pub total_amount: i64,
    pub shipping_address: String,
    pub shipping_method: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    pub status: OrderStatus,
    pub status_history: Vec<StatusEntry>,
    /// Denormalized back-reference, set once a refund exists for this order
    #[serde(default)]
    pub has_refund: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Append one history entry and bump `updated_at`.
    ///
    /// The entry records the order's status *after* the transition.
    pub fn push_history(&mut self, note: impl Into<String>, actor: Option<&str>) {
        let now = now_millis();
        self.status_history.push(StatusEntry {
            status: self.status.as_str().to_string(),
            note: note.into(),
            timestamp: now,
            actor: actor.map(|a| a.to_string()),
        });
        self.updated_at = now;
    }

    /// Whether a captured payment would need refunding on cancellation
    pub fn needs_refund_on_cancel(&self) -> bool {
        self.payment_status == PaymentStatus::Paid && self.payment_method != PaymentMethod::Cod
    }
}
