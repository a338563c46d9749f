//! Refund aggregate model
//!
//! One refund per order, enforced by an order→refund index in the store.
//! The refund amount is snapshotted from the order total at creation and
//! never changes afterwards.

use super::order::StatusEntry;
use serde::{Deserialize, Serialize};

/// How the refund came to exist
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundType {
    /// Customer-initiated return after delivery
    #[default]
    UserRequest,
    /// System-initiated refund caused by cancelling a paid order
    AdminCancel,
}

/// Refund status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Shipping,
    Received,
    Refunded,
    Completed,
}

impl RefundStatus {
    /// Stable string form used in history notes and error details
    pub const fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "PENDING",
            RefundStatus::Approved => "APPROVED",
            RefundStatus::Rejected => "REJECTED",
            RefundStatus::Shipping => "SHIPPING",
            RefundStatus::Received => "RECEIVED",
            RefundStatus::Refunded => "REFUNDED",
            RefundStatus::Completed => "COMPLETED",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            RefundStatus::Rejected | RefundStatus::Refunded | RefundStatus::Completed
        )
    }

    /// Transition table, parameterized by refund type.
    ///
    /// AdminCancel refunds skip the physical return sub-flow entirely: there
    /// is no item to send back, so they pay out straight from `Pending`.
    pub const fn can_transition_to(&self, refund_type: RefundType, to: RefundStatus) -> bool {
        match refund_type {
            RefundType::UserRequest => matches!(
                (self, to),
                (RefundStatus::Pending, RefundStatus::Approved)
                    | (RefundStatus::Pending, RefundStatus::Rejected)
                    | (RefundStatus::Approved, RefundStatus::Shipping)
                    | (RefundStatus::Shipping, RefundStatus::Received)
                    | (RefundStatus::Received, RefundStatus::Refunded)
                    | (RefundStatus::Refunded, RefundStatus::Completed)
            ),
            RefundType::AdminCancel => matches!(
                (self, to),
                (RefundStatus::Pending, RefundStatus::Refunded)
                    | (RefundStatus::Refunded, RefundStatus::Completed)
            ),
        }
    }
}

/// Return shipping leg status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnShippingStatus {
    /// Label generated, waiting for the customer to hand the parcel over
    #[default]
    AwaitingShipment,
    Shipped,
    Received,
}

/// Return shipping sub-record
///
/// Present only for `UserRequest` refunds that reached `Approved` or later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnShipping {
    pub courier: String,
    pub tracking_number: String,
    pub status: ReturnShippingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<i64>,
}

/// Refund aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Refund {
    pub id: String,
    pub order_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub refund_type: RefundType,
    /// Snapshotted from the order total at creation, immutable afterwards
    pub amount: i64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Uploaded media references; only populated for UserRequest refunds
    #[serde(default)]
    pub evidence: Vec<String>,
    pub status: RefundStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_shipping: Option<ReturnShipping>,
    pub status_history: Vec<StatusEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Refund {
    /// Append one history entry and bump `updated_at`.
    pub fn push_history(&mut self, note: impl Into<String>, actor: Option<&str>) {
        let now = crate::util::now_millis();
        self.status_history.push(StatusEntry {
            status: self.status.as_str().to_string(),
            note: note.into(),
            timestamp: now,
            actor: actor.map(|a| a.to_string()),
        });
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_request_happy_path() {
        let t = RefundType::UserRequest;
        assert!(RefundStatus::Pending.can_transition_to(t, RefundStatus::Approved));
        assert!(RefundStatus::Approved.can_transition_to(t, RefundStatus::Shipping));
        assert!(RefundStatus::Shipping.can_transition_to(t, RefundStatus::Received));
        assert!(RefundStatus::Received.can_transition_to(t, RefundStatus::Refunded));
        assert!(RefundStatus::Refunded.can_transition_to(t, RefundStatus::Completed));
    }

    #[test]
    fn test_user_request_cannot_skip_return_flow() {
        let t = RefundType::UserRequest;
        assert!(!RefundStatus::Pending.can_transition_to(t, RefundStatus::Refunded));
        assert!(!RefundStatus::Approved.can_transition_to(t, RefundStatus::Received));
        assert!(!RefundStatus::Pending.can_transition_to(t, RefundStatus::Shipping));
    }

    #[test]
    fn test_admin_cancel_skips_shipping_subflow() {
        let t = RefundType::AdminCancel;
        assert!(RefundStatus::Pending.can_transition_to(t, RefundStatus::Refunded));
        assert!(!RefundStatus::Pending.can_transition_to(t, RefundStatus::Approved));
        assert!(!RefundStatus::Pending.can_transition_to(t, RefundStatus::Shipping));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for t in [RefundType::UserRequest, RefundType::AdminCancel] {
            for terminal in [
                RefundStatus::Rejected,
                RefundStatus::Completed,
            ] {
                for to in [
                    RefundStatus::Pending,
                    RefundStatus::Approved,
                    RefundStatus::Shipping,
                    RefundStatus::Received,
                    RefundStatus::Refunded,
                ] {
                    assert!(
                        !terminal.can_transition_to(t, to),
                        "{:?} -> {:?} should be illegal",
                        terminal,
                        to
                    );
                }
            }
        }
    }
}
