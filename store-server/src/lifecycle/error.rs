//! Lifecycle engine errors
//!
//! Every error carries enough detail for diagnostics; the conversion to
//! [`AppError`] maps each variant onto the stable error-code taxonomy that
//! callers translate into user-facing messages.

use crate::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use shared::models::{OrderStatus, RefundStatus};
use thiserror::Error;

/// Errors produced by the lifecycle engine and aggregate stores
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Refund not found: {0}")]
    RefundNotFound(String),

    #[error("Voucher not found: {0}")]
    VoucherNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product out of stock: {0}")]
    ProductOutOfStock(String),

    #[error("Order cannot move from {from:?} to {to:?}")]
    InvalidOrderTransition { from: OrderStatus, to: OrderStatus },

    #[error("Refund cannot move from {from:?} to {to:?}")]
    InvalidRefundTransition {
        from: RefundStatus,
        to: RefundStatus,
    },

    #[error("Order already cancelled: {0}")]
    AlreadyCancelled(String),

    #[error("Order {order_id} cannot be cancelled in status {status:?}")]
    NotCancellable {
        order_id: String,
        status: OrderStatus,
    },

    #[error("Order payment not confirmed: {0}")]
    OrderNotPaid(String),

    #[error("Order has no items")]
    OrderEmpty,

    #[error("A refund already exists for order {0}")]
    DuplicateRefund(String),

    #[error("Order not eligible for refund: {0}")]
    RefundNotEligible(String),

    #[error("Evidence is required for a return request")]
    EvidenceRequired,

    #[error("A courier must be assigned to approve a return")]
    CourierRequired,

    #[error("A rejection reason is required")]
    RejectReasonRequired,

    #[error("A refund method is required")]
    RefundMethodRequired,

    #[error("Voucher is not active")]
    VoucherInactive,

    #[error("Voucher has expired")]
    VoucherExpired,

    #[error("Voucher belongs to a different user")]
    VoucherNotOwned,

    #[error("Order subtotal below voucher minimum purchase of {required}")]
    VoucherMinPurchase { required: i64 },

    #[error("Voucher usage limit reached")]
    VoucherExhausted,

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Store is under maintenance")]
    UnderMaintenance,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order not found: {id}"))
                    .with_detail("order_id", id)
            }
            LifecycleError::RefundNotFound(id) => {
                AppError::with_message(ErrorCode::RefundNotFound, format!("Refund not found: {id}"))
                    .with_detail("refund_id", id)
            }
            LifecycleError::VoucherNotFound(code) => AppError::new(ErrorCode::VoucherNotFound)
                .with_detail("code", code),
            LifecycleError::ProductNotFound(id) => AppError::new(ErrorCode::ProductNotFound)
                .with_detail("product_id", id),
            LifecycleError::ProductOutOfStock(id) => AppError::new(ErrorCode::ProductOutOfStock)
                .with_detail("product_id", id),
            LifecycleError::InvalidOrderTransition { from, to } => {
                AppError::new(ErrorCode::InvalidOrderTransition)
                    .with_detail("current", from.as_str())
                    .with_detail("requested", to.as_str())
            }
            LifecycleError::InvalidRefundTransition { from, to } => {
                AppError::new(ErrorCode::InvalidRefundTransition)
                    .with_detail("current", from.as_str())
                    .with_detail("requested", to.as_str())
            }
            LifecycleError::AlreadyCancelled(id) => AppError::new(ErrorCode::OrderAlreadyCancelled)
                .with_detail("order_id", id),
            LifecycleError::NotCancellable { order_id, status } => {
                AppError::new(ErrorCode::OrderNotCancellable)
                    .with_detail("order_id", order_id)
                    .with_detail("current", status.as_str())
            }
            LifecycleError::OrderNotPaid(id) => {
                AppError::new(ErrorCode::OrderNotPaid).with_detail("order_id", id)
            }
            LifecycleError::OrderEmpty => AppError::new(ErrorCode::OrderEmpty),
            LifecycleError::DuplicateRefund(order_id) => AppError::new(ErrorCode::DuplicateRefund)
                .with_detail("order_id", order_id),
            LifecycleError::RefundNotEligible(msg) => {
                AppError::with_message(ErrorCode::RefundNotEligible, msg)
            }
            LifecycleError::EvidenceRequired => AppError::new(ErrorCode::EvidenceRequired),
            LifecycleError::CourierRequired => AppError::new(ErrorCode::CourierRequired),
            LifecycleError::RejectReasonRequired => AppError::new(ErrorCode::RejectReasonRequired),
            LifecycleError::RefundMethodRequired => AppError::new(ErrorCode::RefundMethodRequired),
            LifecycleError::VoucherInactive => AppError::new(ErrorCode::VoucherInactive),
            LifecycleError::VoucherExpired => AppError::new(ErrorCode::VoucherExpired),
            LifecycleError::VoucherNotOwned => AppError::new(ErrorCode::VoucherNotOwned),
            LifecycleError::VoucherMinPurchase { required } => {
                AppError::new(ErrorCode::VoucherMinPurchase).with_detail("min_purchase", required)
            }
            LifecycleError::VoucherExhausted => AppError::new(ErrorCode::VoucherExhausted),
            LifecycleError::Unauthorized => AppError::unauthorized(),
            LifecycleError::Forbidden(msg) => AppError::forbidden(msg),
            LifecycleError::Validation(msg) => AppError::validation(msg),
            LifecycleError::UnderMaintenance => AppError::new(ErrorCode::UnderMaintenance),
            LifecycleError::Storage(e) => {
                tracing::error!(error = %e, "Storage error in lifecycle engine");
                AppError::storage(e.to_string())
            }
            LifecycleError::Internal(msg) => AppError::internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_carries_both_statuses() {
        let err: AppError = LifecycleError::InvalidOrderTransition {
            from: OrderStatus::Processing,
            to: OrderStatus::Shipped,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidOrderTransition);
        let details = err.details.unwrap();
        assert_eq!(details.get("current").unwrap(), "PROCESSING");
        assert_eq!(details.get("requested").unwrap(), "SHIPPED");
    }

    #[test]
    fn test_duplicate_refund_maps_to_conflict_code() {
        let err: AppError = LifecycleError::DuplicateRefund("ord_1".into()).into();
        assert_eq!(err.code, ErrorCode::DuplicateRefund);
    }
}
