//! Unified error codes for the storefront backend
//!
//! This module defines all error codes used across the server and clients.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Refund errors
//! - 6xxx: Voucher / catalog errors
//! - 9xxx: System errors

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Session token is invalid or expired
    SessionInvalid = 1002,
    /// Account is suspended
    AccountSuspended = 1003,
    /// Account is banned
    AccountBanned = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2002,
    /// Actor does not own the resource
    NotResourceOwner = 2003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Requested status is not a legal successor of the current status
    InvalidOrderTransition = 4002,
    /// Order has already been cancelled
    OrderAlreadyCancelled = 4003,
    /// Order cannot be cancelled in its current state
    OrderNotCancellable = 4004,
    /// Fulfillment cannot advance before payment is confirmed
    OrderNotPaid = 4005,
    /// Order has no items
    OrderEmpty = 4006,
    /// Another checkout is already in flight for this user
    CheckoutInFlight = 4007,
    /// Total amount does not match subtotal + shipping - discount
    OrderTotalMismatch = 4008,

    // ==================== 5xxx: Refund ====================
    /// Refund not found
    RefundNotFound = 5001,
    /// A refund already exists for this order
    DuplicateRefund = 5002,
    /// Requested status is not a legal successor of the current status
    InvalidRefundTransition = 5003,
    /// Order is not in a refund-eligible state
    RefundNotEligible = 5004,
    /// Evidence is required for a user-requested refund
    EvidenceRequired = 5005,
    /// Courier is required to approve a return
    CourierRequired = 5006,
    /// A rejection reason is required
    RejectReasonRequired = 5007,
    /// A refund method is required to execute the payout
    RefundMethodRequired = 5008,

    // ==================== 6xxx: Voucher / Catalog ====================
    /// Voucher not found
    VoucherNotFound = 6001,
    /// Voucher is not active
    VoucherInactive = 6002,
    /// Voucher has expired
    VoucherExpired = 6003,
    /// Voucher belongs to a different user
    VoucherNotOwned = 6004,
    /// Order subtotal is below the voucher minimum purchase
    VoucherMinPurchase = 6005,
    /// Voucher usage limit reached
    VoucherExhausted = 6006,
    /// Product not found
    ProductNotFound = 6101,
    /// Product is out of stock
    ProductOutOfStock = 6102,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Storage error
    StorageError = 9002,
    /// Store is under maintenance
    UnderMaintenance = 9003,
    /// System busy (IO error, retry later)
    SystemBusy = 9004,
}

/// Error category, used for logging decisions and status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    General,
    Auth,
    Permission,
    Order,
    Refund,
    Voucher,
    System,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the category of this error code
    pub const fn category(&self) -> ErrorCategory {
        match self.code() {
            0..=999 => ErrorCategory::General,
            1000..=1999 => ErrorCategory::Auth,
            2000..=2999 => ErrorCategory::Permission,
            4000..=4999 => ErrorCategory::Order,
            5000..=5999 => ErrorCategory::Refund,
            6000..=6999 => ErrorCategory::Voucher,
            _ => ErrorCategory::System,
        }
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::SessionInvalid => "Session token is invalid or expired",
            ErrorCode::AccountSuspended => "Account is suspended",
            ErrorCode::AccountBanned => "Account is banned",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::NotResourceOwner => "You do not own this resource",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidOrderTransition => "Order cannot move to the requested status",
            ErrorCode::OrderAlreadyCancelled => "Order has already been cancelled",
            ErrorCode::OrderNotCancellable => "Order can no longer be cancelled",
            ErrorCode::OrderNotPaid => "Order payment has not been confirmed",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::CheckoutInFlight => "A checkout is already in progress",
            ErrorCode::OrderTotalMismatch => "Order total does not add up",

            // Refund
            ErrorCode::RefundNotFound => "Refund not found",
            ErrorCode::DuplicateRefund => "A refund already exists for this order",
            ErrorCode::InvalidRefundTransition => "Refund cannot move to the requested status",
            ErrorCode::RefundNotEligible => "Order is not eligible for a refund",
            ErrorCode::EvidenceRequired => "Evidence is required for a return request",
            ErrorCode::CourierRequired => "A courier must be assigned to approve a return",
            ErrorCode::RejectReasonRequired => "A rejection reason is required",
            ErrorCode::RefundMethodRequired => "A refund method is required",

            // Voucher / Catalog
            ErrorCode::VoucherNotFound => "Voucher not found",
            ErrorCode::VoucherInactive => "Voucher is not active",
            ErrorCode::VoucherExpired => "Voucher has expired",
            ErrorCode::VoucherNotOwned => "Voucher belongs to a different user",
            ErrorCode::VoucherMinPurchase => "Order does not meet the voucher minimum purchase",
            ErrorCode::VoucherExhausted => "Voucher usage limit reached",
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductOutOfStock => "Product is out of stock",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Storage error",
            ErrorCode::UnderMaintenance => "Store is under maintenance",
            ErrorCode::SystemBusy => "System busy, please retry",
        }
    }

    /// Get the HTTP status code for this error
    pub const fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::Success => StatusCode::OK,

            ErrorCode::NotFound
            | ErrorCode::OrderNotFound
            | ErrorCode::RefundNotFound
            | ErrorCode::VoucherNotFound
            | ErrorCode::ProductNotFound => StatusCode::NOT_FOUND,

            ErrorCode::NotAuthenticated | ErrorCode::SessionInvalid => StatusCode::UNAUTHORIZED,

            ErrorCode::AccountSuspended
            | ErrorCode::AccountBanned
            | ErrorCode::PermissionDenied
            | ErrorCode::AdminRequired
            | ErrorCode::NotResourceOwner => StatusCode::FORBIDDEN,

            ErrorCode::AlreadyExists | ErrorCode::DuplicateRefund | ErrorCode::CheckoutInFlight => {
                StatusCode::CONFLICT
            }

            ErrorCode::InvalidOrderTransition
            | ErrorCode::OrderAlreadyCancelled
            | ErrorCode::OrderNotCancellable
            | ErrorCode::OrderNotPaid
            | ErrorCode::InvalidRefundTransition
            | ErrorCode::RefundNotEligible => StatusCode::UNPROCESSABLE_ENTITY,

            ErrorCode::UnderMaintenance => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::InternalError
            | ErrorCode::StorageError
            | ErrorCode::SystemBusy
            | ErrorCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,

            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => ErrorCode::Success,
            1 => ErrorCode::Unknown,
            2 => ErrorCode::ValidationFailed,
            3 => ErrorCode::NotFound,
            4 => ErrorCode::AlreadyExists,
            5 => ErrorCode::InvalidRequest,
            7 => ErrorCode::RequiredField,
            1001 => ErrorCode::NotAuthenticated,
            1002 => ErrorCode::SessionInvalid,
            1003 => ErrorCode::AccountSuspended,
            1004 => ErrorCode::AccountBanned,
            2001 => ErrorCode::PermissionDenied,
            2002 => ErrorCode::AdminRequired,
            2003 => ErrorCode::NotResourceOwner,
            4001 => ErrorCode::OrderNotFound,
            4002 => ErrorCode::InvalidOrderTransition,
            4003 => ErrorCode::OrderAlreadyCancelled,
            4004 => ErrorCode::OrderNotCancellable,
            4005 => ErrorCode::OrderNotPaid,
            4006 => ErrorCode::OrderEmpty,
            4007 => ErrorCode::CheckoutInFlight,
            4008 => ErrorCode::OrderTotalMismatch,
            5001 => ErrorCode::RefundNotFound,
            5002 => ErrorCode::DuplicateRefund,
            5003 => ErrorCode::InvalidRefundTransition,
            5004 => ErrorCode::RefundNotEligible,
            5005 => ErrorCode::EvidenceRequired,
            5006 => ErrorCode::CourierRequired,
            5007 => ErrorCode::RejectReasonRequired,
            5008 => ErrorCode::RefundMethodRequired,
            6001 => ErrorCode::VoucherNotFound,
            6002 => ErrorCode::VoucherInactive,
            6003 => ErrorCode::VoucherExpired,
            6004 => ErrorCode::VoucherNotOwned,
            6005 => ErrorCode::VoucherMinPurchase,
            6006 => ErrorCode::VoucherExhausted,
            6101 => ErrorCode::ProductNotFound,
            6102 => ErrorCode::ProductOutOfStock,
            9001 => ErrorCode::InternalError,
            9002 => ErrorCode::StorageError,
            9003 => ErrorCode::UnderMaintenance,
            9004 => ErrorCode::SystemBusy,
            _ => return Err(format!("Unknown error code: {}", value)),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::InvalidOrderTransition,
            ErrorCode::DuplicateRefund,
            ErrorCode::VoucherExpired,
            ErrorCode::UnderMaintenance,
        ] {
            let n: u16 = code.into();
            assert_eq!(ErrorCode::try_from(n).unwrap(), code);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!(ErrorCode::try_from(12345).is_err());
    }

    #[test]
    fn test_categories() {
        assert_eq!(ErrorCode::SessionInvalid.category(), ErrorCategory::Auth);
        assert_eq!(
            ErrorCode::NotResourceOwner.category(),
            ErrorCategory::Permission
        );
        assert_eq!(
            ErrorCode::InvalidOrderTransition.category(),
            ErrorCategory::Order
        );
        assert_eq!(ErrorCode::DuplicateRefund.category(), ErrorCategory::Refund);
        assert_eq!(ErrorCode::VoucherExpired.category(), ErrorCategory::Voucher);
        assert_eq!(ErrorCode::StorageError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            ErrorCode::OrderNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::NotAuthenticated.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::AdminRequired.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ErrorCode::DuplicateRefund.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::InvalidRefundTransition.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::UnderMaintenance.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
