//! Side effects emitted by lifecycle operations
//!
//! Effects are produced only after the aggregate write has committed and are
//! delivered best-effort by the caller; a failed delivery is logged and the
//! write is never rolled back.

use crate::collaborators::Notification;

/// Deferred side effect of a committed lifecycle operation
#[derive(Debug, Clone)]
pub enum SideEffect {
    /// Publish a user-facing notification
    Notify(Notification),
    /// Clear the user's cart after a successful checkout
    ClearCart { user_id: String },
    /// A voucher redemption was rolled back during cancellation
    VoucherReverted { code: String, order_id: String },
}
