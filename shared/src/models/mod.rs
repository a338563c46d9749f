//! Domain models shared between the server and clients

mod identity;
mod order;
mod refund;
mod voucher;

pub use identity::{AccountStatus, Identity, Role};
pub use order::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, StatusEntry};
pub use refund::{Refund, RefundStatus, RefundType, ReturnShipping, ReturnShippingStatus};
pub use voucher::{DiscountType, Voucher, VoucherStatus};
