//! Aggregate stores over the key-value layer

mod order;
mod refund;

pub use order::OrderStore;
pub use refund::RefundStore;
