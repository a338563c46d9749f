//! Shared domain types for the storefront backend
//!
//! This crate holds everything both the server and clients need to agree on:
//! the Order/Refund/Voucher models with their closed status enums and
//! transition tables, the unified error taxonomy, and small utilities.

pub mod error;
pub mod models;
pub mod util;

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
