//! Unified error handling for the storefront backend
//!
//! Provides the [`ErrorCode`] taxonomy, the [`AppError`] application error
//! type, and the [`ApiResponse`] envelope returned by every HTTP endpoint.

mod codes;
mod types;

pub use codes::{ErrorCategory, ErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
