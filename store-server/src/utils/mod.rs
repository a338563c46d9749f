//! Server-side utilities

pub mod logger;
