//! Store Server - retail storefront backend
//!
//! # Architecture
//!
//! - **storage**: key-value abstraction (in-memory + redb)
//! - **stores**: order and refund aggregate stores over the KV layer
//! - **lifecycle**: the order/refund transition engine and cancel saga
//! - **vouchers**: validation, idempotent redemption and revert
//! - **collaborators**: trait seams for auth, catalog, notifications,
//!   evidence storage and the maintenance gate
//! - **sync**: watermark-based polling sync
//! - **api**: axum HTTP layer
//! - **core**: config, shared state, server boot
//!
//! # Module structure
//!
//! ```text
//! store-server/src/
//! ├── core/           # Config, ServerState, Server
//! ├── storage/        # KvStore trait + MemoryStore + RedbStore
//! ├── stores/         # OrderStore, RefundStore
//! ├── lifecycle/      # LifecycleEngine, errors, side effects
//! ├── vouchers/       # VoucherService
//! ├── collaborators/  # External service traits + in-memory impls
//! ├── sync/           # SyncService, PollState
//! ├── api/            # HTTP routes and handlers
//! └── utils/          # Logger setup
//! ```

pub mod api;
pub mod collaborators;
pub mod core;
pub mod lifecycle;
pub mod storage;
pub mod stores;
pub mod sync;
pub mod utils;
pub mod vouchers;

pub use api::{AdminUser, CurrentUser};
pub use core::{Config, Server, ServerState};
pub use lifecycle::{LifecycleEngine, LifecycleError, LifecycleResult, VoucherRevertPolicy};
pub use sync::{PollState, SyncService};

// Re-export unified error types from shared
pub use shared::{ApiResponse, AppError, AppResult, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};
