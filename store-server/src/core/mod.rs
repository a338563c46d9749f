//! Configuration, shared state and server boot

mod config;
mod server;
mod state;

pub use config::Config;
pub use server::Server;
pub use state::{CheckoutGuard, ServerState};
