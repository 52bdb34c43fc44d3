//! Tab Timer - A countdown timer that survives restarts
//!
//! Each tab owns one countdown anchored to the wall clock. Its state is
//! persisted under a per-tab key so a reopened tab picks up where it left off,
//! including countdowns that ran out while nobody was watching.

pub mod config;
pub mod state;
pub mod api;
pub mod services;
pub mod storage;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use state::{AppState, CountdownTimer};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
