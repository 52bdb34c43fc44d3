//! State management module
//!
//! This module contains the countdown state machine, its persisted record and
//! the application state that wraps it for the server.

pub mod app_state;
pub mod countdown;
pub mod tab_identity;
pub mod timer_record;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, TimerServices};
pub use countdown::CountdownTimer;
pub use tab_identity::{TabId, TAB_ID_KEY};
pub use timer_record::{storage_key, RecoveryOutcome, TimerRecord};
pub use timer_state::{RunStatus, TimerState};
