//! Utility functions module
//! 
//! This module contains utility functions used throughout the application.

pub mod clock;
pub mod format;
pub mod scheduler;
pub mod signals;

// Re-export main functions
pub use clock::{Clock, ManualClock, SystemClock};
pub use format::{format_hms, split_hms};
pub use scheduler::{ManualScheduler, Scheduler, TaskHandle, TokioScheduler};
pub use signals::shutdown_signal;
