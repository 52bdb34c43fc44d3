//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::TimerState;

/// API response structure for timer action endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerState,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, timer: TimerState) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    /// The action changed the timer
    pub fn applied(message: String, timer: TimerState) -> Self {
        Self::new("applied".to_string(), message, timer)
    }

    /// The action was not valid in the current state and did nothing
    pub fn ignored(message: String, timer: TimerState) -> Self {
        Self::new("ignored".to_string(), message, timer)
    }

    /// The action ran but a side effect failed
    pub fn error(message: String, timer: TimerState) -> Self {
        Self::new("error".to_string(), message, timer)
    }
}

/// Full status of the tab
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: TimerState,
    pub sound_repeating: bool,
    pub tab_hidden: bool,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Body of `PUT /timer/time`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SetTimeRequest {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

/// Body of `POST /timer/add`; negative values remove time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTimeRequest {
    pub seconds: i64,
}

/// Body of `PUT /timer/label`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRequest {
    pub label: String,
}

/// Body of `PUT /visibility`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityRequest {
    pub hidden: bool,
}
