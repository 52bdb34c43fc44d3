//! Read-only timer view shared with the API and the ticker

use serde::{Deserialize, Serialize};

/// Run status of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Stopped,
    Running,
    Paused,
}

/// Point-in-time view of the countdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub tab_id: String,
    pub status: RunStatus,
    pub remaining_seconds: u64,
    pub initial_seconds: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub display: String,
    pub label: Option<String>,
    pub finished_while_inactive: bool,
    /// Fraction of the committed duration already elapsed, 0.0 to 1.0
    pub progress: f64,
}

impl TimerState {
    /// Check if the countdown is running
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Check if the countdown is paused
    pub fn is_paused(&self) -> bool {
        self.status == RunStatus::Paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(status: RunStatus) -> TimerState {
        TimerState {
            tab_id: "tab-1".to_string(),
            status,
            remaining_seconds: 42,
            initial_seconds: 60,
            hours: 0,
            minutes: 0,
            seconds: 42,
            display: "00:00:42".to_string(),
            label: None,
            finished_while_inactive: false,
            progress: 0.3,
        }
    }

    #[test]
    fn test_status_predicates() {
        assert!(view(RunStatus::Running).is_running());
        assert!(!view(RunStatus::Running).is_paused());
        assert!(view(RunStatus::Paused).is_paused());
        assert!(!view(RunStatus::Stopped).is_running());
    }

    #[test]
    fn test_view_serializes_snake_case_without_renames() {
        let json = serde_json::to_value(view(RunStatus::Paused)).unwrap();
        assert_eq!(json["remaining_seconds"], 42);
        assert_eq!(json["finished_while_inactive"], false);
        assert_eq!(json["status"], "paused");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(RunStatus::Paused).unwrap();
        assert_eq!(json, "paused");
    }
}
