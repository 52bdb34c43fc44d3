//! Persisted timer record and recovery outcomes

use serde::{Deserialize, Serialize};

/// Prefix of the per-tab storage key, the full key is `timer-state-<tabId>`
pub const STORAGE_KEY_PREFIX: &str = "timer-state";

/// Storage key for a tab's timer record
pub fn storage_key(tab_id: &str) -> String {
    format!("{}-{}", STORAGE_KEY_PREFIX, tab_id)
}

/// One tab's timer, exactly as written to durable storage
///
/// Missing fields fall back to their defaults so records written by older
/// versions still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerRecord {
    pub tab_id: String,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub is_running: bool,
    pub is_paused: bool,
    pub remaining_seconds: u64,
    pub initial_seconds: u64,
    /// Milliseconds since the epoch at which the running interval began
    pub start_time: Option<i64>,
    pub paused_at: Option<i64>,
    pub paused_remaining: Option<u64>,
    pub timer_finished_while_inactive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// What `load_state` found when the tab (re)initialised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No usable record; the timer starts from the zero state
    Fresh,
    /// The timer was running and still has time left; polling must be re-armed
    Resumed { remaining_seconds: u64 },
    /// The timer ran out while nothing was watching it
    ExpiredWhileInactive,
    Paused { remaining_seconds: u64 },
    Stopped,
}

impl RecoveryOutcome {
    /// Whether the caller has to restart its tick loop
    pub fn should_resume(&self) -> bool {
        matches!(self, RecoveryOutcome::Resumed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_is_namespaced() {
        assert_eq!(storage_key("tab-1-abc"), "timer-state-tab-1-abc");
    }

    #[test]
    fn test_record_uses_camel_case_fields() {
        let record = TimerRecord {
            tab_id: "tab-1".to_string(),
            is_running: true,
            initial_seconds: 60,
            start_time: Some(1_000),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["tabId"], "tab-1");
        assert_eq!(json["isRunning"], true);
        assert_eq!(json["initialSeconds"], 60);
        assert_eq!(json["startTime"], 1_000);
        assert!(json["pausedAt"].is_null());
        assert_eq!(json["timerFinishedWhileInactive"], false);
        assert!(json.get("label").is_none());
    }

    #[test]
    fn test_record_tolerates_missing_fields() {
        let record: TimerRecord =
            serde_json::from_str(r#"{"isPaused":true,"pausedRemaining":42}"#).unwrap();
        assert!(record.is_paused);
        assert_eq!(record.paused_remaining, Some(42));
        assert_eq!(record.hours, 0);
        assert_eq!(record.start_time, None);
        assert!(!record.timer_finished_while_inactive);
    }

    #[test]
    fn test_only_resumed_requests_polling() {
        assert!(RecoveryOutcome::Resumed { remaining_seconds: 3 }.should_resume());
        assert!(!RecoveryOutcome::ExpiredWhileInactive.should_resume());
        assert!(!RecoveryOutcome::Paused { remaining_seconds: 3 }.should_resume());
        assert!(!RecoveryOutcome::Fresh.should_resume());
        assert!(!RecoveryOutcome::Stopped.should_resume());
    }
}
