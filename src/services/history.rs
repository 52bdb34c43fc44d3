//! History of completed countdowns

use std::sync::{Arc, Mutex, PoisonError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    storage::{load_json, save_json, KeyValueStore, StoreError},
    utils::Clock,
};

/// Storage key of the history list
pub const HISTORY_KEY: &str = "timer-history";
/// Oldest entries are dropped beyond this many
pub const MAX_HISTORY_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Timer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Committed duration in seconds
    pub duration: u64,
    /// Completion time, milliseconds since the epoch
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Newest-first list of completed countdowns
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    entries: Mutex<Vec<HistoryEntry>>,
}

impl HistoryStore {
    pub fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let entries = match load_json::<Vec<HistoryEntry>>(store.as_ref(), HISTORY_KEY) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to load history: {}", e);
                Vec::new()
            }
        };

        Self {
            store,
            clock,
            entries: Mutex::new(entries),
        }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        save_json(self.store.as_ref(), HISTORY_KEY, &entries)
    }

    /// Record a completed countdown at the front of the list
    pub fn add_entry(&self, duration: u64, label: Option<String>) -> HistoryEntry {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        // Ids are millisecond timestamps, bumped when two land in the same millisecond
        let mut id_ms = now;
        while entries.iter().any(|e| e.id == id_ms.to_string()) {
            id_ms += 1;
        }

        let entry = HistoryEntry {
            id: id_ms.to_string(),
            kind: EntryKind::Timer,
            duration,
            timestamp: now,
            label: label.filter(|l| !l.trim().is_empty()),
        };
        entries.insert(0, entry.clone());
        entries.truncate(MAX_HISTORY_ENTRIES);

        if let Err(e) = self.save(&entries) {
            warn!("Failed to save history: {}", e);
        }
        entry
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        if let Err(e) = self.save(&entries) {
            warn!("Failed to save cleared history: {}", e);
        }
    }
}
