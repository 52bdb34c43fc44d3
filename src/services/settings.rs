//! User preferences, persisted as one JSON blob

use std::sync::{Arc, PoisonError, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    services::sound::SoundPreferences,
    storage::{load_json, save_json, KeyValueStore, StoreError},
    utils::Clock,
};

/// Storage key of the settings blob
pub const SETTINGS_KEY: &str = "timer-settings";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// A saved duration the user can start with one click
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPreset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    pub seconds: u64,
}

/// Partial update for an existing preset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetUpdate {
    pub label: Option<String>,
    pub seconds: Option<u64>,
}

/// All user preferences
///
/// Fields missing from a stored blob take their default value, so a blob
/// saved by an older version merges cleanly over the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: Theme,
    pub sound_enabled: bool,
    /// Do not play sounds while the tab is hidden
    pub silent_on_tab_open: bool,
    pub repeat_bells: bool,
    pub confirm_before_close: bool,
    pub show_history: bool,
    pub custom_presets: Vec<TimerPreset>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            sound_enabled: true,
            silent_on_tab_open: false,
            repeat_bells: false,
            confirm_before_close: true,
            show_history: true,
            custom_presets: Vec::new(),
        }
    }
}

/// Why an import was rejected
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("settings are not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("settings must be a JSON object")]
    NotAnObject,

    #[error("settings have invalid values: {0}")]
    InvalidValues(#[source] serde_json::Error),

    #[error("failed to save imported settings: {0}")]
    Store(#[from] StoreError),
}

/// Overlay the top-level keys of `patch` onto `base`
fn merge_settings(base: &Settings, patch: &str) -> Result<Settings, ImportError> {
    let patch: serde_json::Value = serde_json::from_str(patch).map_err(ImportError::InvalidJson)?;
    let serde_json::Value::Object(patch) = patch else {
        return Err(ImportError::NotAnObject);
    };

    let mut merged = serde_json::to_value(base).map_err(ImportError::InvalidValues)?;
    if let serde_json::Value::Object(fields) = &mut merged {
        fields.extend(patch);
    }
    serde_json::from_value(merged).map_err(ImportError::InvalidValues)
}

/// Settings loaded once at startup and saved on every change
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    settings: RwLock<Settings>,
}

impl SettingsStore {
    /// Load stored settings merged over the defaults
    ///
    /// A corrupt blob is logged and the defaults are used.
    pub fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let settings = match load_json::<Settings>(store.as_ref(), SETTINGS_KEY) {
            Ok(Some(settings)) => {
                debug!("Loaded stored settings");
                settings
            }
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                Settings::default()
            }
        };

        Self {
            store,
            clock,
            settings: RwLock::new(settings),
        }
    }

    /// Copy of the current settings
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply a change and save, returning the updated settings
    fn update<F>(&self, updater: F) -> Settings
    where
        F: FnOnce(&mut Settings),
    {
        let updated = {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            updater(&mut settings);
            settings.clone()
        };
        if let Err(e) = save_json(self.store.as_ref(), SETTINGS_KEY, &updated) {
            warn!("Failed to save settings: {}", e);
        }
        updated
    }

    pub fn set_theme(&self, theme: Theme) -> Settings {
        self.update(|s| s.theme = theme)
    }

    pub fn set_sound_enabled(&self, enabled: bool) -> Settings {
        info!("Sound {}", if enabled { "enabled" } else { "disabled" });
        self.update(|s| s.sound_enabled = enabled)
    }

    pub fn set_silent_on_tab_open(&self, silent: bool) -> Settings {
        self.update(|s| s.silent_on_tab_open = silent)
    }

    pub fn set_repeat_bells(&self, repeat: bool) -> Settings {
        self.update(|s| s.repeat_bells = repeat)
    }

    pub fn set_confirm_before_close(&self, confirm: bool) -> Settings {
        self.update(|s| s.confirm_before_close = confirm)
    }

    pub fn set_show_history(&self, show: bool) -> Settings {
        self.update(|s| s.show_history = show)
    }

    /// Append a preset, assigning the current millisecond timestamp as id if it has none
    pub fn add_custom_preset(&self, preset: TimerPreset) -> TimerPreset {
        let id = preset
            .id
            .clone()
            .unwrap_or_else(|| self.clock.now_ms().to_string());
        let preset = TimerPreset {
            id: Some(id),
            ..preset
        };

        let added = preset.clone();
        self.update(move |s| s.custom_presets.push(preset));
        added
    }

    /// Remove a preset by id; returns whether one was removed
    pub fn remove_custom_preset(&self, id: &str) -> bool {
        let mut removed = false;
        self.update(|s| {
            let before = s.custom_presets.len();
            s.custom_presets.retain(|p| p.id.as_deref() != Some(id));
            removed = s.custom_presets.len() != before;
        });
        removed
    }

    /// Patch a preset by id; returns the updated preset if it exists
    pub fn update_custom_preset(&self, id: &str, update: PresetUpdate) -> Option<TimerPreset> {
        let mut updated = None;
        self.update(|s| {
            if let Some(preset) = s
                .custom_presets
                .iter_mut()
                .find(|p| p.id.as_deref() == Some(id))
            {
                if let Some(label) = update.label {
                    preset.label = label;
                }
                if let Some(seconds) = update.seconds {
                    preset.seconds = seconds;
                }
                updated = Some(preset.clone());
            }
        });
        updated
    }

    /// Pretty-printed JSON of the current settings
    pub fn export_settings(&self) -> String {
        serde_json::to_string_pretty(&self.settings()).unwrap_or_else(|e| {
            warn!("Failed to export settings: {}", e);
            "{}".to_string()
        })
    }

    /// Merge a JSON object over the current settings and save
    ///
    /// Nothing changes when the JSON is invalid.
    pub fn import_settings(&self, json: &str) -> Result<Settings, ImportError> {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let merged = merge_settings(&settings, json)?;
        save_json(self.store.as_ref(), SETTINGS_KEY, &merged)?;
        *settings = merged.clone();
        info!("Imported settings");
        Ok(merged)
    }
}

impl SoundPreferences for SettingsStore {
    fn sound_enabled(&self) -> bool {
        self.settings.read().map(|s| s.sound_enabled).unwrap_or(true)
    }

    fn silent_when_hidden(&self) -> bool {
        self.settings.read().map(|s| s.silent_on_tab_open).unwrap_or(false)
    }

    fn repeat_bells(&self) -> bool {
        self.settings.read().map(|s| s.repeat_bells).unwrap_or(false)
    }
}
