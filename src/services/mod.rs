//! Collaborators of the countdown
//!
//! This module contains the settings and history stores and the notification
//! sound controller.

pub mod history;
pub mod settings;
pub mod sound;

// Re-export main types
pub use history::{EntryKind, HistoryEntry, HistoryStore};
pub use settings::{ImportError, PresetUpdate, Settings, SettingsStore, Theme, TimerPreset};
pub use sound::{
    AudioError, SilentPlayer, SoundController, SoundPreferences, TabVisibility, TerminalBell,
    Tone, TonePlayer, VisibilityFlag,
};
