//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use super::{CountdownTimer, TimerState};
use crate::{
    services::{HistoryEntry, HistoryStore, SettingsStore, SoundController, VisibilityFlag},
    storage::StoreError,
    utils::format::format_uptime,
};

/// Collaborators of the countdown that live alongside it
pub struct TimerServices {
    pub settings: Arc<SettingsStore>,
    pub history: Arc<HistoryStore>,
    pub sound: SoundController,
    pub visibility: Arc<VisibilityFlag>,
}

/// Main application state that owns the tab's countdown and its collaborators
pub struct AppState {
    /// The countdown state machine
    pub timer: Arc<Mutex<CountdownTimer>>,
    /// Collaborators
    pub settings: Arc<SettingsStore>,
    pub history: Arc<HistoryStore>,
    pub sound: SoundController,
    pub visibility: Arc<VisibilityFlag>,
    /// Polling cadence of the ticker task
    pub tick_interval: Duration,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Channel for run-state changes (start, pause, stop, finish, ...)
    pub state_change_tx: broadcast::Sender<TimerState>,
    /// Channel carrying the latest view, including every tick
    pub timer_update_tx: watch::Sender<TimerState>,
    /// Keep the receiver alive to prevent channel closure
    pub _timer_update_rx: watch::Receiver<TimerState>,
}

impl AppState {
    pub fn new(
        timer: CountdownTimer,
        services: TimerServices,
        port: u16,
        host: String,
        tick_interval: Duration,
    ) -> Self {
        let (state_change_tx, _) = broadcast::channel(100);
        let (timer_update_tx, timer_update_rx) = watch::channel(timer.snapshot());

        Self {
            timer: Arc::new(Mutex::new(timer)),
            settings: services.settings,
            history: services.history,
            sound: services.sound,
            visibility: services.visibility,
            tick_interval,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            state_change_tx,
            timer_update_tx,
            _timer_update_rx: timer_update_rx,
        }
    }

    fn publish(&self, snapshot: &TimerState, run_state_changed: bool) {
        if run_state_changed {
            // No subscribers is fine, e.g. before the ticker starts
            let _ = self.state_change_tx.send(snapshot.clone());
        }
        if let Err(e) = self.timer_update_tx.send(snapshot.clone()) {
            warn!("Failed to send timer update: {}", e);
        }
    }

    /// Apply a user action to the countdown and notify listeners
    ///
    /// The run-state channel only hears about actions that can change whether
    /// the countdown is running; every action updates the watch channel.
    pub fn update_timer<F, R>(&self, action: &str, updater: F) -> Result<(R, TimerState), String>
    where
        F: FnOnce(&mut CountdownTimer) -> R,
    {
        let mut timer = self.timer.lock()
            .map_err(|e| format!("Failed to lock timer: {}", e))?;

        let status_before = timer.status();
        let result = updater(&mut *timer);
        let snapshot = timer.snapshot();
        drop(timer); // Release the lock early

        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }

        self.publish(&snapshot, snapshot.status != status_before);
        Ok((result, snapshot))
    }

    /// Start the configured countdown; returns whether it started
    pub fn start(&self) -> Result<(bool, TimerState), String> {
        self.sound.cancel_repeat();
        self.update_timer("start", |timer| timer.start())
    }

    pub fn pause(&self) -> Result<(bool, TimerState), String> {
        self.update_timer("pause", |timer| timer.pause())
    }

    pub fn resume(&self) -> Result<(bool, TimerState), String> {
        self.update_timer("resume", |timer| timer.resume())
    }

    pub fn stop(&self) -> Result<TimerState, String> {
        self.sound.cancel_repeat();
        self.update_timer("stop", |timer| timer.stop()).map(|(_, s)| s)
    }

    pub fn reset(&self) -> Result<TimerState, String> {
        self.sound.cancel_repeat();
        self.update_timer("reset", |timer| timer.reset()).map(|(_, s)| s)
    }

    pub fn set_time(&self, hours: u64, minutes: u64, seconds: u64) -> Result<TimerState, String> {
        self.update_timer("set-time", |timer| timer.set_configured_time(hours, minutes, seconds))
            .map(|(_, s)| s)
    }

    pub fn add_time(&self, delta_seconds: i64) -> Result<TimerState, String> {
        self.update_timer("add-time", |timer| timer.add_time(delta_seconds))
            .map(|(_, s)| s)
    }

    pub fn set_label(&self, label: &str) -> Result<TimerState, String> {
        self.update_timer("set-label", |timer| timer.set_label(label))
            .map(|(_, s)| s)
    }

    /// Dismiss the finished indicator and silence any repeating bells
    pub fn acknowledge(&self) -> Result<TimerState, String> {
        self.sound.cancel_repeat();
        self.update_timer("acknowledge", |timer| timer.clear_finished_indicator())
            .map(|(_, s)| s)
    }

    /// Delete the persisted countdown and return to the zero state
    pub fn clear(&self) -> Result<(Result<(), StoreError>, TimerState), String> {
        self.sound.cancel_repeat();
        self.update_timer("clear", |timer| timer.clear_state())
    }

    /// Advance the countdown from the wall clock
    ///
    /// Returns the finished view on the tick that observed expiry.
    pub fn tick(&self) -> Result<Option<TimerState>, String> {
        let mut timer = self.timer.lock()
            .map_err(|e| format!("Failed to lock timer: {}", e))?;

        let finished = timer.tick();
        let snapshot = timer.snapshot();
        drop(timer);

        self.publish(&snapshot, finished);
        Ok(finished.then_some(snapshot))
    }

    /// React to a countdown that just ran out while being watched
    ///
    /// Recovery of a countdown that ran out while the tab was closed does not
    /// come through here, so it shows the indicator without playing sound.
    pub fn handle_finished(&self, finished: &TimerState) -> HistoryEntry {
        info!("Countdown finished, playing notification");
        self.sound.notify_finished();
        self.history.add_entry(finished.initial_seconds, finished.label.clone())
    }

    /// Get current timer state
    pub fn get_timer_state(&self) -> Result<TimerState, String> {
        self.timer.lock()
            .map(|timer| timer.snapshot())
            .map_err(|e| format!("Failed to lock timer: {}", e))
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_uptime(self.start_time.elapsed().as_secs())
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Re-announce the current state so the ticker picks up a recovered countdown
    pub fn trigger_state_check(&self) -> Result<(), String> {
        let current_state = self.get_timer_state()?;

        if let Err(e) = self.state_change_tx.send(current_state) {
            warn!("Failed to send initial state check: {}", e);
            return Err(format!("Failed to trigger state check: {}", e));
        }

        info!("Initial state check triggered");
        Ok(())
    }
}
