//! Countdown state machine with wall-clock anchored persistence
//!
//! While the countdown runs, the remaining time is never counted down in
//! place. It is recomputed from the start anchor on every read:
//!
//! ```text
//! remaining = initial_seconds - floor((now - start_time) / 1000)
//! ```
//!
//! so missed ticks, a suspended host or a restarted process cannot make the
//! timer drift. Pausing snapshots the remaining value; resuming backdates the
//! anchor so the formula reproduces that snapshot exactly.
//!
//! Every mutation is written to the tab's record in the durable store. The
//! record is read back once, by [`CountdownTimer::load_state`], when the tab
//! initialises.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    tab_identity::TabId,
    timer_record::{storage_key, RecoveryOutcome, TimerRecord},
    timer_state::{RunStatus, TimerState},
};
use crate::{
    storage::{load_json, save_json, KeyValueStore, StoreError},
    utils::{format_hms, split_hms, Clock},
};

/// While running, state is written only on whole seconds divisible by this
const SAVE_EVERY_SECS: u64 = 5;

/// The countdown owned by one tab
pub struct CountdownTimer {
    tab_id: TabId,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,

    hours: u64,
    minutes: u64,
    seconds: u64,
    initial_seconds: u64,
    label: String,

    status: RunStatus,
    remaining_seconds: u64,
    start_time: Option<i64>,
    paused_at: Option<i64>,
    paused_remaining: Option<u64>,
    finished_while_inactive: bool,

    /// Set while `load_state` applies a stored record; suppresses writes
    restoring: bool,
}

impl CountdownTimer {
    /// Create a zeroed countdown without touching storage
    pub fn new(tab_id: TabId, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tab_id,
            store,
            clock,
            hours: 0,
            minutes: 0,
            seconds: 0,
            initial_seconds: 0,
            label: String::new(),
            status: RunStatus::Stopped,
            remaining_seconds: 0,
            start_time: None,
            paused_at: None,
            paused_remaining: None,
            finished_while_inactive: false,
            restoring: false,
        }
    }

    /// Create a countdown and reconcile it with the tab's stored record
    pub fn open(
        tab_id: TabId,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> (Self, RecoveryOutcome) {
        let mut timer = Self::new(tab_id, store, clock);
        let outcome = timer.load_state();
        (timer, outcome)
    }

    pub fn tab_id(&self) -> &TabId {
        &self.tab_id
    }

    pub fn storage_key(&self) -> String {
        storage_key(self.tab_id.as_str())
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub fn is_paused(&self) -> bool {
        self.status == RunStatus::Paused
    }

    /// Configured duration, or the display breakdown while a countdown is live
    pub fn configured_time(&self) -> (u64, u64, u64) {
        (self.hours, self.minutes, self.seconds)
    }

    pub fn configured_total(&self) -> u64 {
        self.hours
            .saturating_mul(3600)
            .saturating_add(self.minutes.saturating_mul(60))
            .saturating_add(self.seconds)
    }

    /// Last computed remaining value; derived on every tick while running
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn initial_seconds(&self) -> u64 {
        self.initial_seconds
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    pub fn paused_at(&self) -> Option<i64> {
        self.paused_at
    }

    pub fn paused_remaining(&self) -> Option<u64> {
        self.paused_remaining
    }

    pub fn finished_while_inactive(&self) -> bool {
        self.finished_while_inactive
    }

    pub fn label(&self) -> Option<&str> {
        if self.label.is_empty() {
            None
        } else {
            Some(&self.label)
        }
    }

    /// Whole seconds elapsed since `start`, never negative
    fn elapsed_secs(now_ms: i64, start_ms: i64) -> u64 {
        (now_ms.saturating_sub(start_ms).max(0) / 1000) as u64
    }

    /// Remaining seconds right now, recomputed from the anchor when running
    pub fn current_remaining(&self) -> u64 {
        match (self.status, self.start_time) {
            (RunStatus::Running, Some(start)) => {
                let elapsed = Self::elapsed_secs(self.clock.now_ms(), start);
                self.initial_seconds.saturating_sub(elapsed)
            }
            _ => self.remaining_seconds,
        }
    }

    /// Rewrite the hours/minutes/seconds fields from the remaining value
    pub fn update_time_from_remaining(&mut self) {
        let (h, m, s) = split_hms(self.remaining_seconds);
        self.hours = h;
        self.minutes = m;
        self.seconds = s;
    }

    /// Start counting down the configured duration
    ///
    /// Does nothing when the configured duration is zero. Returns whether the
    /// countdown started.
    pub fn start(&mut self) -> bool {
        let total = self.configured_total();
        if total == 0 {
            debug!("Ignoring start with a zero duration");
            return false;
        }

        self.initial_seconds = total;
        self.remaining_seconds = total;
        self.status = RunStatus::Running;
        self.start_time = Some(self.clock.now_ms());
        self.paused_at = None;
        self.paused_remaining = None;
        self.finished_while_inactive = false;
        self.persist();

        info!("Countdown started for {}", format_hms(total));
        true
    }

    /// Freeze the countdown at its current remaining value
    pub fn pause(&mut self) -> bool {
        if self.status != RunStatus::Running {
            debug!("Ignoring pause while {:?}", self.status);
            return false;
        }

        let now = self.clock.now_ms();
        self.remaining_seconds = self.current_remaining();
        self.update_time_from_remaining();
        self.status = RunStatus::Paused;
        self.paused_at = Some(now);
        self.paused_remaining = Some(self.remaining_seconds);
        self.start_time = None;
        self.persist();

        info!("Countdown paused with {} left", format_hms(self.remaining_seconds));
        true
    }

    /// Continue a paused countdown from exactly where it was paused
    pub fn resume(&mut self) -> bool {
        let paused_remaining = match (self.status, self.paused_remaining) {
            (RunStatus::Paused, Some(paused_remaining)) => paused_remaining,
            _ => {
                debug!("Ignoring resume while {:?}", self.status);
                return false;
            }
        };

        // Backdate the anchor by the time already spent so the elapsed-time
        // formula yields `paused_remaining` immediately
        let already_elapsed = self.initial_seconds.saturating_sub(paused_remaining) as i64;
        self.remaining_seconds = paused_remaining;
        self.start_time = Some(self.clock.now_ms() - already_elapsed * 1000);
        self.status = RunStatus::Running;
        self.paused_at = None;
        self.paused_remaining = None;
        self.persist();

        info!("Countdown resumed with {} left", format_hms(paused_remaining));
        true
    }

    fn halt(&mut self) {
        if self.status == RunStatus::Running {
            self.remaining_seconds = self.current_remaining();
        }
        self.status = RunStatus::Stopped;
        self.start_time = None;
        self.paused_at = None;
        self.paused_remaining = None;
        self.finished_while_inactive = false;
    }

    /// Stop the countdown, keeping the configured duration
    pub fn stop(&mut self) {
        self.halt();
        self.persist();
        debug!("Countdown stopped");
    }

    /// Stop and forget the configured duration and label
    pub fn reset(&mut self) {
        self.halt();
        self.hours = 0;
        self.minutes = 0;
        self.seconds = 0;
        self.remaining_seconds = 0;
        self.initial_seconds = 0;
        self.label.clear();
        self.persist();
        debug!("Countdown reset");
    }

    /// Advance the countdown from the clock
    ///
    /// Returns `true` only on the call that observes expiry. Calling it again
    /// afterwards, or while not running, does nothing.
    pub fn tick(&mut self) -> bool {
        let start = match (self.status, self.start_time) {
            (RunStatus::Running, Some(start)) => start,
            _ => return false,
        };

        let elapsed = Self::elapsed_secs(self.clock.now_ms(), start);
        if elapsed < self.initial_seconds {
            self.remaining_seconds = self.initial_seconds - elapsed;
            self.update_time_from_remaining();
            if elapsed % SAVE_EVERY_SECS == 0 {
                self.persist();
            }
            return false;
        }

        self.remaining_seconds = 0;
        self.halt();
        self.finished_while_inactive = true;
        self.update_time_from_remaining();
        self.persist();

        info!("Countdown finished after {}", format_hms(self.initial_seconds));
        true
    }

    /// Set the configured duration
    ///
    /// Outside of a running countdown this also dismisses the finished flag.
    pub fn set_configured_time(&mut self, hours: u64, minutes: u64, seconds: u64) {
        self.hours = hours;
        self.minutes = minutes;
        self.seconds = seconds;
        if self.status != RunStatus::Running {
            self.finished_while_inactive = false;
        }
        self.persist();
    }

    /// Add (or with a negative delta, remove) time
    ///
    /// A running countdown extends its committed duration and keeps its start
    /// anchor, so elapsed time stays `initial_seconds - remaining_seconds`.
    /// Otherwise the configured duration is adjusted and clamped at zero.
    pub fn add_time(&mut self, delta_seconds: i64) {
        if self.status == RunStatus::Running {
            let current = self.current_remaining();
            let elapsed = self.initial_seconds.saturating_sub(current);
            // Never take away more than is left
            let applied = delta_seconds.max(-i64::try_from(current).unwrap_or(i64::MAX));
            self.initial_seconds = self.initial_seconds.saturating_add_signed(applied);
            self.remaining_seconds = self.initial_seconds.saturating_sub(elapsed);
            self.update_time_from_remaining();
            debug!("Added {}s to running countdown", applied);
        } else {
            let total = self.configured_total().saturating_add_signed(delta_seconds);
            let (h, m, s) = split_hms(total);
            self.hours = h;
            self.minutes = m;
            self.seconds = s;
            self.finished_while_inactive = false;
            debug!("Adjusted configured duration by {}s", delta_seconds);
        }
        self.persist();
    }

    /// Store a trimmed label; an empty label clears it
    pub fn set_label(&mut self, label: &str) {
        self.label = label.trim().to_string();
        self.persist();
    }

    /// Dismiss the finished flag without touching the run state
    pub fn clear_finished_indicator(&mut self) {
        self.finished_while_inactive = false;
        self.persist();
    }

    pub fn to_record(&self) -> TimerRecord {
        TimerRecord {
            tab_id: self.tab_id.to_string(),
            hours: self.hours,
            minutes: self.minutes,
            seconds: self.seconds,
            is_running: self.status == RunStatus::Running,
            is_paused: self.status == RunStatus::Paused,
            remaining_seconds: self.remaining_seconds,
            initial_seconds: self.initial_seconds,
            start_time: self.start_time,
            paused_at: self.paused_at,
            paused_remaining: self.paused_remaining,
            timer_finished_while_inactive: self.finished_while_inactive,
            label: self.label().map(str::to_string),
        }
    }

    /// Point-in-time view for callers outside the state machine
    pub fn snapshot(&self) -> TimerState {
        let remaining = self.current_remaining();
        // A stopped countdown shows its configured duration
        let shown = if self.status == RunStatus::Stopped {
            self.configured_total()
        } else {
            remaining
        };
        let (hours, minutes, seconds) = if self.status == RunStatus::Stopped {
            (self.hours, self.minutes, self.seconds)
        } else {
            split_hms(remaining)
        };
        let progress = if self.initial_seconds > 0 && self.status != RunStatus::Stopped {
            let spent = self.initial_seconds.saturating_sub(remaining);
            (spent as f64 / self.initial_seconds as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };

        TimerState {
            tab_id: self.tab_id.to_string(),
            status: self.status,
            remaining_seconds: remaining,
            initial_seconds: self.initial_seconds,
            hours,
            minutes,
            seconds,
            display: format_hms(shown),
            label: self.label().map(str::to_string),
            finished_while_inactive: self.finished_while_inactive,
            progress,
        }
    }

    /// Write the tab's record, replacing any previous one
    pub fn save_state(&self) -> Result<(), StoreError> {
        save_json(self.store.as_ref(), &self.storage_key(), &self.to_record())
    }

    fn persist(&self) {
        if self.restoring {
            debug!("Skipping save while restoring timer state");
            return;
        }
        if let Err(e) = self.save_state() {
            warn!("Failed to save timer state: {}", e);
        }
    }

    /// Reconcile the in-memory countdown with the tab's stored record
    ///
    /// Call once, before any user interaction. A countdown that ran out while
    /// the tab was closed comes back stopped with the finished flag set, and
    /// that resolution is written back immediately. Unreadable records are
    /// logged and treated as absent.
    pub fn load_state(&mut self) -> RecoveryOutcome {
        self.restoring = true;
        let outcome = self.restore();
        self.restoring = false;

        if outcome == RecoveryOutcome::ExpiredWhileInactive {
            self.persist();
        }
        outcome
    }

    fn restore(&mut self) -> RecoveryOutcome {
        let key = self.storage_key();
        let record: TimerRecord = match load_json(self.store.as_ref(), &key) {
            Ok(Some(record)) => record,
            Ok(None) => return RecoveryOutcome::Fresh,
            Err(e) => {
                warn!("Ignoring unreadable timer state: {}", e);
                return RecoveryOutcome::Fresh;
            }
        };

        if !record.tab_id.is_empty() && record.tab_id != self.tab_id.as_str() {
            warn!(
                "Record under {} belongs to tab {}, ignoring it",
                key, record.tab_id
            );
            return RecoveryOutcome::Fresh;
        }

        self.hours = record.hours;
        self.minutes = record.minutes;
        self.seconds = record.seconds;
        self.initial_seconds = record.initial_seconds;
        self.label = record.label.unwrap_or_default();
        self.finished_while_inactive = record.timer_finished_while_inactive;

        match (record.is_running, record.is_paused, record.start_time, record.paused_remaining) {
            (true, false, Some(start), _) => {
                let elapsed = Self::elapsed_secs(self.clock.now_ms(), start);
                if elapsed < record.initial_seconds {
                    self.remaining_seconds = record.initial_seconds - elapsed;
                    self.status = RunStatus::Running;
                    self.start_time = Some(start);
                    self.finished_while_inactive = false;
                    self.update_time_from_remaining();
                    info!(
                        "Recovered running countdown with {} left",
                        format_hms(self.remaining_seconds)
                    );
                    RecoveryOutcome::Resumed {
                        remaining_seconds: self.remaining_seconds,
                    }
                } else {
                    self.remaining_seconds = 0;
                    self.status = RunStatus::Stopped;
                    self.finished_while_inactive = true;
                    info!("Countdown finished while the tab was inactive");
                    RecoveryOutcome::ExpiredWhileInactive
                }
            }
            (_, true, _, Some(paused_remaining)) => {
                self.remaining_seconds = paused_remaining;
                self.status = RunStatus::Paused;
                self.paused_at = record.paused_at;
                self.paused_remaining = Some(paused_remaining);
                debug!("Recovered paused countdown with {} left", format_hms(paused_remaining));
                RecoveryOutcome::Paused {
                    remaining_seconds: paused_remaining,
                }
            }
            _ => {
                self.remaining_seconds = record.remaining_seconds;
                self.status = RunStatus::Stopped;
                debug!("Recovered stopped countdown");
                RecoveryOutcome::Stopped
            }
        }
    }

    /// Delete the tab's record and return to the zero state
    ///
    /// The in-memory state is reset even when the delete fails.
    pub fn clear_state(&mut self) -> Result<(), StoreError> {
        let removed = self.store.remove(&self.storage_key());

        self.halt();
        self.hours = 0;
        self.minutes = 0;
        self.seconds = 0;
        self.remaining_seconds = 0;
        self.initial_seconds = 0;
        self.label.clear();

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{storage::MemoryStore, utils::ManualClock};

    const T0: i64 = 1_700_000_000_000;

    fn timer_with(store: &Arc<MemoryStore>, clock: &ManualClock) -> CountdownTimer {
        CountdownTimer::new(
            TabId::new("tab-test"),
            Arc::clone(store) as Arc<dyn KeyValueStore>,
            Arc::new(clock.clone()),
        )
    }

    fn fixture() -> (Arc<MemoryStore>, ManualClock, CountdownTimer) {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(T0);
        let timer = timer_with(&store, &clock);
        (store, clock, timer)
    }

    fn stored(store: &MemoryStore) -> TimerRecord {
        let raw = store.get("timer-state-tab-test").unwrap().expect("record");
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_start_with_zero_duration_is_noop() {
        let (store, _clock, mut timer) = fixture();
        assert!(!timer.start());
        assert_eq!(timer.status(), RunStatus::Stopped);
        assert!(store.get("timer-state-tab-test").unwrap().is_none());
    }

    #[test]
    fn test_start_commits_duration_and_anchor() {
        let (store, _clock, mut timer) = fixture();
        timer.set_configured_time(0, 1, 30);
        assert!(timer.start());

        assert!(timer.is_running());
        assert_eq!(timer.initial_seconds(), 90);
        assert_eq!(timer.remaining_seconds(), 90);
        assert_eq!(timer.start_time(), Some(T0));

        let record = stored(&store);
        assert!(record.is_running);
        assert_eq!(record.start_time, Some(T0));
        assert_eq!(record.tab_id, "tab-test");
    }

    #[test]
    fn test_countdown_finishes_exactly_once() {
        for duration in [1u64, 7, 59, 3600] {
            let (store, clock, mut timer) = fixture();
            timer.set_configured_time(0, 0, duration);
            timer.start();

            clock.advance_secs(duration as i64 - 1);
            assert!(!timer.tick());
            assert_eq!(timer.remaining_seconds(), 1);

            clock.advance_secs(1);
            assert!(timer.tick());
            assert_eq!(timer.status(), RunStatus::Stopped);
            assert!(timer.finished_while_inactive());
            assert_eq!(timer.remaining_seconds(), 0);
            assert!(stored(&store).timer_finished_while_inactive);

            let after = timer.to_record();
            clock.advance_secs(30);
            assert!(!timer.tick());
            assert!(!timer.tick());
            assert_eq!(timer.to_record(), after);
        }
    }

    #[test]
    fn test_missed_ticks_do_not_drift() {
        let (_store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 10, 0);
        timer.start();

        clock.advance_secs(123);
        assert!(!timer.tick());
        assert_eq!(timer.remaining_seconds(), 600 - 123);
        assert_eq!(timer.configured_time(), (0, 7, 57));
    }

    #[test]
    fn test_tick_saves_on_throttled_cadence() {
        let (store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 1, 0);
        timer.start();

        clock.advance_secs(3);
        timer.tick();
        assert_eq!(stored(&store).remaining_seconds, 60);

        clock.advance_secs(2);
        timer.tick();
        assert_eq!(stored(&store).remaining_seconds, 55);
    }

    #[test]
    fn test_pause_resume_preserves_remaining() {
        let (_store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 100);
        timer.start();

        clock.advance_ms(30_400);
        assert!(timer.pause());
        assert_eq!(timer.paused_remaining(), Some(70));
        assert_eq!(timer.start_time(), None);

        // However long the pause lasts
        clock.advance_secs(86_400);
        assert_eq!(timer.current_remaining(), 70);
        assert!(timer.resume());
        assert_eq!(timer.remaining_seconds(), 70);
        assert_eq!(timer.current_remaining(), 70);
        assert_eq!(timer.paused_remaining(), None);

        clock.advance_secs(20);
        timer.tick();
        assert_eq!(timer.remaining_seconds(), 50);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let (store, _clock, mut timer) = fixture();
        assert!(!timer.pause());
        assert!(!timer.resume());
        assert!(!timer.tick());
        assert!(store.get("timer-state-tab-test").unwrap().is_none());

        timer.set_configured_time(0, 0, 10);
        timer.start();
        assert!(!timer.resume());
        assert!(timer.pause());
        assert!(!timer.pause());
    }

    #[test]
    fn test_stop_and_reset() {
        let (store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 2, 0);
        timer.set_label("Tea");
        timer.start();
        clock.advance_secs(10);

        timer.stop();
        assert_eq!(timer.status(), RunStatus::Stopped);
        assert_eq!(timer.remaining_seconds(), 110);
        assert_eq!(timer.start_time(), None);
        assert!(!stored(&store).is_running);

        timer.reset();
        assert_eq!(timer.configured_time(), (0, 0, 0));
        assert_eq!(timer.initial_seconds(), 0);
        assert_eq!(timer.label(), None);
        assert_eq!(stored(&store).label, None);
    }

    #[test]
    fn test_add_time_while_running_keeps_anchor() {
        let (_store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 1, 0);
        timer.start();
        clock.advance_secs(15);

        timer.add_time(30);
        assert_eq!(timer.start_time(), Some(T0));
        assert_eq!(timer.initial_seconds(), 90);
        assert_eq!(timer.remaining_seconds(), 75);
        assert_eq!(timer.initial_seconds() - timer.remaining_seconds(), 15);

        clock.advance_secs(5);
        timer.tick();
        assert_eq!(timer.remaining_seconds(), 70);
    }

    #[test]
    fn test_add_negative_time_while_running_floors_at_zero() {
        let (_store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 40);
        timer.start();
        clock.advance_secs(10);

        timer.add_time(-1_000);
        assert_eq!(timer.remaining_seconds(), 0);
        assert_eq!(timer.initial_seconds() - timer.remaining_seconds(), 10);
        assert_eq!(timer.start_time(), Some(T0));

        assert!(timer.tick());
        assert!(timer.finished_while_inactive());
    }

    #[test]
    fn test_add_time_extremes_while_running_saturate() {
        let (_store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 10);
        timer.start();
        clock.advance_secs(4);

        timer.add_time(i64::MAX);
        assert_eq!(timer.status(), RunStatus::Running);
        assert_eq!(timer.initial_seconds() - timer.remaining_seconds(), 4);
        assert!(!timer.tick());

        timer.add_time(i64::MAX);
        assert_eq!(timer.initial_seconds(), u64::MAX);
        assert_eq!(timer.remaining_seconds(), u64::MAX - 4);
        assert!(!timer.tick());
    }

    #[test]
    fn test_add_min_time_while_running_finishes_on_next_tick() {
        let (_store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 10);
        timer.start();
        clock.advance_secs(4);

        timer.add_time(i64::MIN);
        assert_eq!(timer.remaining_seconds(), 0);
        assert_eq!(timer.initial_seconds(), 4);
        assert!(timer.tick());
    }

    #[test]
    fn test_add_time_extremes_while_stopped_saturate() {
        let (_store, _clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 30);

        timer.add_time(i64::MIN);
        assert_eq!(timer.configured_total(), 0);

        timer.add_time(i64::MAX);
        assert_eq!(timer.configured_total(), i64::MAX as u64);
    }

    #[test]
    fn test_add_time_while_stopped_adjusts_configuration() {
        let (_store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 1);
        timer.start();
        clock.advance_secs(1);
        assert!(timer.tick());

        timer.add_time(3_725);
        assert_eq!(timer.configured_time(), (1, 2, 5));
        assert!(!timer.finished_while_inactive());

        timer.add_time(-10_000);
        assert_eq!(timer.configured_time(), (0, 0, 0));
    }

    #[test]
    fn test_set_configured_time_clears_flag_only_when_idle() {
        let (_store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 2);
        timer.start();
        clock.advance_secs(2);
        timer.tick();
        assert!(timer.finished_while_inactive());

        timer.set_configured_time(0, 5, 0);
        assert!(!timer.finished_while_inactive());
        assert_eq!(timer.configured_total(), 300);
    }

    #[test]
    fn test_clear_finished_indicator_keeps_run_state() {
        let (store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 3);
        timer.start();
        clock.advance_secs(3);
        timer.tick();

        timer.clear_finished_indicator();
        assert!(!timer.finished_while_inactive());
        assert_eq!(timer.status(), RunStatus::Stopped);
        assert!(!stored(&store).timer_finished_while_inactive);
    }

    #[test]
    fn test_reload_while_running_recomputes_remaining() {
        let (store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 5, 0);
        timer.start();

        clock.advance_secs(120);
        let (reloaded, outcome) = CountdownTimer::open(
            TabId::new("tab-test"),
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            Arc::new(clock.clone()),
        );
        assert_eq!(outcome, RecoveryOutcome::Resumed { remaining_seconds: 180 });
        assert!(reloaded.is_running());
        assert_eq!(reloaded.start_time(), Some(T0));
        assert_eq!(reloaded.configured_time(), (0, 3, 0));
    }

    #[test]
    fn test_reload_after_expiry_sets_flag_and_persists() {
        let (store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 30);
        timer.start();

        clock.advance_secs(30);
        let mut reloaded = timer_with(&store, &clock);
        assert_eq!(reloaded.load_state(), RecoveryOutcome::ExpiredWhileInactive);
        assert_eq!(reloaded.status(), RunStatus::Stopped);
        assert!(reloaded.finished_while_inactive());
        assert_eq!(reloaded.remaining_seconds(), 0);

        let record = stored(&store);
        assert!(!record.is_running);
        assert!(record.timer_finished_while_inactive);
        assert_eq!(record.start_time, None);

        // Recovery is the only finish signal
        assert!(!reloaded.tick());
    }

    #[test]
    fn test_reload_paused_restores_snapshot() {
        let (store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 50);
        timer.start();
        clock.advance_secs(20);
        timer.pause();

        clock.advance_secs(10_000);
        let mut reloaded = timer_with(&store, &clock);
        assert_eq!(
            reloaded.load_state(),
            RecoveryOutcome::Paused { remaining_seconds: 30 }
        );
        assert!(reloaded.is_paused());
        assert!(reloaded.resume());
        assert_eq!(reloaded.current_remaining(), 30);
    }

    #[test]
    fn test_reload_stopped_restores_remaining_verbatim() {
        let (store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 50);
        timer.start();
        clock.advance_secs(20);
        timer.stop();

        let mut reloaded = timer_with(&store, &clock);
        assert_eq!(reloaded.load_state(), RecoveryOutcome::Stopped);
        assert_eq!(reloaded.remaining_seconds(), 30);
    }

    #[test]
    fn test_reload_malformed_record_is_fresh() {
        let store = Arc::new(MemoryStore::new());
        store.set("timer-state-tab-test", "{\"isRunning\": tru").unwrap();
        let clock = ManualClock::new(T0);

        let mut timer = timer_with(&store, &clock);
        assert_eq!(timer.load_state(), RecoveryOutcome::Fresh);
        assert_eq!(timer.status(), RunStatus::Stopped);
        assert_eq!(timer.configured_total(), 0);
    }

    #[test]
    fn test_load_does_not_write_unless_expired() {
        let store = Arc::new(MemoryStore::new());
        let record = TimerRecord {
            tab_id: "tab-test".to_string(),
            is_running: true,
            initial_seconds: 100,
            remaining_seconds: 100,
            start_time: Some(T0),
            ..Default::default()
        };
        let raw = serde_json::to_string(&record).unwrap();
        store.set("timer-state-tab-test", &raw).unwrap();

        let clock = ManualClock::new(T0 + 40_000);
        let mut timer = timer_with(&store, &clock);
        assert!(timer.load_state().should_resume());
        assert_eq!(store.get("timer-state-tab-test").unwrap().as_deref(), Some(raw.as_str()));
    }

    #[test]
    fn test_clear_state_removes_record() {
        let (store, _clock, mut timer) = fixture();
        timer.set_configured_time(1, 0, 0);
        timer.start();

        timer.clear_state().unwrap();
        assert!(store.get("timer-state-tab-test").unwrap().is_none());
        assert_eq!(timer.status(), RunStatus::Stopped);
        assert_eq!(timer.configured_total(), 0);
    }

    #[test]
    fn test_stopped_snapshot_displays_configured_duration() {
        let (_store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 1, 30);

        let snapshot = timer.snapshot();
        assert_eq!((snapshot.hours, snapshot.minutes, snapshot.seconds), (0, 1, 30));
        assert_eq!(snapshot.display, "00:01:30");

        timer.start();
        clock.advance_secs(90);
        assert!(timer.tick());
        let snapshot = timer.snapshot();
        assert_eq!((snapshot.hours, snapshot.minutes, snapshot.seconds), (0, 0, 0));
        assert_eq!(snapshot.display, "00:00:00");
    }

    #[test]
    fn test_snapshot_reflects_live_remaining() {
        let (_store, clock, mut timer) = fixture();
        timer.set_configured_time(0, 0, 80);
        timer.set_label("  Pasta  ");
        timer.start();
        clock.advance_secs(20);

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.remaining_seconds, 60);
        assert_eq!(snapshot.display, "00:01:00");
        assert_eq!(snapshot.label.as_deref(), Some("Pasta"));
        assert!((snapshot.progress - 0.25).abs() < f64::EPSILON);
    }
}
