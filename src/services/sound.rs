//! Notification sound controller
//!
//! Plays a three-tone sequence when a countdown finishes and, when the user
//! asked for repeating bells, replays it until cancelled. All timing goes
//! through a [`Scheduler`] so the controller runs the same way under tokio and
//! under simulated time.

use std::{
    io::{IsTerminal, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError, Weak,
    },
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::utils::{Scheduler, TaskHandle};

/// Delay before the first replay when repeating bells are on
pub const REPEAT_INITIAL_DELAY: Duration = Duration::from_secs(3);
/// Time between replays after the first one
pub const REPEAT_INTERVAL: Duration = Duration::from_secs(3);

/// One beep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u64,
}

/// The notification: tones paired with their offset from the sequence start
pub const NOTIFICATION_SEQUENCE: [(Duration, Tone); 3] = [
    (
        Duration::from_millis(0),
        Tone { frequency_hz: 600, duration_ms: 300 },
    ),
    (
        Duration::from_millis(300),
        Tone { frequency_hz: 800, duration_ms: 300 },
    ),
    (
        Duration::from_millis(600),
        Tone { frequency_hz: 1000, duration_ms: 400 },
    ),
];

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    #[error("failed to play tone: {0}")]
    Playback(#[from] std::io::Error),
}

/// Something that can emit a tone
pub trait TonePlayer: Send + Sync {
    fn play(&self, tone: Tone) -> Result<(), AudioError>;
}

/// Rings the terminal bell for every tone
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl TonePlayer for TerminalBell {
    fn play(&self, tone: Tone) -> Result<(), AudioError> {
        let mut stdout = std::io::stdout();
        if !stdout.is_terminal() {
            return Err(AudioError::Unavailable("stdout is not a terminal".to_string()));
        }
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        debug!("Bell for {}Hz/{}ms tone", tone.frequency_hz, tone.duration_ms);
        Ok(())
    }
}

/// Accepts tones and discards them
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayer;

impl TonePlayer for SilentPlayer {
    fn play(&self, _tone: Tone) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Sound-related preferences the controller reads before every tone
pub trait SoundPreferences: Send + Sync {
    fn sound_enabled(&self) -> bool;
    fn silent_when_hidden(&self) -> bool;
    fn repeat_bells(&self) -> bool;
}

/// Whether the tab is currently hidden from the user
pub trait TabVisibility: Send + Sync {
    fn is_hidden(&self) -> bool;
}

/// Visibility reported by the UI layer
#[derive(Debug, Default)]
pub struct VisibilityFlag {
    hidden: AtomicBool,
}

impl VisibilityFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::SeqCst);
    }
}

impl TabVisibility for VisibilityFlag {
    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Pending {
    /// Bumped by every cancel; callbacks from an older generation do nothing
    generation: u64,
    /// Later tones of the sequence currently playing
    tones: Vec<TaskHandle>,
    initial_delay: Option<TaskHandle>,
    interval: Option<TaskHandle>,
}

struct Inner {
    player: Arc<dyn TonePlayer>,
    preferences: Arc<dyn SoundPreferences>,
    visibility: Arc<dyn TabVisibility>,
    scheduler: Arc<dyn Scheduler>,
    pending: Mutex<Pending>,
}

fn cancel_all(handles: impl IntoIterator<Item = TaskHandle>) {
    for mut handle in handles {
        handle.cancel();
    }
}

impl Inner {
    fn pending(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.pending().generation == generation
    }

    /// Emit one tone if the preferences and visibility allow it right now
    fn play_gated(&self, tone: Tone) {
        if !self.preferences.sound_enabled() {
            debug!("Sound disabled, skipping {}Hz tone", tone.frequency_hz);
            return;
        }
        if self.preferences.silent_when_hidden() && self.visibility.is_hidden() {
            debug!("Tab hidden, skipping {}Hz tone", tone.frequency_hz);
            return;
        }
        if let Err(e) = self.player.play(tone) {
            warn!("Notification tone skipped: {}", e);
        }
    }

    fn play_sequence(this: &Arc<Self>, generation: u64) {
        let mut handles = Vec::with_capacity(NOTIFICATION_SEQUENCE.len());
        for (offset, tone) in NOTIFICATION_SEQUENCE {
            if offset.is_zero() {
                if this.is_current(generation) {
                    this.play_gated(tone);
                }
                continue;
            }
            let weak = Arc::downgrade(this);
            handles.push(this.scheduler.schedule_once(
                offset,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        if inner.is_current(generation) {
                            inner.play_gated(tone);
                        }
                    }
                }),
            ));
        }

        let mut pending = this.pending();
        if pending.generation != generation {
            drop(pending);
            cancel_all(handles);
            return;
        }
        // Tones of the previous sequence have all played by now
        pending.tones = handles;
    }

    fn replay(weak: &Weak<Self>, generation: u64) {
        let Some(inner) = weak.upgrade() else { return };
        if !inner.is_current(generation) {
            return;
        }
        if !inner.preferences.repeat_bells() {
            info!("Repeating bells turned off, stopping replays");
            inner.cancel_repeat();
            return;
        }
        Self::play_sequence(&inner, generation);
    }

    fn schedule_repeat(this: &Arc<Self>, generation: u64) {
        let weak = Arc::downgrade(this);
        let initial = this.scheduler.schedule_once(
            REPEAT_INITIAL_DELAY,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else { return };
                {
                    let mut pending = inner.pending();
                    if pending.generation != generation {
                        return;
                    }
                    pending.initial_delay = None;
                }
                Self::replay(&weak, generation);

                if !inner.preferences.repeat_bells() {
                    return;
                }
                let interval_weak = weak.clone();
                let interval = inner.scheduler.schedule_repeating(
                    REPEAT_INTERVAL,
                    Box::new(move || Self::replay(&interval_weak, generation)),
                );
                let mut pending = inner.pending();
                if pending.generation != generation {
                    drop(pending);
                    cancel_all([interval]);
                    return;
                }
                pending.interval = Some(interval);
            }),
        );

        let mut pending = this.pending();
        if pending.generation != generation {
            drop(pending);
            cancel_all([initial]);
            return;
        }
        pending.initial_delay = Some(initial);
    }

    /// Invalidate every scheduled tone and replay; returns the new generation
    fn cancel_repeat(&self) -> u64 {
        let (generation, handles) = {
            let mut pending = self.pending();
            pending.generation = pending.generation.wrapping_add(1);
            let mut handles: Vec<TaskHandle> = pending.tones.drain(..).collect();
            handles.extend(pending.initial_delay.take());
            handles.extend(pending.interval.take());
            (pending.generation, handles)
        };
        // Cancel outside the lock, a scheduler may run jobs synchronously
        cancel_all(handles);
        generation
    }
}

/// Plays the finished notification and manages its repetition
#[derive(Clone)]
pub struct SoundController {
    inner: Arc<Inner>,
}

impl SoundController {
    pub fn new(
        player: Arc<dyn TonePlayer>,
        preferences: Arc<dyn SoundPreferences>,
        visibility: Arc<dyn TabVisibility>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                player,
                preferences,
                visibility,
                scheduler,
                pending: Mutex::new(Pending::default()),
            }),
        }
    }

    /// Play the notification once, then keep replaying it if repeating bells are on
    pub fn notify_finished(&self) {
        let generation = self.inner.cancel_repeat();
        Inner::play_sequence(&self.inner, generation);

        if self.inner.preferences.repeat_bells() {
            debug!("Scheduling repeating bells");
            Inner::schedule_repeat(&self.inner, generation);
        }
    }

    /// Cancel every scheduled tone and replay; safe to call at any time
    pub fn cancel_repeat(&self) {
        self.inner.cancel_repeat();
    }

    /// Whether a replay is still scheduled
    pub fn is_repeating(&self) -> bool {
        let pending = self.inner.pending();
        pending.initial_delay.is_some() || pending.interval.is_some()
    }
}
