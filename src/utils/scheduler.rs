//! Deferred and repeating callback scheduling
//!
//! The sound controller never touches the runtime directly; it asks a
//! [`Scheduler`] for timeouts and intervals and keeps the returned
//! [`TaskHandle`]s so it can cancel them. Production uses [`TokioScheduler`],
//! tests drive [`ManualScheduler`] with simulated time.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// A scheduled callback
pub type Job = Box<dyn FnMut() + Send + 'static>;

/// Schedules callbacks to run later
pub trait Scheduler: Send + Sync {
    /// Run `job` once after `delay`
    fn schedule_once(&self, delay: Duration, job: Job) -> TaskHandle;

    /// Run `job` every `interval`, first after one full interval
    fn schedule_repeating(&self, interval: Duration, job: Job) -> TaskHandle;
}

/// Cancel handle for a scheduled callback
///
/// Cancelling is idempotent. Dropping the handle does not cancel the task.
pub struct TaskHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TaskHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop the task; later calls do nothing
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Scheduler that spawns onto a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime of the calling context
    ///
    /// Must be called from inside a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, mut job: Job) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let task = self.runtime.spawn(async move {
            sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                job();
            }
        });

        TaskHandle::new(move || {
            cancelled.store(true, Ordering::SeqCst);
            task.abort();
        })
    }

    fn schedule_repeating(&self, interval: Duration, mut job: Job) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let task = self.runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                job();
            }
        });

        TaskHandle::new(move || {
            cancelled.store(true, Ordering::SeqCst);
            task.abort();
        })
    }
}

struct Entry {
    id: u64,
    due_ms: u64,
    interval_ms: Option<u64>,
    // None while the job is executing
    job: Option<Job>,
}

#[derive(Default)]
struct ManualState {
    now_ms: u64,
    next_id: u64,
    entries: Vec<Entry>,
}

/// Scheduler driven by explicit calls to [`ManualScheduler::advance`]
///
/// Jobs run on the caller's thread, in due-time order, while time is advanced.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated milliseconds elapsed since creation
    pub fn now_ms(&self) -> u64 {
        self.state.lock().map(|s| s.now_ms).unwrap_or_default()
    }

    /// Number of scheduled tasks that have not finished or been cancelled
    pub fn pending(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or_default()
    }

    /// Advance simulated time, running every job that comes due
    pub fn advance(&self, by: Duration) {
        let target_ms = self.now_ms() + by.as_millis() as u64;

        loop {
            let (id, mut job) = {
                let Ok(mut state) = self.state.lock() else { return };
                let next = state
                    .entries
                    .iter_mut()
                    .filter(|e| e.job.is_some() && e.due_ms <= target_ms)
                    .min_by_key(|e| (e.due_ms, e.id));

                let Some(entry) = next else {
                    state.now_ms = target_ms;
                    return;
                };
                let (id, due_ms) = (entry.id, entry.due_ms);
                let Some(job) = entry.job.take() else { return };
                state.now_ms = due_ms;
                (id, job)
            };

            // The lock is released so the job may schedule or cancel tasks
            job();

            let Ok(mut state) = self.state.lock() else { return };
            if let Some(pos) = state.entries.iter().position(|e| e.id == id) {
                match state.entries[pos].interval_ms {
                    Some(interval_ms) => {
                        let entry = &mut state.entries[pos];
                        entry.due_ms += interval_ms.max(1);
                        entry.job = Some(job);
                    }
                    None => {
                        state.entries.remove(pos);
                    }
                }
            }
        }
    }

    fn insert(&self, delay: Duration, interval: Option<Duration>, job: Job) -> TaskHandle {
        let id = match self.state.lock() {
            Ok(mut state) => {
                let id = state.next_id;
                state.next_id += 1;
                let due_ms = state.now_ms + delay.as_millis() as u64;
                state.entries.push(Entry {
                    id,
                    due_ms,
                    interval_ms: interval.map(|i| i.as_millis() as u64),
                    job: Some(job),
                });
                id
            }
            Err(_) => return TaskHandle::new(|| {}),
        };

        let state = Arc::clone(&self.state);
        TaskHandle::new(move || {
            if let Ok(mut state) = state.lock() {
                state.entries.retain(|e| e.id != id);
            }
        })
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, delay: Duration, job: Job) -> TaskHandle {
        self.insert(delay, None, job)
    }

    fn schedule_repeating(&self, interval: Duration, job: Job) -> TaskHandle {
        self.insert(interval, Some(interval), job)
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now_ms", &self.now_ms())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_job(counter: &Arc<AtomicUsize>) -> Job {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_manual_once_fires_at_due_time() {
        let scheduler = ManualScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let _handle = scheduler.schedule_once(Duration::from_millis(300), counter_job(&fired));

        scheduler.advance(Duration::from_millis(299));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);

        scheduler.advance(Duration::from_secs(10));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_repeating_until_cancelled() {
        let scheduler = ManualScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let mut handle =
            scheduler.schedule_repeating(Duration::from_secs(1), counter_job(&fired));

        scheduler.advance(Duration::from_millis(3500));
        assert_eq!(fired.load(Ordering::SeqCst), 3);

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        scheduler.advance(Duration::from_secs(10));
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_job_can_schedule_more_work() {
        let scheduler = ManualScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let inner_scheduler = scheduler.clone();
        let inner_fired = Arc::clone(&fired);
        let _handle = scheduler.schedule_once(
            Duration::from_millis(100),
            Box::new(move || {
                let _nested = inner_scheduler
                    .schedule_once(Duration::from_millis(100), counter_job(&inner_fired));
            }),
        );

        scheduler.advance(Duration::from_millis(250));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.now_ms(), 250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_once_cancelled_never_runs() {
        let scheduler = TokioScheduler::current();
        let fired = Arc::new(AtomicUsize::new(0));
        let mut handle = scheduler.schedule_once(Duration::from_millis(50), counter_job(&fired));
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_once_runs_after_delay() {
        let scheduler = TokioScheduler::current();
        let fired = Arc::new(AtomicUsize::new(0));
        let _handle = scheduler.schedule_once(Duration::from_millis(50), counter_job(&fired));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
