//! Countdown ticker background task

use std::{sync::Arc, time::Instant};
use tokio::{
    sync::broadcast::{error::RecvError, Receiver},
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::state::{AppState, TimerState};

/// A gap this many tick intervals long means the host was suspended
const STALL_FACTOR: u32 = 4;

/// Background task that polls the countdown while it is running
///
/// It sleeps until a run-state change says the countdown is running, then
/// ticks on the configured cadence until the countdown finishes or stops.
/// `state_rx` must be subscribed before anything is announced that the task
/// should react to.
pub async fn countdown_ticker_task(state: Arc<AppState>, mut state_rx: Receiver<TimerState>) {
    info!("Starting countdown ticker task");

    loop {
        match state_rx.recv().await {
            Ok(current) if current.is_running() => {
                debug!("Countdown running, arming ticker");
                run_until_idle(&state, &mut state_rx).await;
            }
            Ok(current) => {
                debug!("Ticker idle, countdown is {:?}", current.status);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Ticker missed {} state changes, rechecking", skipped);
                match state.get_timer_state() {
                    Ok(current) if current.is_running() => {
                        run_until_idle(&state, &mut state_rx).await;
                    }
                    Ok(_) => {}
                    Err(e) => error!("Failed to read timer state: {}", e),
                }
            }
            Err(RecvError::Closed) => {
                info!("State channel closed, stopping countdown ticker");
                break;
            }
        }
    }
}

/// Tick until the countdown finishes or leaves the running state
async fn run_until_idle(state: &Arc<AppState>, state_rx: &mut Receiver<TimerState>) {
    let mut ticker = interval(state.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let gap = last_tick.elapsed();
                last_tick = Instant::now();
                if gap > state.tick_interval * STALL_FACTOR {
                    info!("Ticker stalled for {:?}, catching up from the wall clock", gap);
                }

                match state.tick() {
                    Ok(Some(finished)) => {
                        let entry = state.handle_finished(&finished);
                        debug!("Recorded history entry {}", entry.id);
                        break;
                    }
                    Ok(None) => {}
                    Err(e) => error!("Failed to tick countdown: {}", e),
                }
            }

            changed = state_rx.recv() => {
                match changed {
                    Ok(current) if !current.is_running() => {
                        debug!("Countdown is {:?}, disarming ticker", current.status);
                        break;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Ticker missed {} state changes while running", skipped);
                        if !state.get_timer_state().map(|s| s.is_running()).unwrap_or(false) {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}
