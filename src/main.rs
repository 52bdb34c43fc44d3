//! Tab Timer - A countdown timer that survives restarts
//!
//! This is the main entry point for the tab-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use tab_timer::{
    api::create_router,
    config::Config,
    services::{
        HistoryStore, SettingsStore, SilentPlayer, SoundController, TerminalBell, TonePlayer,
        VisibilityFlag,
    },
    state::{AppState, CountdownTimer, RecoveryOutcome, TabId, TimerServices, TAB_ID_KEY},
    storage::{FileStore, KeyValueStore},
    tasks::countdown_ticker_task,
    utils::{format_hms, shutdown_signal, Clock, SystemClock, TokioScheduler},
};

/// Pick the tab identity from the command line or the session store
fn resolve_tab_id(config: &Config, session: &dyn KeyValueStore, clock: &dyn Clock) -> TabId {
    if let Some(id) = config.tab_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        let tab_id = TabId::new(id);
        if let Err(e) = session.set(TAB_ID_KEY, tab_id.as_str()) {
            warn!("Failed to remember tab identity {}: {}", tab_id, e);
        }
        return tab_id;
    }

    if config.new_tab {
        if let Err(e) = session.remove(TAB_ID_KEY) {
            warn!("Failed to forget previous tab identity: {}", e);
        }
    }

    TabId::resolve(session, clock.now_ms())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("tab_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting tab-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, data_dir={}, tick={}ms",
          config.host, config.port, config.data_dir().display(), config.tick_ms);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.data_dir()));
    let session = FileStore::new(config.session_dir());

    let tab_id = resolve_tab_id(&config, &session, clock.as_ref());
    info!("Tab identity: {}", tab_id);

    let settings = Arc::new(SettingsStore::load(Arc::clone(&store), Arc::clone(&clock)));
    let history = Arc::new(HistoryStore::load(Arc::clone(&store), Arc::clone(&clock)));
    let visibility = Arc::new(VisibilityFlag::new());

    let player: Arc<dyn TonePlayer> = if config.silent_bell {
        Arc::new(SilentPlayer)
    } else {
        Arc::new(TerminalBell)
    };
    let sound = SoundController::new(
        player,
        settings.clone(),
        visibility.clone(),
        Arc::new(TokioScheduler::current()),
    );

    let (timer, outcome) = CountdownTimer::open(tab_id, Arc::clone(&store), Arc::clone(&clock));
    match outcome {
        RecoveryOutcome::Fresh => info!("No stored countdown for this tab"),
        RecoveryOutcome::Resumed { remaining_seconds } => {
            info!("Resuming countdown with {} left", format_hms(remaining_seconds));
        }
        RecoveryOutcome::ExpiredWhileInactive => {
            info!("Countdown ran out while the tab was closed");
        }
        RecoveryOutcome::Paused { remaining_seconds } => {
            info!("Restored paused countdown with {} left", format_hms(remaining_seconds));
        }
        RecoveryOutcome::Stopped => info!("Restored stopped countdown"),
    }

    // Create application state
    let state = Arc::new(AppState::new(
        timer,
        TimerServices { settings, history, sound, visibility },
        config.port,
        config.host.clone(),
        config.tick_interval(),
    ));

    // Subscribe before announcing so a recovered countdown is not missed
    let state_rx = state.state_change_tx.subscribe();
    let ticker_state = Arc::clone(&state);
    tokio::spawn(async move {
        countdown_ticker_task(ticker_state, state_rx).await;
    });

    if outcome.should_resume() {
        if let Err(e) = state.trigger_state_check() {
            error!("Failed to hand the recovered countdown to the ticker: {}", e);
        }
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /timer/start|pause|resume|stop|reset|acknowledge");
    info!("  PUT    /timer/time, /timer/label   POST /timer/add   DELETE /timer");
    info!("  GET    /settings, /history         PUT  /settings    DELETE /history");
    info!("  PUT    /visibility                 POST /sound/cancel");
    info!("  GET    /status, /health");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.sound.cancel_repeat();
    match state.timer.lock() {
        Ok(timer) => {
            if let Err(e) = timer.save_state() {
                warn!("Failed to save countdown on shutdown: {}", e);
            }
        }
        Err(e) => warn!("Failed to lock timer on shutdown: {}", e),
    }

    info!("Server shutdown complete");
    Ok(())
}
