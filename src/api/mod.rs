//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer", axum::routing::delete(clear_handler))
        .route("/timer/start", post(start_handler))
        .route("/timer/pause", post(pause_handler))
        .route("/timer/resume", post(resume_handler))
        .route("/timer/stop", post(stop_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/timer/acknowledge", post(acknowledge_handler))
        .route("/timer/time", put(set_time_handler))
        .route("/timer/add", post(add_time_handler))
        .route("/timer/label", put(label_handler))
        .route("/settings", get(get_settings_handler).put(put_settings_handler))
        .route("/settings/presets", post(add_preset_handler))
        .route(
            "/settings/presets/:id",
            patch(update_preset_handler).delete(remove_preset_handler),
        )
        .route("/history", get(get_history_handler).delete(clear_history_handler))
        .route("/visibility", put(visibility_handler))
        .route("/sound/cancel", post(cancel_sound_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
