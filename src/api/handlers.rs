//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    services::{HistoryEntry, ImportError, PresetUpdate, Settings, TabVisibility, TimerPreset},
    state::{AppState, TimerState},
};
use super::responses::{
    AddTimeRequest, ApiResponse, HealthResponse, LabelRequest, SetTimeRequest, StatusResponse,
    VisibilityRequest,
};

type ApiResult = Result<Json<ApiResponse>, StatusCode>;

fn internal_error(context: &str, e: String) -> StatusCode {
    error!("Failed to {}: {}", context, e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Map a transition result to an applied or ignored response
fn transition_response(
    result: Result<(bool, TimerState), String>,
    context: &str,
    applied: &str,
    ignored: &str,
) -> ApiResult {
    match result {
        Ok((true, timer)) => {
            info!("{}", applied);
            Ok(Json(ApiResponse::applied(applied.to_string(), timer)))
        }
        Ok((false, timer)) => Ok(Json(ApiResponse::ignored(ignored.to_string(), timer))),
        Err(e) => Err(internal_error(context, e)),
    }
}

/// Handle POST /timer/start - Start the configured countdown
pub async fn start_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    transition_response(
        state.start(),
        "start countdown",
        "Countdown started",
        "Nothing to start, the configured duration is zero",
    )
}

/// Handle POST /timer/pause - Pause a running countdown
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    transition_response(
        state.pause(),
        "pause countdown",
        "Countdown paused",
        "Countdown is not running",
    )
}

/// Handle POST /timer/resume - Resume a paused countdown
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    transition_response(
        state.resume(),
        "resume countdown",
        "Countdown resumed",
        "Countdown is not paused",
    )
}

/// Handle POST /timer/stop - Stop the countdown
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    match state.stop() {
        Ok(timer) => Ok(Json(ApiResponse::applied("Countdown stopped".to_string(), timer))),
        Err(e) => Err(internal_error("stop countdown", e)),
    }
}

/// Handle POST /timer/reset - Stop and zero the countdown
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    match state.reset() {
        Ok(timer) => Ok(Json(ApiResponse::applied("Countdown reset".to_string(), timer))),
        Err(e) => Err(internal_error("reset countdown", e)),
    }
}

/// Handle POST /timer/acknowledge - Dismiss the finished indicator
pub async fn acknowledge_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    match state.acknowledge() {
        Ok(timer) => Ok(Json(ApiResponse::applied(
            "Finished indicator cleared".to_string(),
            timer,
        ))),
        Err(e) => Err(internal_error("acknowledge countdown", e)),
    }
}

/// Handle PUT /timer/time - Set the configured duration
pub async fn set_time_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetTimeRequest>,
) -> ApiResult {
    match state.set_time(body.hours, body.minutes, body.seconds) {
        Ok(timer) => Ok(Json(ApiResponse::applied("Duration set".to_string(), timer))),
        Err(e) => Err(internal_error("set duration", e)),
    }
}

/// Handle POST /timer/add - Add or remove time
pub async fn add_time_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddTimeRequest>,
) -> ApiResult {
    match state.add_time(body.seconds) {
        Ok(timer) => Ok(Json(ApiResponse::applied(
            format!("Adjusted by {}s", body.seconds),
            timer,
        ))),
        Err(e) => Err(internal_error("add time", e)),
    }
}

/// Handle PUT /timer/label - Set the countdown label
pub async fn label_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LabelRequest>,
) -> ApiResult {
    match state.set_label(&body.label) {
        Ok(timer) => Ok(Json(ApiResponse::applied("Label set".to_string(), timer))),
        Err(e) => Err(internal_error("set label", e)),
    }
}

/// Handle DELETE /timer - Forget the persisted countdown
pub async fn clear_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    match state.clear() {
        Ok((Ok(()), timer)) => Ok(Json(ApiResponse::applied(
            "Countdown cleared".to_string(),
            timer,
        ))),
        Ok((Err(e), timer)) => {
            warn!("Countdown reset but stored state could not be deleted: {}", e);
            Ok(Json(ApiResponse::error(
                format!("Stored state could not be deleted: {}", e),
                timer,
            )))
        }
        Err(e) => Err(internal_error("clear countdown", e)),
    }
}

/// Handle GET /status - Return the countdown and server status
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let timer = state
        .get_timer_state()
        .map_err(|e| internal_error("get timer state", e))?;

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer,
        sound_repeating: state.sound.is_repeating(),
        tab_hidden: state.visibility.is_hidden(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Handle GET /settings
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.settings.settings())
}

/// Handle PUT /settings - Merge the given fields into the settings
pub async fn put_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Settings>, StatusCode> {
    match state.settings.import_settings(&body.to_string()) {
        Ok(settings) => Ok(Json(settings)),
        Err(ImportError::Store(e)) => Err(internal_error("save settings", e.to_string())),
        Err(e) => {
            warn!("Rejected settings update: {}", e);
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

/// Handle POST /settings/presets
pub async fn add_preset_handler(
    State(state): State<Arc<AppState>>,
    Json(preset): Json<TimerPreset>,
) -> (StatusCode, Json<TimerPreset>) {
    (StatusCode::CREATED, Json(state.settings.add_custom_preset(preset)))
}

/// Handle PATCH /settings/presets/:id
pub async fn update_preset_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<PresetUpdate>,
) -> Result<Json<TimerPreset>, StatusCode> {
    state
        .settings
        .update_custom_preset(&id, update)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Handle DELETE /settings/presets/:id
pub async fn remove_preset_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.settings.remove_custom_preset(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Handle GET /history
pub async fn get_history_handler(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryEntry>> {
    Json(state.history.entries())
}

/// Handle DELETE /history
pub async fn clear_history_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.history.clear();
    StatusCode::NO_CONTENT
}

/// Handle PUT /visibility - The UI reports whether the tab is hidden
pub async fn visibility_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VisibilityRequest>,
) -> StatusCode {
    state.visibility.set_hidden(body.hidden);
    StatusCode::NO_CONTENT
}

/// Handle POST /sound/cancel - Stop repeating bells
pub async fn cancel_sound_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.sound.cancel_repeat();
    StatusCode::NO_CONTENT
}
