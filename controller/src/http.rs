use std::path::PathBuf;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use room_sync_common::Switch;

use crate::{
    gateway::{command_led, command_manual_mode, command_relay, current_metrics, current_state},
    reconcile::dispatch_replay,
    state::AppState,
};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn router(state: AppState, web_root: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/relay/on", get(handle_relay_on))
        .route("/relay/off", get(handle_relay_off))
        .route("/led/on", get(handle_led_on))
        .route("/led/off", get(handle_led_off))
        .route("/manual/on", get(handle_manual_on))
        .route("/manual/off", get(handle_manual_off))
        .route("/state", get(handle_get_state))
        .route("/metrics", get(handle_get_metrics))
        .route("/sync", get(handle_sync));

    if let Some(web_root) = web_root {
        app = app.fallback_service(ServeDir::new(web_root));
    }

    app.layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

async fn handle_relay_on(State(state): State<AppState>) -> Response {
    command_outcome(
        command_relay(&state, Switch::On).await,
        "Relay ON command sent\n",
    )
}

async fn handle_relay_off(State(state): State<AppState>) -> Response {
    command_outcome(
        command_relay(&state, Switch::Off).await,
        "Relay OFF command sent\n",
    )
}

async fn handle_led_on(State(state): State<AppState>) -> Response {
    command_outcome(command_led(&state, Switch::On).await, "LED ON command sent\n")
}

async fn handle_led_off(State(state): State<AppState>) -> Response {
    command_outcome(
        command_led(&state, Switch::Off).await,
        "LED OFF command sent\n",
    )
}

async fn handle_manual_on(State(state): State<AppState>) -> Response {
    command_outcome(
        command_manual_mode(&state, Switch::On).await,
        "Manual mode enabled\n",
    )
}

async fn handle_manual_off(State(state): State<AppState>) -> Response {
    command_outcome(
        command_manual_mode(&state, Switch::Off).await,
        "Manual mode disabled\n",
    )
}

async fn handle_get_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(current_state(&state).await)
}

async fn handle_get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(current_metrics(&state).await)
}

async fn handle_sync(State(state): State<AppState>) -> impl IntoResponse {
    dispatch_replay(&state);
    (StatusCode::ACCEPTED, "Sync requested\n")
}

fn command_outcome(result: anyhow::Result<()>, message: &'static str) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, message).into_response(),
        Err(_) => error_response(StatusCode::BAD_GATEWAY, "Failed to publish command"),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
