use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/live", get(live))
        .route("/info", get(info))
}

#[derive(Serialize)]
struct RootResponse {
    status: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: &'static str,
    start_time: String,
    uptime: u64,
    llm_enabled: bool,
    word_lists_dir: String,
}

pub async fn root() -> Response {
    Json(RootResponse { status: "running" }).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let started: DateTime<Utc> = state.started_at_system().into();
    Json(HealthInfoResponse {
        service: "vocab-trainer",
        version: env!("CARGO_PKG_VERSION"),
        start_time: started.to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.uptime_seconds(),
        llm_enabled: state.llm().is_some(),
        word_lists_dir: state.store().dir().display().to_string(),
    })
    .into_response()
}
