use axum::extract::State;
use axum::{routing::get, Json, Router};
use banner_core::types::Timestamp;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Sessions currently held in memory, finished or not.
    pub active_sessions: usize,
    /// Sessions whose worker has not finished yet.
    pub running_jobs: usize,
    pub timestamp: Timestamp,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.store.len(),
        running_jobs: state.store.running_count(),
        timestamp: Utc::now(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
