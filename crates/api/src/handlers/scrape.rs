//! Handlers for scrape submission and session status.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use banner_core::error::CoreError;
use banner_core::request::SubmitScrape;
use banner_core::session::{ProgressEntry, Session, SessionStatus};
use banner_core::types::{SessionId, Timestamp};
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Acknowledgement message returned on submission.
pub const MSG_STARTED: &str = "Scraping started";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Body of a successful submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// Always `true`; failures use the error body instead.
    pub success: bool,
    pub session_id: SessionId,
    pub message: &'static str,
}

/// Externally visible snapshot of a session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: SessionId,
    pub url: String,
    pub location_region: &'static str,
    pub headless: bool,
    pub status: SessionStatus,
    pub progress: Vec<ProgressEntry>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub duration_ms: Option<i64>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        let duration_ms = session.duration_ms();
        Self {
            id: session.id,
            url: session.request.url,
            location_region: session.request.location.code,
            headless: session.request.headless,
            status: session.status,
            progress: session.progress,
            result: session.result,
            error: session.error,
            started_at: session.started_at,
            duration_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /scrape
///
/// Validate the request, start a worker and return the session id without
/// waiting for the scrape.
pub async fn submit_scrape(
    State(state): State<AppState>,
    body: Result<Json<SubmitScrape>, JsonRejection>,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    let Json(input) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let session_id = state.orchestrator.submit(&input)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            success: true,
            session_id,
            message: MSG_STARTED,
        }),
    ))
}

/// GET /scrape/{session_id}
///
/// Current snapshot of a session. Ids that are not UUIDs are simply unknown.
pub async fn get_scrape(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<SessionView>> {
    let session = session_id
        .parse::<SessionId>()
        .ok()
        .and_then(|id| state.store.get(&id))
        .ok_or_else(|| CoreError::NotFound {
            entity: "Session",
            id: session_id,
        })?;

    Ok(Json(SessionView::from(session)))
}
