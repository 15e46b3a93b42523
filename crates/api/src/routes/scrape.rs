//! Route definitions for scrape sessions.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::scrape;
use crate::state::AppState;

/// Routes mounted at `/scrape`.
///
/// ```text
/// POST   /                  -> submit_scrape
/// GET    /{session_id}      -> get_scrape
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(scrape::submit_scrape))
        .route("/{session_id}", get(scrape::get_scrape))
}
