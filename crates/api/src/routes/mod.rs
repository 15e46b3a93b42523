pub mod health;
pub mod locations;
pub mod scrape;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /health                      service health
///
/// /scrape                      submit (POST)
/// /scrape/{session_id}         status and result (GET)
///
/// /locations                   proxy regions (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/scrape", scrape::router())
        .nest("/locations", locations::router())
}
