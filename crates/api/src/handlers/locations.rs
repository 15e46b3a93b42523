use axum::Json;
use banner_core::locations::{self, Location};

/// GET /locations
///
/// Supported proxy regions, in code order.
pub async fn list_locations() -> Json<&'static [Location]> {
    Json(locations::all())
}
