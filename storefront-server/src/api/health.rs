//! Health check routes - public, no authentication

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use shared::error::AppResult;
use shared::models::StoreLocation;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/locations", get(list_locations))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/locations - active store locations for the storefront picker
async fn list_locations(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<StoreLocation>>> {
    let mut locations = state.storage.list_locations()?;
    locations.retain(|l| l.is_active);
    Ok(Json(locations))
}
