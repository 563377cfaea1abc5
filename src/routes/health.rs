// src/routes/health.rs
//! Health check endpoints for the humidity dashboard.
//!
//! - `/health` answers without touching anything, for container
//!   orchestrators that only need to know the process is serving HTTP.
//! - `/health/db` round-trips a `SELECT 1` through the store so a broken
//!   database shows up as `503`.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the health endpoints.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Handle `GET /health/db`.
async fn health_db(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    // ---
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok" })),
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/db", get(health_db))
}
