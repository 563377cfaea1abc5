//! `/api/sensors`: record readings and list them back.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tracing::{debug, info};

use super::{error::ApiError, AppState};
use crate::models::NewReading;
use crate::storage::StorageError;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/sensors", get(list_readings).post(create_reading))
}

/// Every stored reading, newest first.
async fn list_readings(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    // ---
    let readings = state.store.fetch_all().await?;
    debug!("GET /api/sensors - returning {} readings", readings.len());
    Ok(Json(readings))
}

/// Validate and store one reading. Responds `201` with the stored row.
///
/// A body that is not JSON, or is sent without a JSON content type, is a
/// `400` with the same error shape as a failed validation.
async fn create_reading(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    let Json(body) = payload.map_err(|rejection| {
        debug!("POST /api/sensors - unreadable body: {}", rejection.body_text());
        ApiError::new(StatusCode::BAD_REQUEST, "invalid reading", rejection.body_text())
    })?;

    let new_reading = NewReading::from_json(&body).map_err(|e| {
        debug!("POST /api/sensors - rejected {}: {}", body, e);
        StorageError::from(e)
    })?;

    let stored = state.store.insert(&new_reading).await?;
    info!(
        "POST /api/sensors - stored reading id={} location='{}'",
        stored.id, stored.location
    );
    Ok((StatusCode::CREATED, Json(stored)))
}
