//! `/api/dashboard` and `/api/weather`: results published by the pollers.
//!
//! Neither handler touches the database. When the last sensor cycle failed,
//! or none has finished yet, the dashboard answers `503` with a "data
//! unavailable" body. Weather is attached either way.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;
use crate::dashboard::SensorState;
use crate::metrics::MetricsSnapshot;
use crate::weather::WeatherReport;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/api/weather", get(weather))
}

#[derive(Serialize)]
struct DashboardBody {
    snapshot: MetricsSnapshot,
    updated_at: DateTime<Utc>,
    weather: Vec<WeatherReport>,
}

#[derive(Serialize)]
struct UnavailableBody {
    error: &'static str,
    details: String,
    weather: Vec<WeatherReport>,
}

async fn dashboard(State(state): State<AppState>) -> Response {
    // ---
    let weather = state.dashboard.weather().await;

    match state.dashboard.sensor_state().await {
        SensorState::Ready {
            snapshot,
            updated_at,
        } => Json(DashboardBody {
            snapshot,
            updated_at,
            weather,
        })
        .into_response(),
        SensorState::Pending => unavailable("no sensor data collected yet".to_string(), weather),
        SensorState::Unavailable { reason, since } => {
            unavailable(format!("{reason} (since {since})"), weather)
        }
    }
}

fn unavailable(details: String, weather: Vec<WeatherReport>) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(UnavailableBody {
            error: "data unavailable",
            details,
            weather,
        }),
    )
        .into_response()
}

async fn weather(State(state): State<AppState>) -> Json<Vec<WeatherReport>> {
    Json(state.dashboard.weather().await)
}
