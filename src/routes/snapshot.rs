//! `/api/metrics`: compute a snapshot from storage on demand.
//!
//! Unlike `/api/dashboard`, which serves what the poller last published, this
//! reads the table and runs the engine for the request. `recent` and `window`
//! override the configured slice length and averaging window.

use std::num::NonZeroUsize;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::{error::ApiError, AppState};
use crate::metrics::{compute_snapshot, MetricsConfig, MetricsSnapshot};

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/api/metrics", get(handler))
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    recent: Option<usize>,
    window: Option<usize>,
}

impl MetricsQuery {
    // ---
    /// Apply the overrides on top of `base`. A zero window is rejected.
    fn apply(&self, base: &MetricsConfig) -> Result<MetricsConfig, ApiError> {
        // ---
        let mut config = base.clone();
        if let Some(recent) = self.recent {
            config.recent_count_per_location = recent;
        }
        if let Some(window) = self.window {
            config.average_window_size = NonZeroUsize::new(window)
                .ok_or_else(|| ApiError::bad_request("window must be at least 1"))?;
        }
        Ok(config)
    }
}

async fn handler(
    params: Result<Query<MetricsQuery>, QueryRejection>,
    State(state): State<AppState>,
) -> Result<Json<MetricsSnapshot>, ApiError> {
    // ---
    let Query(params) =
        params.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let config = params.apply(&state.config.metrics)?;
    let readings = state.store.fetch_all().await?;
    let snapshot = compute_snapshot(&readings, &config);

    debug!(
        "GET /api/metrics {:?} - {} readings, average {}",
        params, snapshot.total_readings, snapshot.rolling_average
    );
    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn overrides_apply_on_top_of_base() {
        // ---
        let base = MetricsConfig::default();

        let query = MetricsQuery {
            recent: Some(5),
            window: Some(3),
        };
        let config = assert_ok!(query.apply(&base));
        assert_eq!(config.recent_count_per_location, 5);
        assert_eq!(config.average_window_size.get(), 3);
        assert_eq!(config.location_labels, base.location_labels);

        assert_eq!(assert_ok!(MetricsQuery::default().apply(&base)), base);
    }

    #[test]
    fn zero_window_is_rejected() {
        // ---
        let query = MetricsQuery {
            recent: None,
            window: Some(0),
        };
        assert_err!(query.apply(&MetricsConfig::default()));
    }
}
