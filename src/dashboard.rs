//! Latest polled results, shared between the pollers and the HTTP layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::metrics::MetricsSnapshot;
use crate::weather::WeatherReport;

// ---

/// Outcome of the most recent sensor cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SensorState {
    /// No cycle has completed yet.
    Pending,
    Ready {
        snapshot: MetricsSnapshot,
        updated_at: DateTime<Utc>,
    },
    /// The last fetch failed. The previous snapshot is dropped rather than
    /// shown as if it were current.
    Unavailable {
        reason: String,
        since: DateTime<Utc>,
    },
}

#[derive(Debug)]
pub struct Dashboard {
    sensors: RwLock<SensorState>,
    weather: RwLock<BTreeMap<String, WeatherReport>>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    // ---
    pub fn new() -> Self {
        Self {
            sensors: RwLock::new(SensorState::Pending),
            weather: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn publish_snapshot(&self, snapshot: MetricsSnapshot) {
        *self.sensors.write().await = SensorState::Ready {
            snapshot,
            updated_at: Utc::now(),
        };
    }

    pub async fn mark_unavailable(&self, reason: impl Into<String>) {
        *self.sensors.write().await = SensorState::Unavailable {
            reason: reason.into(),
            since: Utc::now(),
        };
    }

    pub async fn sensor_state(&self) -> SensorState {
        self.sensors.read().await.clone()
    }

    pub async fn publish_weather(&self, report: WeatherReport) {
        self.weather
            .write()
            .await
            .insert(report.location.clone(), report);
    }

    /// Forget the report for `location` after a failed refresh.
    pub async fn clear_weather(&self, location: &str) {
        self.weather.write().await.remove(location);
    }

    /// Current reports, ordered by location label.
    pub async fn weather(&self) -> Vec<WeatherReport> {
        self.weather.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::metrics::{compute_snapshot, MetricsConfig};

    fn report(location: &str, temperature_c: f64) -> WeatherReport {
        WeatherReport {
            location: location.to_string(),
            temperature_c,
            description: "nubes dispersas".to_string(),
            wind_speed_ms: 2.0,
            rain_1h_mm: 0.0,
            observed_at: None,
        }
    }

    #[tokio::test]
    async fn sensor_state_transitions() {
        // ---
        let dashboard = Dashboard::new();
        assert_eq!(dashboard.sensor_state().await, SensorState::Pending);

        let snapshot = compute_snapshot(&[], &MetricsConfig::default());
        dashboard.publish_snapshot(snapshot.clone()).await;
        match dashboard.sensor_state().await {
            SensorState::Ready { snapshot: s, .. } => assert_eq!(s, snapshot),
            other => panic!("expected ready, got {other:?}"),
        }

        dashboard.mark_unavailable("database down").await;
        match dashboard.sensor_state().await {
            SensorState::Unavailable { reason, .. } => assert_eq!(reason, "database down"),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn weather_reports_are_keyed_by_location() {
        // ---
        let dashboard = Dashboard::new();
        dashboard.publish_weather(report("ubicacion 2", 20.0)).await;
        dashboard.publish_weather(report("ubicacion 1", 18.0)).await;
        dashboard.publish_weather(report("ubicacion 1", 19.5)).await;

        let reports = dashboard.weather().await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].location, "ubicacion 1");
        assert_eq!(reports[0].temperature_c, 19.5);

        dashboard.clear_weather("ubicacion 1").await;
        let reports = dashboard.weather().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].location, "ubicacion 2");
    }
}
