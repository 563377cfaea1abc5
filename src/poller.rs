//! Periodic refresh tasks.
//!
//! [`spawn_periodic`] runs a cycle on a fixed interval until told to stop.
//! A cycle always finishes before the next tick is taken, so cycles of one
//! poller never overlap, and a stop request takes effect between cycles.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::dashboard::Dashboard;
use crate::metrics::{compute_snapshot, MetricsConfig};
use crate::storage::ReadingSource;
use crate::weather::{WeatherClient, WeatherLocation};

// ---

/// Handle to a running poller. Dropping it also stops the poller.
pub struct PollHandle {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    // ---
    /// Signal the poller and wait for it to exit.
    pub async fn stop(self) {
        // ---
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("{} poller ended abnormally: {}", self.name, e);
        }
    }
}

/// Run `cycle` every `period`, starting immediately.
///
/// Ticks missed while a slow cycle runs are delayed, never bunched up.
pub fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, mut cycle: F) -> PollHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    // ---
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("{} poller started, period {:?}", name, period);

        loop {
            tokio::select! {
                _ = timer.tick() => cycle().await,
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("{} poller stopped", name);
    });

    PollHandle {
        name,
        stop_tx,
        task,
    }
}

/// One sensor cycle: fetch every reading, compute, publish.
///
/// A failed fetch publishes the unavailable state instead of keeping the
/// previous snapshot around.
pub async fn refresh_sensors(
    source: &dyn ReadingSource,
    config: &MetricsConfig,
    dashboard: &Dashboard,
) {
    // ---
    match source.fetch_readings().await {
        Ok(readings) => {
            let snapshot = compute_snapshot(&readings, config);
            debug!(
                "Sensor refresh: {} readings ({} valid), average {}, quality {}",
                snapshot.total_readings,
                snapshot.valid_readings,
                snapshot.rolling_average,
                snapshot.quality_label
            );
            dashboard.publish_snapshot(snapshot).await;
        }
        Err(e) => {
            error!("Sensor refresh failed: {}", e);
            dashboard.mark_unavailable(e.to_string()).await;
        }
    }
}

/// One weather cycle over every configured location.
pub async fn refresh_weather(
    client: &WeatherClient,
    locations: &[WeatherLocation],
    dashboard: &Dashboard,
) {
    // ---
    for location in locations {
        match client.fetch(location).await {
            Ok(report) => {
                debug!(
                    "Weather for '{}': {}°C, {}",
                    report.location, report.temperature_c, report.description
                );
                dashboard.publish_weather(report).await;
            }
            Err(e) => {
                warn!("Weather refresh for '{}' failed: {}", location.label, e);
                dashboard.clear_weather(&location.label).await;
            }
        }
    }
}

pub fn spawn_sensor_poller(
    source: Arc<dyn ReadingSource>,
    config: MetricsConfig,
    dashboard: Arc<Dashboard>,
    period: Duration,
) -> PollHandle {
    // ---
    let config = Arc::new(config);
    spawn_periodic("sensor", period, move || {
        let source = Arc::clone(&source);
        let config = Arc::clone(&config);
        let dashboard = Arc::clone(&dashboard);
        async move { refresh_sensors(source.as_ref(), &config, &dashboard).await }
    })
}

pub fn spawn_weather_poller(
    client: WeatherClient,
    locations: Vec<WeatherLocation>,
    dashboard: Arc<Dashboard>,
    period: Duration,
) -> PollHandle {
    // ---
    let locations = Arc::new(locations);
    spawn_periodic("weather", period, move || {
        let client = client.clone();
        let locations = Arc::clone(&locations);
        let dashboard = Arc::clone(&dashboard);
        async move { refresh_weather(&client, &locations, &dashboard).await }
    })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::dashboard::SensorState;
    use crate::metrics::Metric;
    use crate::models::Reading;
    use crate::storage::{StorageError, StorageResult};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves a fixed set of readings, or fails while `readings` is `None`.
    struct FakeSource {
        readings: Mutex<Option<Vec<Reading>>>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(readings: Option<Vec<Reading>>) -> Self {
            Self {
                readings: Mutex::new(readings),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReadingSource for FakeSource {
        async fn fetch_readings(&self) -> StorageResult<Vec<Reading>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.readings
                .lock()
                .unwrap()
                .clone()
                .ok_or(StorageError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn readings() -> Vec<Reading> {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 26, 12, 0, 0).unwrap();
        vec![
            Reading {
                id: 1,
                timestamp: t0,
                humidity_value: Some(50.0),
                location: "ubicacion 1".into(),
            },
            Reading {
                id: 2,
                timestamp: t0 + ChronoDuration::seconds(5),
                humidity_value: Some(60.0),
                location: "ubicacion 2".into(),
            },
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_task_runs_each_period_until_stopped() {
        // ---
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let handle = spawn_periodic("test", Duration::from_secs(5), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Ticks at 0s, 5s and 10s.
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_poller() {
        // ---
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let handle = spawn_periodic("test", Duration::from_secs(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let seen = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn failed_refresh_replaces_stale_snapshot() {
        // ---
        let source = FakeSource::new(Some(readings()));
        let dashboard = Dashboard::new();
        let config = MetricsConfig::default();

        refresh_sensors(&source, &config, &dashboard).await;
        match dashboard.sensor_state().await {
            SensorState::Ready { snapshot, .. } => {
                assert_eq!(snapshot.rolling_average, Metric::Available(55.0));
            }
            other => panic!("expected ready, got {other:?}"),
        }

        *source.readings.lock().unwrap() = None;
        refresh_sensors(&source, &config, &dashboard).await;
        assert!(matches!(
            dashboard.sensor_state().await,
            SensorState::Unavailable { .. }
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_poller_publishes_snapshots() {
        // ---
        let source = Arc::new(FakeSource::new(Some(readings())));
        let dashboard = Arc::new(Dashboard::new());

        let handle = spawn_sensor_poller(
            source.clone(),
            MetricsConfig::default(),
            Arc::clone(&dashboard),
            Duration::from_secs(5),
        );

        tokio::time::sleep(Duration::from_secs(11)).await;
        handle.stop().await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            dashboard.sensor_state().await,
            SensorState::Ready { .. }
        ));
    }
}
