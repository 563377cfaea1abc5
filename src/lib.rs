//! Humidity readings API and derived-metrics dashboard backend.
//!
//! The interesting part is [`metrics::compute_snapshot`], a pure function from
//! stored readings to dashboard metrics. The rest wires it to PostgreSQL
//! ([`storage`]), an axum API ([`routes`]), periodic refresh tasks
//! ([`poller`]) and an optional weather overlay ([`weather`]).

pub mod config;
pub mod dashboard;
pub mod metrics;
pub mod models;
pub mod poller;
pub mod routes;
pub mod schema;
pub mod storage;
pub mod weather;

pub use config::Config;
pub use dashboard::{Dashboard, SensorState};
pub use metrics::{compute_snapshot, Metric, MetricsConfig, MetricsSnapshot, PlayabilityPolicy};
pub use models::{NewReading, Reading};
pub use storage::{HumidityStore, ReadingSource, StorageError};
pub use weather::{WeatherClient, WeatherLocation, WeatherReport};
