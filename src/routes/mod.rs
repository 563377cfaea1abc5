use std::sync::Arc;

use axum::Router;

use crate::{Config, Dashboard, HumidityStore};

mod dashboard;
mod error;
mod health;
mod sensors;
mod snapshot;

pub use error::ApiError;

// ---

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: HumidityStore,
    pub config: Arc<Config>,
    pub dashboard: Arc<Dashboard>,
}

pub fn router(store: HumidityStore, config: Arc<Config>, dashboard: Arc<Dashboard>) -> Router {
    // ---
    Router::new()
        .merge(sensors::router())
        .merge(snapshot::router())
        .merge(dashboard::router())
        .merge(health::router())
        .with_state(AppState {
            store,
            config,
            dashboard,
        })
}
