//! Application entry point for the `humidity-dashboard` backend service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the PostgreSQL pool behind a [`HumidityStore`]
//! - Creating the database schema if it does not exist
//! - Starting the sensor poller (and the weather poller when configured)
//! - Binding the Axum HTTP server and serving requests until Ctrl-C
//!
//! On shutdown the pollers are stopped before the pool is closed.
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See [`humidity_dashboard::config`] for the rest.
use std::{env, io::IsTerminal, net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

use humidity_dashboard::{
    config, poller, routes, schema, Dashboard, HumidityStore, ReadingSource, WeatherClient,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    // Load `.env` first so its logging variables reach the subscriber.
    dotenv().ok();
    init_tracing();

    let cfg = Arc::new(config::load_from_env()?);
    cfg.log_config();

    tracing::info!("Attempting to connect to database");

    let store = HumidityStore::connect(&cfg.db_url, cfg.db_pool_max)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(store.pool()).await?;

    let dashboard = Arc::new(Dashboard::new());

    let source: Arc<dyn ReadingSource> = Arc::new(store.clone());
    let mut pollers = vec![poller::spawn_sensor_poller(
        source,
        cfg.metrics.clone(),
        Arc::clone(&dashboard),
        cfg.sensor_poll,
    )];

    match (&cfg.weather_api_key, cfg.weather_enabled()) {
        (Some(key), true) => {
            let client = WeatherClient::new(&cfg.weather_api_url, key)?;
            pollers.push(poller::spawn_weather_poller(
                client,
                cfg.weather_locations.clone(),
                Arc::clone(&dashboard),
                cfg.weather_poll,
            ));
        }
        _ => tracing::info!("Weather overlay disabled"),
    }

    let app: Router = routes::router(store.clone(), Arc::clone(&cfg), dashboard);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for handle in pollers {
        handle.stop().await;
    }
    store.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    // ---
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, falling back to `AXUM_LOG_LEVEL`
///
/// Call once at startup, before any tracing macro runs.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
