//! PostgreSQL access for humidity readings.
//!
//! [`HumidityStore`] owns the connection pool. It is built once in `main.rs`,
//! handed to the router and the sensor poller, and closed on shutdown.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::{NewReading, Reading, ValidationError};

// ---

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid reading: {0}")]
    Validation(#[from] ValidationError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Anything that can hand over the full set of stored readings.
///
/// The sensor poller depends on this rather than on [`HumidityStore`] so it
/// can be driven without a database.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    async fn fetch_readings(&self) -> StorageResult<Vec<Reading>>;
}

/// Handle to the `humedad` table.
#[derive(Clone)]
pub struct HumidityStore {
    pool: PgPool,
}

impl HumidityStore {
    // ---
    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        // ---
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Persist a validated reading. Id and timestamp come from the database.
    pub async fn insert(&self, reading: &NewReading) -> StorageResult<Reading> {
        // ---
        let stored = sqlx::query_as::<_, Reading>(
            r#"
            INSERT INTO humedad (humidity_value, location)
            VALUES ($1, $2)
            RETURNING id, timestamp, humidity_value, location
            "#,
        )
        .bind(reading.humidity_value)
        .bind(&reading.location)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            "Stored reading id={} location={} humidity={}",
            stored.id,
            stored.location,
            reading.humidity_value
        );
        Ok(stored)
    }

    /// Every stored reading, newest first.
    pub async fn fetch_all(&self) -> StorageResult<Vec<Reading>> {
        // ---
        let rows = sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, timestamp, humidity_value, location
            FROM humedad
            ORDER BY timestamp DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ReadingSource for HumidityStore {
    async fn fetch_readings(&self) -> StorageResult<Vec<Reading>> {
        self.fetch_all().await
    }
}
