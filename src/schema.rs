//! Database schema management for `humidity-dashboard`.
//!
//! Ensures the readings table and its index exist before serving requests.
//! Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the `humedad` table if it is missing (idempotent).
///
/// The table name and columns match the deployed dashboards so an existing
/// database can be pointed at directly. `humidity_value` stays nullable since
/// older rows carry NULLs.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS humedad (
            id             SERIAL PRIMARY KEY,
            humidity_value DOUBLE PRECISION,
            location       TEXT        NOT NULL,
            timestamp      TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Every read orders by timestamp
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_humedad_timestamp
            ON humedad (timestamp DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
