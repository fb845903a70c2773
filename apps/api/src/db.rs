use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Batch reconciliation holds one connection per in-flight upsert chunk;
/// waiting longer than this for a connection means the pool is undersized.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to PostgreSQL (max {max_connections} connections)...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
        .context("Could not connect to the match database")?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}
