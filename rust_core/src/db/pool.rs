//! SQLite connection pool for the local dedup store.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

#[derive(Clone, Debug)]
pub struct DbPoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DbPoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DbPoolConfig {
    pub fn from_env() -> Self {
        Self {
            // One writer is enough for a single-threaded listener.
            max_connections: std::env::var("DB_POOL_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            acquire_timeout: Duration::from_secs(
                std::env::var("DB_POOL_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Open (creating if needed) the SQLite database at `database_url`.
pub async fn create_pool(database_url: &str, config: DbPoolConfig) -> Result<SqlitePool> {
    info!(
        "Creating SQLite pool: url={}, max={}",
        database_url, config.max_connections
    );

    let connect_opts = SqliteConnectOptions::from_str(database_url)
        .context("Failed to parse database URL")?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_opts)
        .await
        .context("Failed to create database pool")?;

    Ok(pool)
}
