use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// Creates the shared Postgres pool. Mirrors the reference fleet's
/// `db_pool::create_pool`: one pool per process, sized from config, with
/// bounded connect/acquire timeouts so a dead database degrades requests
/// into `Dependency` errors instead of hanging workers indefinitely.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await
        .map_err(|e| crate::error::AppError::Dependency(format!("database pool: {e}")))?;

    info!(
        max_connections = config.max_connections,
        "Postgres pool initialized"
    );
    Ok(pool)
}
