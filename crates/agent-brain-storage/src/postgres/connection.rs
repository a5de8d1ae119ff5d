//! Postgres connection pool + migrations

use std::time::Duration;

use agent_brain_config::PostgresConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::StorageResult;

/// Create a connection pool and run migrations. Idempotent: safe to call
/// on every process start.
///
/// # Errors
/// Returns an error if the database is unreachable, credentials are
/// invalid, or a migration fails to apply.
pub async fn connect(config: &PostgresConfig) -> StorageResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size + config.pool_max_overflow)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.connection_string())
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
