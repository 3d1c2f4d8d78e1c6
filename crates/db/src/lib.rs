//! Postgres persistence for employees and roles.

use idm_core::config::DbConfig;
use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod transaction;

pub use error::{RepoError, RepoResult, StoreError, TransactionError};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool tuned by `config`.
///
/// The caller owns the returned pool and hands clones to repositories.
pub async fn connect(config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    tracing::debug!(
        driver = %config.driver_name,
        dsn = %config.redacted_dsn(),
        max_connections = config.pool.max_connections,
        "Opening database pool"
    );
    PgPoolOptions::new()
        .max_connections(config.pool.max_connections)
        .min_connections(config.pool.min_connections)
        .max_lifetime(config.pool.max_lifetime)
        .idle_timeout(config.pool.idle_timeout)
        .acquire_timeout(config.query_timeout)
        .connect(&config.dsn)
        .await
}

/// Verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
