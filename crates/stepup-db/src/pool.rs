//! Connection pool construction.

use crate::error::DbError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Default maximum number of pooled connections.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default timeout for acquiring a connection from the pool.
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect to the database and build a pool with default settings.
///
/// # Errors
///
/// Returns [`DbError::ConnectionFailed`] if the database is unreachable or
/// the credentials are rejected.
pub async fn connect(database_url: &str) -> Result<PgPool, DbError> {
    PgPoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
        .map_err(DbError::ConnectionFailed)
}
