//! Error types for the stepup-db crate.

use thiserror::Error;

/// Database operation errors.
///
/// Model methods return `sqlx::Error` directly; this wrapper exists for the
/// crate's own operations (connecting, migrating) where the caller needs to
/// tell the failure classes apart.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A database query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_source_message() {
        let err = DbError::QueryFailed(sqlx::Error::PoolClosed);
        assert!(err.to_string().starts_with("Query failed"));
    }
}
