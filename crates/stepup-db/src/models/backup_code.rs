//! MFA backup code model.
//!
//! Backup codes let a user complete verification after losing access to
//! their authenticator app. Each code is single-use and stored as a
//! SHA-256 hash; batches are only ever replaced wholesale.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// A single-use backup code.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BackupCode {
    /// Unique identifier for this backup code.
    pub id: Uuid,

    /// The account this code belongs to.
    pub account_id: Uuid,

    /// SHA-256 hash of the backup code.
    #[serde(skip_serializing)]
    pub code_hash: String,

    /// When this code was consumed (NULL if still valid).
    pub consumed_at: Option<DateTime<Utc>>,

    /// When this code was created.
    pub created_at: DateTime<Utc>,
}

impl BackupCode {
    /// Whether this code has already been consumed.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Insert a batch of backup codes for an account.
    pub async fn create_batch<'e, E>(
        executor: E,
        account_id: Uuid,
        code_hashes: &[String],
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let hashes: Vec<&str> = code_hashes.iter().map(String::as_str).collect();

        sqlx::query_as(
            r"
            INSERT INTO mfa_backup_codes (account_id, code_hash)
            SELECT $1, unnest($2::text[])
            RETURNING *
            ",
        )
        .bind(account_id)
        .bind(&hashes)
        .fetch_all(executor)
        .await
    }

    /// Consume a backup code: a single compare-and-set on `consumed_at`.
    ///
    /// Returns true if a matching unconsumed code was found and marked.
    /// Under concurrent submission of the same code, the row lock guarantees
    /// at most one caller sees true.
    pub async fn consume<'e, E>(
        executor: E,
        account_id: Uuid,
        code_hash: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            UPDATE mfa_backup_codes
            SET consumed_at = NOW()
            WHERE account_id = $1 AND code_hash = $2 AND consumed_at IS NULL
            ",
        )
        .bind(account_id)
        .bind(code_hash)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check whether any code with this hash exists for the account,
    /// consumed or not. Used to distinguish a replayed code from a code
    /// that never matched.
    pub async fn exists<'e, E>(
        executor: E,
        account_id: Uuid,
        code_hash: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM mfa_backup_codes WHERE account_id = $1 AND code_hash = $2",
        )
        .bind(account_id)
        .bind(code_hash)
        .fetch_one(executor)
        .await?;
        Ok(count > 0)
    }

    /// Count unconsumed backup codes for an account.
    pub async fn count_unconsumed<'e, E>(executor: E, account_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM mfa_backup_codes WHERE account_id = $1 AND consumed_at IS NULL",
        )
        .bind(account_id)
        .fetch_one(executor)
        .await
    }

    /// Delete all backup codes for an account (regeneration or MFA disable).
    pub async fn delete_all_for_account<'e, E>(
        executor: E,
        account_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM mfa_backup_codes WHERE account_id = $1")
            .bind(account_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
