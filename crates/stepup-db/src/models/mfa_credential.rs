//! MFA credential model.
//!
//! One row per account, written only when enrollment is confirmed; an
//! unconfirmed enrollment never reaches the database. The TOTP secret is
//! encrypted at rest with AES-256-GCM.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// An account's confirmed MFA credential.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MfaCredential {
    /// Unique identifier for this credential record.
    pub id: Uuid,

    /// The account this credential belongs to.
    pub account_id: Uuid,

    /// AES-256-GCM encrypted TOTP secret (160-bit minimum).
    #[serde(skip_serializing)]
    pub secret_encrypted: Vec<u8>,

    /// Nonce used for the AES-GCM encryption.
    #[serde(skip_serializing)]
    pub nonce: Vec<u8>,

    /// Whether the credential is active. Always true for committed rows;
    /// kept explicit so a backend can disable without deleting.
    pub is_enabled: bool,

    /// When enrollment was confirmed. Immutable after commit.
    pub enrolled_at: DateTime<Utc>,

    /// When the credential last passed verification.
    pub last_used_at: Option<DateTime<Utc>>,

    /// When this record was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to commit a new MFA credential.
#[derive(Debug, Clone)]
pub struct NewMfaCredential {
    pub account_id: Uuid,
    pub secret_encrypted: Vec<u8>,
    pub nonce: Vec<u8>,
}

impl MfaCredential {
    /// Commit a confirmed credential (`is_enabled = true`, `enrolled_at = now`).
    pub async fn create<'e, E>(executor: E, data: NewMfaCredential) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO mfa_credentials (account_id, secret_encrypted, nonce, is_enabled, enrolled_at)
            VALUES ($1, $2, $3, true, NOW())
            RETURNING *
            ",
        )
        .bind(data.account_id)
        .bind(&data.secret_encrypted)
        .bind(&data.nonce)
        .fetch_one(executor)
        .await
    }

    /// Find a credential by account ID.
    pub async fn find_by_account<'e, E>(
        executor: E,
        account_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM mfa_credentials WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(executor)
            .await
    }

    /// Record a successful verification against this credential.
    pub async fn record_use<'e, E>(executor: E, account_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE mfa_credentials SET last_used_at = NOW() WHERE account_id = $1")
            .bind(account_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Delete the credential (MFA disable).
    /// Returns true if a row was removed.
    pub async fn delete<'e, E>(executor: E, account_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM mfa_credentials WHERE account_id = $1")
            .bind(account_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_skips_secret_material() {
        let credential = MfaCredential {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            secret_encrypted: vec![1, 2, 3],
            nonce: vec![4, 5, 6],
            is_enabled: true,
            enrolled_at: Utc::now(),
            last_used_at: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&credential).unwrap();
        assert!(!json.contains("secret_encrypted"));
        assert!(!json.contains("nonce"));
        assert!(json.contains("is_enabled"));
    }
}
