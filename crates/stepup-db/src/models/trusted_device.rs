//! Trusted device model.
//!
//! A trusted device holds a bounded-lifetime exemption from live second
//! factor verification. Only the SHA-256 hash of the opaque device token is
//! stored; the token itself is returned to the client exactly once.
//! Expired rows are inert and ignored lazily rather than purged.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// A device trusted to skip live second-factor verification.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrustedDevice {
    /// Unique identifier for this trust record.
    pub id: Uuid,

    /// The account that granted the trust.
    pub account_id: Uuid,

    /// SHA-256 hash of the opaque device token.
    #[serde(skip_serializing)]
    pub token_hash: String,

    /// Client-supplied fingerprint. Advisory only, never proof of identity.
    pub device_fingerprint: String,

    /// IP address observed when trust was granted. Advisory only.
    pub ip_address: Option<String>,

    /// When trust was granted.
    pub trusted_at: DateTime<Utc>,

    /// When trust lapses. Always after `trusted_at`.
    pub expires_at: DateTime<Utc>,

    /// When the user explicitly revoked this device (NULL if active).
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Data required to record a newly trusted device.
#[derive(Debug, Clone)]
pub struct NewTrustedDevice {
    pub account_id: Uuid,
    pub token_hash: String,
    pub device_fingerprint: String,
    pub ip_address: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TrustedDevice {
    /// Whether the trust window has lapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Whether this record still exempts the device: not revoked, not expired.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && !self.is_expired()
    }

    /// Record a newly trusted device.
    pub async fn create<'e, E>(executor: E, data: NewTrustedDevice) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO mfa_trusted_devices
                (account_id, token_hash, device_fingerprint, ip_address, trusted_at, expires_at)
            VALUES ($1, $2, $3, $4, NOW(), $5)
            RETURNING *
            ",
        )
        .bind(data.account_id)
        .bind(&data.token_hash)
        .bind(&data.device_fingerprint)
        .bind(&data.ip_address)
        .bind(data.expires_at)
        .fetch_one(executor)
        .await
    }

    /// Find an active (unrevoked, unexpired) device by its token hash.
    ///
    /// An expired or revoked row resolves to `None`, identical to no row at
    /// all; the login path cannot tell the cases apart.
    pub async fn find_active_by_token_hash<'e, E>(
        executor: E,
        account_id: Uuid,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            SELECT * FROM mfa_trusted_devices
            WHERE account_id = $1 AND token_hash = $2
              AND revoked_at IS NULL AND expires_at > NOW()
            ",
        )
        .bind(account_id)
        .bind(token_hash)
        .fetch_optional(executor)
        .await
    }

    /// List active devices for an account.
    pub async fn list_active<'e, E>(executor: E, account_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            SELECT * FROM mfa_trusted_devices
            WHERE account_id = $1 AND revoked_at IS NULL AND expires_at > NOW()
            ORDER BY trusted_at DESC
            ",
        )
        .bind(account_id)
        .fetch_all(executor)
        .await
    }

    /// Count active devices for an account.
    pub async fn count_active<'e, E>(executor: E, account_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM mfa_trusted_devices
            WHERE account_id = $1 AND revoked_at IS NULL AND expires_at > NOW()
            ",
        )
        .bind(account_id)
        .fetch_one(executor)
        .await
    }

    /// Revoke a device. Effective immediately for subsequent lookups.
    /// Returns true if an active row was revoked.
    pub async fn revoke<'e, E>(
        executor: E,
        account_id: Uuid,
        device_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            UPDATE mfa_trusted_devices
            SET revoked_at = NOW()
            WHERE account_id = $1 AND id = $2 AND revoked_at IS NULL
            ",
        )
        .bind(account_id)
        .bind(device_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all trust records for an account (MFA disable).
    pub async fn delete_all_for_account<'e, E>(
        executor: E,
        account_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM mfa_trusted_devices WHERE account_id = $1")
            .bind(account_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn device(trusted_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> TrustedDevice {
        TrustedDevice {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            token_hash: "cd".repeat(32),
            device_fingerprint: "ab".repeat(16),
            ip_address: Some("203.0.113.7".to_string()),
            trusted_at,
            expires_at,
            revoked_at: None,
        }
    }

    #[test]
    fn device_within_window_is_active() {
        // Trusted at T0 with a 30-day window, checked at T0+29d.
        let trusted_at = Utc::now() - Duration::days(29);
        let d = device(trusted_at, trusted_at + Duration::days(30));
        assert!(!d.is_expired());
        assert!(d.is_active());
    }

    #[test]
    fn device_past_window_is_expired() {
        // Trusted at T0 with a 30-day window, checked at T0+31d.
        let trusted_at = Utc::now() - Duration::days(31);
        let d = device(trusted_at, trusted_at + Duration::days(30));
        assert!(d.is_expired());
        assert!(!d.is_active());
    }

    #[test]
    fn revoked_device_is_not_active_even_before_expiry() {
        let mut d = device(Utc::now(), Utc::now() + Duration::days(30));
        d.revoked_at = Some(Utc::now());
        assert!(!d.is_active());
    }

    #[test]
    fn serialization_skips_token_hash() {
        let d = device(Utc::now(), Utc::now() + Duration::days(30));
        let json = serde_json::to_string(&d).unwrap();
        assert!(!json.contains("token_hash"));
        assert!(json.contains("device_fingerprint"));
    }
}
