//! Trusted device registry.
//!
//! A device the user chose to trust carries an opaque 256-bit token that
//! exempts it from live second-factor verification for a bounded period.
//! Only the SHA-256 hash of the token is stored; the plaintext crosses the
//! boundary exactly once, inside the [`TrustGrant`] returned by
//! [`DeviceService::trust`].

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use stepup_core::{AccountId, DeviceId};
use stepup_db::{NewTrustedDevice, TrustedDevice};

use crate::config::MfaConfig;
use crate::error::MfaError;
use crate::store::CredentialStore;

/// Bytes of entropy in a device token.
const DEVICE_TOKEN_BYTES: usize = 32;

/// Fingerprint length bounds (hex characters).
const FINGERPRINT_MIN_LENGTH: usize = 32;
const FINGERPRINT_MAX_LENGTH: usize = 128;

/// Client-reported attributes of the device being trusted.
///
/// Both fields are advisory. The fingerprint helps the user recognize the
/// device in a list; it is never proof of identity — only the token is.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub fingerprint: String,
    pub ip_address: Option<String>,
}

/// The result of trusting a device. `token` is the only copy of the
/// plaintext token that will ever exist server-side.
#[derive(Clone)]
pub struct TrustGrant {
    pub device: TrustedDevice,
    pub token: String,
}

impl std::fmt::Debug for TrustGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustGrant")
            .field("device", &self.device)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Generate an opaque device token: 256 bits from the OS CSPRNG,
/// URL-safe base64 without padding (43 characters).
#[must_use]
pub fn generate_device_token() -> String {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut bytes = [0u8; DEVICE_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a device token, hex-encoded. This is the stored form.
#[must_use]
pub fn hash_device_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate a client-supplied fingerprint: lowercase hex, bounded length.
pub fn validate_fingerprint(fingerprint: &str) -> Result<(), MfaError> {
    let len = fingerprint.len();
    if !(FINGERPRINT_MIN_LENGTH..=FINGERPRINT_MAX_LENGTH).contains(&len) {
        return Err(MfaError::Validation(format!(
            "device fingerprint must be {FINGERPRINT_MIN_LENGTH}-{FINGERPRINT_MAX_LENGTH} characters, got {len}"
        )));
    }
    if !fingerprint
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        return Err(MfaError::Validation(
            "device fingerprint must be lowercase hex".to_string(),
        ));
    }
    Ok(())
}

/// Manages the trusted device lifecycle: grant, lookup, list, revoke.
#[derive(Clone)]
pub struct DeviceService {
    store: Arc<dyn CredentialStore>,
    config: MfaConfig,
}

impl DeviceService {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, config: MfaConfig) -> Self {
        Self { store, config }
    }

    /// Trust the current device for the configured duration.
    ///
    /// Returns the plaintext token exactly once; only its hash is stored.
    pub async fn trust(
        &self,
        account_id: AccountId,
        context: &DeviceContext,
    ) -> Result<TrustGrant, MfaError> {
        validate_fingerprint(&context.fingerprint)?;

        let token = generate_device_token();
        let expires_at = Utc::now() + Duration::days(self.config.trust_duration_days);

        let device = self
            .store
            .insert_trusted_device(NewTrustedDevice {
                account_id: account_id.into_uuid(),
                token_hash: hash_device_token(&token),
                device_fingerprint: context.fingerprint.clone(),
                ip_address: context.ip_address.clone(),
                expires_at,
            })
            .await?;

        tracing::info!(
            account_id = %account_id,
            device_id = %device.id,
            expires_at = %device.expires_at,
            "Device trusted"
        );

        Ok(TrustGrant { device, token })
    }

    /// Whether the presented token belongs to an active trusted device.
    ///
    /// Expired, revoked and unknown tokens are indistinguishable: all false.
    pub async fn is_trusted(
        &self,
        account_id: AccountId,
        device_token: &str,
    ) -> Result<bool, MfaError> {
        let hash = hash_device_token(device_token);
        Ok(self
            .store
            .find_trusted_device(account_id, &hash)
            .await?
            .is_some())
    }

    /// Like [`is_trusted`](Self::is_trusted) but returns the record, failing
    /// with [`MfaError::DeviceNotTrusted`] when there is none.
    pub async fn require_trusted(
        &self,
        account_id: AccountId,
        device_token: &str,
    ) -> Result<TrustedDevice, MfaError> {
        let hash = hash_device_token(device_token);
        self.store
            .find_trusted_device(account_id, &hash)
            .await?
            .ok_or(MfaError::DeviceNotTrusted)
    }

    /// List the account's active trusted devices, newest first.
    pub async fn list(&self, account_id: AccountId) -> Result<Vec<TrustedDevice>, MfaError> {
        Ok(self.store.list_trusted_devices(account_id).await?)
    }

    /// Count the account's active trusted devices.
    pub async fn count(&self, account_id: AccountId) -> Result<i64, MfaError> {
        Ok(self.store.count_trusted_devices(account_id).await?)
    }

    /// Revoke a trusted device. Takes effect on the next lookup; nothing is
    /// cached.
    pub async fn revoke(&self, account_id: AccountId, device_id: DeviceId) -> Result<(), MfaError> {
        let revoked = self.store.revoke_trusted_device(account_id, device_id).await?;
        if !revoked {
            return Err(MfaError::DeviceNotTrusted);
        }

        tracing::info!(
            account_id = %account_id,
            device_id = %device_id,
            "Device trust revoked"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_url_safe_and_43_chars() {
        let token = generate_device_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate_device_token(), generate_device_token());
    }

    #[test]
    fn token_hash_is_sha256_hex() {
        let hash = hash_device_token("some-token");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash_device_token("some-token"));
        assert_ne!(hash, hash_device_token("other-token"));
    }

    #[test]
    fn fingerprint_accepts_sha256_hex() {
        let fp = "ab".repeat(32);
        assert!(validate_fingerprint(&fp).is_ok());
    }

    #[test]
    fn fingerprint_rejects_short_and_long() {
        assert!(validate_fingerprint("abcd").is_err());
        assert!(validate_fingerprint(&"ab".repeat(65)).is_err());
    }

    #[test]
    fn fingerprint_rejects_non_hex() {
        assert!(validate_fingerprint(&"zz".repeat(16)).is_err());
        assert!(validate_fingerprint(&"AB".repeat(16)).is_err());
    }

    #[test]
    fn trust_grant_debug_redacts_token() {
        use chrono::Utc;
        use uuid::Uuid;

        let grant = TrustGrant {
            device: TrustedDevice {
                id: Uuid::new_v4(),
                account_id: Uuid::new_v4(),
                token_hash: "cd".repeat(32),
                device_fingerprint: "ab".repeat(16),
                ip_address: None,
                trusted_at: Utc::now(),
                expires_at: Utc::now() + Duration::days(30),
                revoked_at: None,
            },
            token: "super-secret-token".to_string(),
        };
        let rendered = format!("{grant:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret-token"));
    }
}
