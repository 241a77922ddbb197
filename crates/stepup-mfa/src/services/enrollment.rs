//! TOTP enrollment flow.
//!
//! Enrollment walks the user from password re-authentication through secret
//! provisioning and backup-code acknowledgment to live-code confirmation.
//! Nothing touches the store until [`EnrollmentService::complete_enrollment`]
//! succeeds: a user who abandons setup after scanning the QR code leaves no
//! persisted state, and restarting generates fresh material.

use std::sync::Arc;

use stepup_core::AccountId;
use stepup_db::{MfaCredential, NewMfaCredential};

use crate::config::MfaConfig;
use crate::crypto::SecretEncryption;
use crate::error::MfaError;
use crate::identity::IdentityProvider;
use crate::otp;
use crate::store::CredentialStore;

/// Material handed to the user at the start of enrollment.
///
/// Nothing here is persisted. The caller relays the provisioning URI (or QR
/// image) and the backup codes to the user, then submits the first live code
/// together with this material to complete enrollment.
#[derive(Clone)]
pub struct EnrollmentStarted {
    /// The TOTP secret, base32-encoded for authenticator apps.
    pub secret_base32: String,
    /// `otpauth://` provisioning URI.
    pub provisioning_uri: String,
    /// The provisioning URI rendered as a base64 PNG.
    pub qr_code_base64: String,
    /// Plaintext backup codes. Shown once; only hashes are stored later.
    pub backup_codes: Vec<String>,
}

impl std::fmt::Debug for EnrollmentStarted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentStarted")
            .field("secret_base32", &"[REDACTED]")
            .field("provisioning_uri", &"[REDACTED]")
            .field("qr_code_base64", &"[PNG]")
            .field("backup_codes", &format!("[{} codes]", self.backup_codes.len()))
            .finish()
    }
}

/// Drives the enrollment state machine.
pub struct EnrollmentService {
    store: Arc<dyn CredentialStore>,
    identity: Arc<dyn IdentityProvider>,
    encryption: SecretEncryption,
    config: MfaConfig,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        identity: Arc<dyn IdentityProvider>,
        encryption: SecretEncryption,
        config: MfaConfig,
    ) -> Self {
        Self {
            store,
            identity,
            encryption,
            config,
        }
    }

    /// Begin enrollment: re-authenticate, then provision fresh material.
    ///
    /// The password check comes first so a wrong password yields
    /// [`MfaError::InvalidCredentials`] without revealing whether MFA is
    /// already enabled. Nothing is persisted; calling this again simply
    /// supersedes the previous material.
    pub async fn start_enrollment(
        &self,
        account_id: AccountId,
        password: &str,
        account_label: &str,
    ) -> Result<EnrollmentStarted, MfaError> {
        if !self.identity.re_authenticate(account_id, password).await? {
            return Err(MfaError::InvalidCredentials);
        }

        if self.store.find_credential(account_id).await?.is_some() {
            return Err(MfaError::AlreadyEnrolled);
        }

        let secret = otp::generate_totp_secret();
        let provisioning_uri = otp::provisioning_uri(&secret, &self.config.issuer, account_label)?;
        let qr_code_base64 = otp::qr_code_base64(&provisioning_uri)?;
        let (backup_codes, _) = otp::generate_backup_codes(self.config.backup_code_count);

        tracing::info!(account_id = %account_id, "MFA enrollment started");

        Ok(EnrollmentStarted {
            secret_base32: otp::secret_to_base32(&secret),
            provisioning_uri,
            qr_code_base64,
            backup_codes,
        })
    }

    /// Confirm enrollment with a live code and persist atomically.
    ///
    /// Verifies the candidate against the provisioned secret; only on
    /// success are the encrypted credential and the hashed backup-code batch
    /// written, in one store transaction. A wrong code writes nothing and
    /// the flow stays restartable. The batch must be non-empty: an enabled
    /// credential always has backup codes behind it.
    pub async fn complete_enrollment(
        &self,
        account_id: AccountId,
        secret_base32: &str,
        candidate_code: &str,
        backup_codes: &[String],
    ) -> Result<MfaCredential, MfaError> {
        if backup_codes.is_empty() {
            return Err(MfaError::Validation(
                "enrollment requires a non-empty backup code batch".to_string(),
            ));
        }

        if self.store.find_credential(account_id).await?.is_some() {
            return Err(MfaError::AlreadyEnrolled);
        }

        let secret = otp::secret_from_base32(secret_base32)?;
        // Same normalization as the login path: spaces and dashes are noise.
        let candidate = candidate_code.replace(['-', ' '], "");
        if !otp::verify_totp(&secret, &candidate, otp::unix_time_now()?)? {
            tracing::warn!(account_id = %account_id, "MFA enrollment confirmation failed");
            return Err(MfaError::InvalidCode);
        }

        let (secret_encrypted, nonce) = self.encryption.encrypt(&secret)?;
        let code_hashes: Vec<String> = backup_codes
            .iter()
            .map(|code| otp::hash_backup_code(code))
            .collect();

        let credential = self
            .store
            .commit_enrollment(
                NewMfaCredential {
                    account_id: account_id.into_uuid(),
                    secret_encrypted,
                    nonce,
                },
                &code_hashes,
            )
            .await?;

        tracing::info!(
            account_id = %account_id,
            backup_codes = code_hashes.len(),
            "MFA enrollment completed"
        );
        Ok(credential)
    }

    /// Disable MFA: re-authenticate, then delete the credential, all backup
    /// codes and (per config) all trusted devices atomically.
    pub async fn disable(&self, account_id: AccountId, password: &str) -> Result<(), MfaError> {
        if !self.identity.re_authenticate(account_id, password).await? {
            return Err(MfaError::InvalidCredentials);
        }

        let removed = self
            .store
            .remove_credential(account_id, self.config.revoke_devices_on_disable)
            .await?;
        if !removed {
            return Err(MfaError::NotEnrolled);
        }

        tracing::info!(
            account_id = %account_id,
            devices_revoked = self.config.revoke_devices_on_disable,
            "MFA disabled"
        );
        Ok(())
    }

    /// Replace the backup-code batch wholesale.
    ///
    /// Unconsumed codes from the old batch stop working immediately.
    /// Returns the new plaintext codes; they are shown once.
    pub async fn regenerate_backup_codes(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<String>, MfaError> {
        if self.store.find_credential(account_id).await?.is_none() {
            return Err(MfaError::NotEnrolled);
        }

        let (codes, hashes) = otp::generate_backup_codes(self.config.backup_code_count);
        self.store.replace_backup_codes(account_id, &hashes).await?;

        tracing::info!(
            account_id = %account_id,
            backup_codes = codes.len(),
            "Backup codes regenerated"
        );
        Ok(codes)
    }
}
