//! Login-time second-factor verification.
//!
//! After the password check, the login orchestrator holds a pending MFA
//! session and calls [`VerificationService::verify`] with whatever the user
//! typed. The engine normalizes the input, classifies it as a TOTP or backup
//! code by shape, applies the per-session attempt limit, and verifies.
//!
//! Attempt tracking is ephemeral and server-side: a per-account sliding
//! window of failure timestamps that expires with the session TTL. A process
//! restart forgets the counters, which only ever errs permissive; the
//! authoritative single-use and expiry state lives in the store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use stepup_core::AccountId;
use stepup_db::MfaCredential;

use crate::config::MfaConfig;
use crate::crypto::SecretEncryption;
use crate::error::MfaError;
use crate::otp;
use crate::services::devices::{DeviceContext, DeviceService};
use crate::store::{ConsumeOutcome, CredentialStore};

/// Which second factor satisfied verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerifiedMethod {
    Totp,
    BackupCode,
}

/// Successful verification result.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub method: VerifiedMethod,
    /// Unconsumed codes left, reported when a backup code was spent so the
    /// caller can warn the user.
    pub backup_codes_remaining: Option<i64>,
    /// Plaintext trusted-device token, present when the caller asked to
    /// trust this device. Shown once.
    pub device_token: Option<String>,
}

/// Account-level MFA status summary.
#[derive(Debug, Clone, Serialize)]
pub struct MfaStatus {
    pub enabled: bool,
    pub backup_codes_remaining: i64,
    pub trusted_device_count: i64,
}

/// A normalized code candidate, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CodeCandidate {
    Totp(String),
    Backup(String),
}

/// Normalize and classify raw user input: strip spaces and dashes,
/// uppercase, then 6 digits is a TOTP code and 8 alphanumerics is a backup
/// code. Anything else is unclassifiable.
fn classify_candidate(raw: &str) -> Option<CodeCandidate> {
    let normalized = raw.replace(['-', ' '], "").to_uppercase();
    if normalized.len() == otp::TOTP_DIGITS && normalized.bytes().all(|b| b.is_ascii_digit()) {
        return Some(CodeCandidate::Totp(normalized));
    }
    if normalized.len() == otp::BACKUP_CODE_LENGTH
        && normalized.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return Some(CodeCandidate::Backup(normalized));
    }
    None
}

/// Failure timestamps for one account's pending session.
struct SessionEntry {
    failures: Vec<Instant>,
}

/// Sliding-window attempt limiter keyed by account.
///
/// Entries prune lazily: timestamps older than the session TTL fall out of
/// the window on the next touch. There is no explicit teardown.
struct PendingSessions {
    entries: Mutex<HashMap<AccountId, SessionEntry>>,
}

impl PendingSessions {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the account has exhausted its attempts for the current window.
    ///
    /// Pruning is also the garbage collector: an entry whose failures have
    /// all aged out is removed, so abandoned logins do not accumulate.
    fn is_limited(&self, account_id: AccountId, max_attempts: usize, ttl: std::time::Duration) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&account_id) else {
            return false;
        };
        entry.failures.retain(|t| t.elapsed() < ttl);
        let remaining = entry.failures.len();
        if remaining == 0 {
            entries.remove(&account_id);
            return false;
        }
        remaining >= max_attempts
    }

    fn record_failure(&self, account_id: AccountId) {
        let mut entries = self.entries.lock();
        entries
            .entry(account_id)
            .or_insert_with(|| SessionEntry {
                failures: Vec::new(),
            })
            .failures
            .push(Instant::now());
    }

    fn clear(&self, account_id: AccountId) {
        self.entries.lock().remove(&account_id);
    }
}

/// Verifies second factors during login.
pub struct VerificationService {
    store: Arc<dyn CredentialStore>,
    devices: DeviceService,
    encryption: SecretEncryption,
    config: MfaConfig,
    pending: PendingSessions,
}

impl VerificationService {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        devices: DeviceService,
        encryption: SecretEncryption,
        config: MfaConfig,
    ) -> Self {
        Self {
            store,
            devices,
            encryption,
            config,
            pending: PendingSessions::new(),
        }
    }

    /// Whether login for this account must pass a second factor.
    pub async fn requires_second_factor(&self, account_id: AccountId) -> Result<bool, MfaError> {
        Ok(self
            .store
            .find_credential(account_id)
            .await?
            .is_some_and(|c| c.is_enabled))
    }

    /// Verify a submitted code for a pending login.
    ///
    /// Order matters:
    /// 1. Unclassifiable input fails fast with [`MfaError::InvalidFormat`]
    ///    and does not consume an attempt.
    /// 2. A malformed trust context is rejected up front — after
    ///    verification it would be too late, the single-use backup code
    ///    would already be spent.
    /// 3. The attempt limit is checked before any verification, so an
    ///    exhausted session yields [`MfaError::RateLimited`] even for a
    ///    correct code.
    /// 4. Only then is the code verified against the credential.
    ///
    /// On success the session counter resets and, when `trust_device` is
    /// given, a trusted-device token is issued and included in the outcome.
    pub async fn verify(
        &self,
        account_id: AccountId,
        candidate: &str,
        trust_device: Option<&DeviceContext>,
    ) -> Result<VerificationOutcome, MfaError> {
        let Some(candidate) = classify_candidate(candidate) else {
            return Err(MfaError::InvalidFormat);
        };

        if let Some(context) = trust_device {
            crate::services::devices::validate_fingerprint(&context.fingerprint)?;
        }

        if self
            .pending
            .is_limited(account_id, self.config.max_attempts, self.config.session_ttl)
        {
            tracing::warn!(account_id = %account_id, "MFA verification rate limited");
            return Err(MfaError::RateLimited);
        }

        let credential = self
            .store
            .find_credential(account_id)
            .await?
            .filter(|c| c.is_enabled)
            .ok_or(MfaError::NotEnrolled)?;

        let (method, backup_codes_remaining) = match candidate {
            CodeCandidate::Totp(code) => {
                self.verify_totp_candidate(account_id, &credential, &code)
                    .await?;
                (VerifiedMethod::Totp, None)
            }
            CodeCandidate::Backup(code) => {
                let remaining = self.consume_backup_candidate(account_id, &code).await?;
                (VerifiedMethod::BackupCode, Some(remaining))
            }
        };

        self.pending.clear(account_id);
        self.store.record_credential_use(account_id).await?;

        let device_token = match trust_device {
            Some(context) => Some(self.devices.trust(account_id, context).await?.token),
            None => None,
        };

        tracing::info!(account_id = %account_id, method = ?method, "MFA verification succeeded");

        Ok(VerificationOutcome {
            method,
            backup_codes_remaining,
            device_token,
        })
    }

    /// Account MFA summary: enabled flag, unconsumed backup codes, active
    /// trusted devices.
    pub async fn status(&self, account_id: AccountId) -> Result<MfaStatus, MfaError> {
        let enabled = self.requires_second_factor(account_id).await?;
        if !enabled {
            return Ok(MfaStatus {
                enabled: false,
                backup_codes_remaining: 0,
                trusted_device_count: 0,
            });
        }

        Ok(MfaStatus {
            enabled: true,
            backup_codes_remaining: self.store.count_unconsumed_codes(account_id).await?,
            trusted_device_count: self.devices.count(account_id).await?,
        })
    }

    async fn verify_totp_candidate(
        &self,
        account_id: AccountId,
        credential: &MfaCredential,
        code: &str,
    ) -> Result<(), MfaError> {
        let secret = self
            .encryption
            .decrypt(&credential.secret_encrypted, &credential.nonce)?;

        if !otp::verify_totp(&secret, code, otp::unix_time_now()?)? {
            self.pending.record_failure(account_id);
            tracing::warn!(account_id = %account_id, "TOTP verification failed");
            return Err(MfaError::InvalidCode);
        }
        Ok(())
    }

    async fn consume_backup_candidate(
        &self,
        account_id: AccountId,
        code: &str,
    ) -> Result<i64, MfaError> {
        let hash = otp::hash_backup_code(code);
        match self.store.consume_backup_code(account_id, &hash).await? {
            ConsumeOutcome::Consumed => {
                let remaining = self.store.count_unconsumed_codes(account_id).await?;
                tracing::info!(
                    account_id = %account_id,
                    remaining,
                    "Backup code consumed"
                );
                Ok(remaining)
            }
            ConsumeOutcome::AlreadyUsed => {
                self.pending.record_failure(account_id);
                tracing::warn!(account_id = %account_id, "Replayed backup code rejected");
                Err(MfaError::AlreadyUsed)
            }
            ConsumeOutcome::NoMatch => {
                self.pending.record_failure(account_id);
                tracing::warn!(account_id = %account_id, "Backup code verification failed");
                Err(MfaError::InvalidCode)
            }
        }
    }
}
