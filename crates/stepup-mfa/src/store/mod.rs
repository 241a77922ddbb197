//! Credential persistence seam.
//!
//! The [`CredentialStore`] trait owns all persistence of credentials,
//! backup codes and trusted devices. The enrollment and verification
//! engines operate through it exclusively, which is what allows swapping
//! storage backends without touching protocol logic.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use stepup_core::{AccountId, DeviceId};
use stepup_db::{MfaCredential, NewMfaCredential, NewTrustedDevice, TrustedDevice};
use thiserror::Error;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Failures of a credential store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of attempting to consume a backup code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The code was valid and is now consumed.
    Consumed,
    /// The code matched a stored hash that was already consumed.
    AlreadyUsed,
    /// No stored code matches.
    NoMatch,
}

/// Persistence operations for the MFA subsystem.
///
/// Atomicity contract: `commit_enrollment` and `remove_credential` are
/// all-or-nothing, and `consume_backup_code` is a single compare-and-set —
/// two concurrent submissions of the same code yield exactly one
/// [`ConsumeOutcome::Consumed`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up the credential for an account.
    async fn find_credential(
        &self,
        account_id: AccountId,
    ) -> Result<Option<MfaCredential>, StoreError>;

    /// Atomically write the confirmed credential and its backup-code batch.
    async fn commit_enrollment(
        &self,
        credential: NewMfaCredential,
        code_hashes: &[String],
    ) -> Result<MfaCredential, StoreError>;

    /// Record a successful verification.
    async fn record_credential_use(&self, account_id: AccountId) -> Result<(), StoreError>;

    /// Atomically delete the credential, all backup codes, and (when
    /// `revoke_devices` is set) all trusted devices.
    ///
    /// Returns false if no credential existed.
    async fn remove_credential(
        &self,
        account_id: AccountId,
        revoke_devices: bool,
    ) -> Result<bool, StoreError>;

    /// Consume a backup code by hash (compare-and-set on the consumed flag).
    async fn consume_backup_code(
        &self,
        account_id: AccountId,
        code_hash: &str,
    ) -> Result<ConsumeOutcome, StoreError>;

    /// Count unconsumed backup codes.
    async fn count_unconsumed_codes(&self, account_id: AccountId) -> Result<i64, StoreError>;

    /// Atomically replace the whole backup-code batch.
    async fn replace_backup_codes(
        &self,
        account_id: AccountId,
        code_hashes: &[String],
    ) -> Result<(), StoreError>;

    /// Record a newly trusted device.
    async fn insert_trusted_device(
        &self,
        device: NewTrustedDevice,
    ) -> Result<TrustedDevice, StoreError>;

    /// Find an active (unrevoked, unexpired) trusted device by token hash.
    /// Expired and absent rows are both `None`.
    async fn find_trusted_device(
        &self,
        account_id: AccountId,
        token_hash: &str,
    ) -> Result<Option<TrustedDevice>, StoreError>;

    /// List active trusted devices.
    async fn list_trusted_devices(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<TrustedDevice>, StoreError>;

    /// Count active trusted devices.
    async fn count_trusted_devices(&self, account_id: AccountId) -> Result<i64, StoreError>;

    /// Revoke a trusted device. Returns false if no active record matched.
    async fn revoke_trusted_device(
        &self,
        account_id: AccountId,
        device_id: DeviceId,
    ) -> Result<bool, StoreError>;
}
