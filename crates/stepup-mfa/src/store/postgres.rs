//! PostgreSQL credential store.
//!
//! Thin transactional layer over the `stepup-db` models. Multi-table
//! operations run inside a single transaction; single-row operations hit the
//! pool directly.

use async_trait::async_trait;
use sqlx::PgPool;
use stepup_core::{AccountId, DeviceId};
use stepup_db::{BackupCode, MfaCredential, NewMfaCredential, NewTrustedDevice, TrustedDevice};

use super::{ConsumeOutcome, CredentialStore, StoreError};

/// A [`CredentialStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_credential(
        &self,
        account_id: AccountId,
    ) -> Result<Option<MfaCredential>, StoreError> {
        Ok(MfaCredential::find_by_account(&self.pool, account_id.into_uuid()).await?)
    }

    async fn commit_enrollment(
        &self,
        credential: NewMfaCredential,
        code_hashes: &[String],
    ) -> Result<MfaCredential, StoreError> {
        let mut tx = self.pool.begin().await?;

        let account = credential.account_id;
        let row = MfaCredential::create(&mut *tx, credential).await?;
        BackupCode::create_batch(&mut *tx, account, code_hashes).await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn record_credential_use(&self, account_id: AccountId) -> Result<(), StoreError> {
        Ok(MfaCredential::record_use(&self.pool, account_id.into_uuid()).await?)
    }

    async fn remove_credential(
        &self,
        account_id: AccountId,
        revoke_devices: bool,
    ) -> Result<bool, StoreError> {
        let account = account_id.into_uuid();
        let mut tx = self.pool.begin().await?;

        BackupCode::delete_all_for_account(&mut *tx, account).await?;
        if revoke_devices {
            TrustedDevice::delete_all_for_account(&mut *tx, account).await?;
        }
        let removed = MfaCredential::delete(&mut *tx, account).await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn consume_backup_code(
        &self,
        account_id: AccountId,
        code_hash: &str,
    ) -> Result<ConsumeOutcome, StoreError> {
        let account = account_id.into_uuid();
        if BackupCode::consume(&self.pool, account, code_hash).await? {
            return Ok(ConsumeOutcome::Consumed);
        }
        // The compare-and-set missed: either the code was already consumed
        // (possibly by a concurrent request) or it never existed.
        if BackupCode::exists(&self.pool, account, code_hash).await? {
            Ok(ConsumeOutcome::AlreadyUsed)
        } else {
            Ok(ConsumeOutcome::NoMatch)
        }
    }

    async fn count_unconsumed_codes(&self, account_id: AccountId) -> Result<i64, StoreError> {
        Ok(BackupCode::count_unconsumed(&self.pool, account_id.into_uuid()).await?)
    }

    async fn replace_backup_codes(
        &self,
        account_id: AccountId,
        code_hashes: &[String],
    ) -> Result<(), StoreError> {
        let account = account_id.into_uuid();
        let mut tx = self.pool.begin().await?;

        BackupCode::delete_all_for_account(&mut *tx, account).await?;
        BackupCode::create_batch(&mut *tx, account, code_hashes).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_trusted_device(
        &self,
        device: NewTrustedDevice,
    ) -> Result<TrustedDevice, StoreError> {
        Ok(TrustedDevice::create(&self.pool, device).await?)
    }

    async fn find_trusted_device(
        &self,
        account_id: AccountId,
        token_hash: &str,
    ) -> Result<Option<TrustedDevice>, StoreError> {
        Ok(TrustedDevice::find_active_by_token_hash(
            &self.pool,
            account_id.into_uuid(),
            token_hash,
        )
        .await?)
    }

    async fn list_trusted_devices(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<TrustedDevice>, StoreError> {
        Ok(TrustedDevice::list_active(&self.pool, account_id.into_uuid()).await?)
    }

    async fn count_trusted_devices(&self, account_id: AccountId) -> Result<i64, StoreError> {
        Ok(TrustedDevice::count_active(&self.pool, account_id.into_uuid()).await?)
    }

    async fn revoke_trusted_device(
        &self,
        account_id: AccountId,
        device_id: DeviceId,
    ) -> Result<bool, StoreError> {
        Ok(TrustedDevice::revoke(
            &self.pool,
            account_id.into_uuid(),
            device_id.into_uuid(),
        )
        .await?)
    }
}
