//! In-memory credential store.
//!
//! Backs tests and single-process deployments. One mutex guards all three
//! tables so the multi-row operations (enrollment commit, disable, code
//! replacement) are atomic, matching the transactional guarantees of the
//! Postgres backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use stepup_core::{AccountId, DeviceId};
use stepup_db::{BackupCode, MfaCredential, NewMfaCredential, NewTrustedDevice, TrustedDevice};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::{ConsumeOutcome, CredentialStore, StoreError};

#[derive(Default)]
struct Tables {
    credentials: HashMap<Uuid, MfaCredential>,
    backup_codes: HashMap<Uuid, Vec<BackupCode>>,
    devices: HashMap<Uuid, Vec<TrustedDevice>>,
}

/// A [`CredentialStore`] that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryCredentialStore {
    tables: Mutex<Tables>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn hashes_equal(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_credential(
        &self,
        account_id: AccountId,
    ) -> Result<Option<MfaCredential>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables.credentials.get(&account_id.into_uuid()).cloned())
    }

    async fn commit_enrollment(
        &self,
        credential: NewMfaCredential,
        code_hashes: &[String],
    ) -> Result<MfaCredential, StoreError> {
        let now = Utc::now();
        let row = MfaCredential {
            id: Uuid::new_v4(),
            account_id: credential.account_id,
            secret_encrypted: credential.secret_encrypted,
            nonce: credential.nonce,
            is_enabled: true,
            enrolled_at: now,
            last_used_at: None,
            created_at: now,
        };

        let codes = code_hashes
            .iter()
            .map(|hash| BackupCode {
                id: Uuid::new_v4(),
                account_id: row.account_id,
                code_hash: hash.clone(),
                consumed_at: None,
                created_at: now,
            })
            .collect();

        let mut tables = self.tables.lock();
        tables.credentials.insert(row.account_id, row.clone());
        tables.backup_codes.insert(row.account_id, codes);
        Ok(row)
    }

    async fn record_credential_use(&self, account_id: AccountId) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if let Some(credential) = tables.credentials.get_mut(&account_id.into_uuid()) {
            credential.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn remove_credential(
        &self,
        account_id: AccountId,
        revoke_devices: bool,
    ) -> Result<bool, StoreError> {
        let account = account_id.into_uuid();
        let mut tables = self.tables.lock();
        let removed = tables.credentials.remove(&account).is_some();
        tables.backup_codes.remove(&account);
        if revoke_devices {
            tables.devices.remove(&account);
        }
        Ok(removed)
    }

    async fn consume_backup_code(
        &self,
        account_id: AccountId,
        code_hash: &str,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut tables = self.tables.lock();
        let Some(codes) = tables.backup_codes.get_mut(&account_id.into_uuid()) else {
            return Ok(ConsumeOutcome::NoMatch);
        };

        for code in codes.iter_mut() {
            if hashes_equal(&code.code_hash, code_hash) {
                if code.is_consumed() {
                    return Ok(ConsumeOutcome::AlreadyUsed);
                }
                code.consumed_at = Some(Utc::now());
                return Ok(ConsumeOutcome::Consumed);
            }
        }
        Ok(ConsumeOutcome::NoMatch)
    }

    async fn count_unconsumed_codes(&self, account_id: AccountId) -> Result<i64, StoreError> {
        let tables = self.tables.lock();
        let count = tables
            .backup_codes
            .get(&account_id.into_uuid())
            .map_or(0, |codes| codes.iter().filter(|c| !c.is_consumed()).count());
        Ok(count as i64)
    }

    async fn replace_backup_codes(
        &self,
        account_id: AccountId,
        code_hashes: &[String],
    ) -> Result<(), StoreError> {
        let account = account_id.into_uuid();
        let now = Utc::now();
        let codes = code_hashes
            .iter()
            .map(|hash| BackupCode {
                id: Uuid::new_v4(),
                account_id: account,
                code_hash: hash.clone(),
                consumed_at: None,
                created_at: now,
            })
            .collect();

        let mut tables = self.tables.lock();
        tables.backup_codes.insert(account, codes);
        Ok(())
    }

    async fn insert_trusted_device(
        &self,
        device: NewTrustedDevice,
    ) -> Result<TrustedDevice, StoreError> {
        let row = TrustedDevice {
            id: Uuid::new_v4(),
            account_id: device.account_id,
            token_hash: device.token_hash,
            device_fingerprint: device.device_fingerprint,
            ip_address: device.ip_address,
            trusted_at: Utc::now(),
            expires_at: device.expires_at,
            revoked_at: None,
        };

        let mut tables = self.tables.lock();
        tables
            .devices
            .entry(row.account_id)
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn find_trusted_device(
        &self,
        account_id: AccountId,
        token_hash: &str,
    ) -> Result<Option<TrustedDevice>, StoreError> {
        let tables = self.tables.lock();
        let found = tables
            .devices
            .get(&account_id.into_uuid())
            .and_then(|devices| {
                devices
                    .iter()
                    .find(|d| d.is_active() && hashes_equal(&d.token_hash, token_hash))
            })
            .cloned();
        Ok(found)
    }

    async fn list_trusted_devices(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<TrustedDevice>, StoreError> {
        let tables = self.tables.lock();
        let mut devices: Vec<TrustedDevice> = tables
            .devices
            .get(&account_id.into_uuid())
            .map(|devices| devices.iter().filter(|d| d.is_active()).cloned().collect())
            .unwrap_or_default();
        devices.sort_by(|a, b| b.trusted_at.cmp(&a.trusted_at));
        Ok(devices)
    }

    async fn count_trusted_devices(&self, account_id: AccountId) -> Result<i64, StoreError> {
        let tables = self.tables.lock();
        let count = tables
            .devices
            .get(&account_id.into_uuid())
            .map_or(0, |devices| devices.iter().filter(|d| d.is_active()).count());
        Ok(count as i64)
    }

    async fn revoke_trusted_device(
        &self,
        account_id: AccountId,
        device_id: DeviceId,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock();
        let Some(devices) = tables.devices.get_mut(&account_id.into_uuid()) else {
            return Ok(false);
        };

        for device in devices.iter_mut() {
            if device.id == device_id.into_uuid() && device.revoked_at.is_none() {
                device.revoked_at = Some(Utc::now());
                return Ok(true);
            }
        }
        Ok(false)
    }
}
