//! Integration tests for the trusted device registry.

mod common;

use chrono::{Duration, Utc};
use common::{device_context, harness};
use stepup_core::{AccountId, DeviceId};
use stepup_db::NewTrustedDevice;
use stepup_mfa::services::devices::hash_device_token;
use stepup_mfa::store::CredentialStore;
use stepup_mfa::{DeviceContext, MfaError};

#[tokio::test]
async fn trust_returns_a_usable_token() {
    let h = harness();
    let account = AccountId::new();

    let grant = h.devices.trust(account, &device_context()).await.unwrap();
    assert_eq!(grant.token.len(), 43);
    assert!(grant.device.expires_at > grant.device.trusted_at);

    assert!(h.devices.is_trusted(account, &grant.token).await.unwrap());
    assert!(!h.devices.is_trusted(account, "not-a-real-token").await.unwrap());
}

#[tokio::test]
async fn token_is_scoped_to_the_granting_account() {
    let h = harness();
    let alice = AccountId::new();
    let bob = AccountId::new();

    let grant = h.devices.trust(alice, &device_context()).await.unwrap();
    assert!(h.devices.is_trusted(alice, &grant.token).await.unwrap());
    assert!(!h.devices.is_trusted(bob, &grant.token).await.unwrap());
}

#[tokio::test]
async fn trust_rejects_malformed_fingerprints() {
    let h = harness();
    let account = AccountId::new();

    let too_long = "ab".repeat(100);
    let not_hex = "ZZ".repeat(16);
    for fingerprint in ["", "abcd", not_hex.as_str(), too_long.as_str()] {
        let err = h
            .devices
            .trust(
                account,
                &DeviceContext {
                    fingerprint: fingerprint.to_string(),
                    ip_address: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MfaError::Validation(_)));
    }
    assert_eq!(h.devices.count(account).await.unwrap(), 0);
}

#[tokio::test]
async fn list_shows_active_devices_newest_first() {
    let h = harness();
    let account = AccountId::new();

    let first = h.devices.trust(account, &device_context()).await.unwrap();
    let second = h.devices.trust(account, &device_context()).await.unwrap();

    let listed = h.devices.list(account).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.device.id);
    assert_eq!(listed[1].id, first.device.id);
    assert_eq!(h.devices.count(account).await.unwrap(), 2);
}

#[tokio::test]
async fn revoke_takes_effect_immediately() {
    let h = harness();
    let account = AccountId::new();

    let grant = h.devices.trust(account, &device_context()).await.unwrap();
    let device_id = DeviceId::from_uuid(grant.device.id);

    h.devices.revoke(account, device_id).await.unwrap();
    assert!(!h.devices.is_trusted(account, &grant.token).await.unwrap());
    assert!(h.devices.list(account).await.unwrap().is_empty());

    // Revoking an already-revoked device is indistinguishable from revoking
    // an unknown one.
    let err = h.devices.revoke(account, device_id).await.unwrap_err();
    assert!(matches!(err, MfaError::DeviceNotTrusted));
    let err = h.devices.revoke(account, DeviceId::new()).await.unwrap_err();
    assert!(matches!(err, MfaError::DeviceNotTrusted));
}

#[tokio::test]
async fn expired_device_behaves_like_an_absent_one() {
    let h = harness();
    let account = AccountId::new();

    // Inserted directly so the expiry can sit in the past: trusted 31 days
    // ago with a 30-day window.
    let token = "opaque-device-token";
    h.store
        .insert_trusted_device(NewTrustedDevice {
            account_id: account.into_uuid(),
            token_hash: hash_device_token(token),
            device_fingerprint: "ab".repeat(32),
            ip_address: None,
            expires_at: Utc::now() - Duration::days(1),
        })
        .await
        .unwrap();

    assert!(!h.devices.is_trusted(account, token).await.unwrap());
    let err = h.devices.require_trusted(account, token).await.unwrap_err();
    assert!(matches!(err, MfaError::DeviceNotTrusted));
    assert!(h.devices.list(account).await.unwrap().is_empty());
    assert_eq!(h.devices.count(account).await.unwrap(), 0);
}

#[tokio::test]
async fn device_within_window_is_still_trusted() {
    let h = harness();
    let account = AccountId::new();

    // Trusted 29 days ago with a 30-day window: one day of trust left.
    let token = "opaque-device-token";
    h.store
        .insert_trusted_device(NewTrustedDevice {
            account_id: account.into_uuid(),
            token_hash: hash_device_token(token),
            device_fingerprint: "ab".repeat(32),
            ip_address: None,
            expires_at: Utc::now() + Duration::days(1),
        })
        .await
        .unwrap();

    assert!(h.devices.is_trusted(account, token).await.unwrap());
    let found = h.devices.require_trusted(account, token).await.unwrap();
    assert!(found.is_active());
}
