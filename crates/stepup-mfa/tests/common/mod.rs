//! Shared fixtures for the integration suites: a full service stack over the
//! in-memory store and mock identity provider.

#![allow(dead_code)]

use std::sync::Arc;

use stepup_core::AccountId;
use stepup_mfa::store::MemoryCredentialStore;
use stepup_mfa::{
    DeviceContext, DeviceService, EnrollmentService, MfaConfig, MockIdentityProvider,
    SecretEncryption, VerificationService,
};

pub const PASSWORD: &str = "correct horse battery staple";

pub struct Harness {
    pub store: Arc<MemoryCredentialStore>,
    pub identity: Arc<MockIdentityProvider>,
    pub enrollment: EnrollmentService,
    pub verification: VerificationService,
    pub devices: DeviceService,
    pub config: MfaConfig,
}

pub fn harness() -> Harness {
    harness_with_config(MfaConfig::default())
}

pub fn harness_with_config(config: MfaConfig) -> Harness {
    let store = Arc::new(MemoryCredentialStore::new());
    let identity = Arc::new(MockIdentityProvider::new());
    let encryption =
        SecretEncryption::from_hex_key(&SecretEncryption::generate_key()).unwrap();

    let devices = DeviceService::new(store.clone(), config.clone());
    let enrollment = EnrollmentService::new(
        store.clone(),
        identity.clone(),
        encryption.clone(),
        config.clone(),
    );
    let verification = VerificationService::new(
        store.clone(),
        devices.clone(),
        encryption,
        config.clone(),
    );

    Harness {
        store,
        identity,
        enrollment,
        verification,
        devices,
        config,
    }
}

/// Register an account and walk it through the full enrollment flow.
/// Returns the plaintext backup codes and the base32 secret.
pub async fn enroll(harness: &Harness, account: AccountId) -> (Vec<String>, String) {
    harness.identity.set_password(account, PASSWORD);

    let started = harness
        .enrollment
        .start_enrollment(account, PASSWORD, "user@example.com")
        .await
        .unwrap();

    let code = current_code(&started.secret_base32);
    harness
        .enrollment
        .complete_enrollment(account, &started.secret_base32, &code, &started.backup_codes)
        .await
        .unwrap();

    (started.backup_codes, started.secret_base32)
}

/// The TOTP code valid right now for a base32 secret.
pub fn current_code(secret_base32: &str) -> String {
    let secret = stepup_mfa::otp::secret_from_base32(secret_base32).unwrap();
    let now = stepup_mfa::otp::unix_time_now().unwrap();
    stepup_mfa::otp::compute_totp(&secret, now).unwrap()
}

/// A six-digit code guaranteed to differ from `valid`.
pub fn wrong_code(valid: &str) -> String {
    if valid == "000000" {
        "000001".to_string()
    } else {
        "000000".to_string()
    }
}

/// A well-formed device context with a SHA-256-shaped fingerprint.
pub fn device_context() -> DeviceContext {
    DeviceContext {
        fingerprint: "ab".repeat(32),
        ip_address: Some("203.0.113.7".to_string()),
    }
}
