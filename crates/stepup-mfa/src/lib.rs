//! Second-factor protocol layer for stepup.
//!
//! This crate implements the MFA subsystem that sits behind an already
//! password-authenticated session:
//!
//! - TOTP enrollment: re-authenticate, provision a secret, confirm with a
//!   live code. Nothing is persisted until confirmation succeeds.
//! - Login verification: TOTP or single-use backup codes, with per-session
//!   attempt limiting.
//! - Trusted devices: bounded-lifetime tokens that exempt a recognized
//!   client from live verification.
//!
//! Persistence goes through the [`store::CredentialStore`] trait; the
//! engines never touch storage directly. A PostgreSQL backend
//! ([`store::PgCredentialStore`]) and an in-memory backend
//! ([`store::MemoryCredentialStore`]) are provided.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stepup_mfa::{
//!     DeviceService, EnrollmentService, MfaConfig, SecretEncryption, VerificationService,
//! };
//! use stepup_mfa::store::MemoryCredentialStore;
//!
//! let store = Arc::new(MemoryCredentialStore::new());
//! let encryption = SecretEncryption::from_env()?;
//! let config = MfaConfig::default();
//!
//! let devices = DeviceService::new(store.clone(), config.clone());
//! let enrollment = EnrollmentService::new(store.clone(), identity, encryption.clone(), config.clone());
//! let verification = VerificationService::new(store, devices.clone(), encryption, config);
//!
//! let started = enrollment.start_enrollment(account_id, password, "user@example.com").await?;
//! // ... user scans started.provisioning_uri, acknowledges started.backup_codes ...
//! enrollment
//!     .complete_enrollment(account_id, &started.secret_base32, &code, &started.backup_codes)
//!     .await?;
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod otp;
pub mod services;
pub mod store;

pub use config::MfaConfig;
pub use crypto::{SecretEncryption, SecretEncryptionError};
pub use error::MfaError;
pub use identity::{IdentityProvider, MockIdentityProvider};
pub use services::devices::{DeviceContext, DeviceService, TrustGrant};
pub use services::enrollment::{EnrollmentService, EnrollmentStarted};
pub use services::verification::{MfaStatus, VerificationOutcome, VerificationService, VerifiedMethod};
pub use store::{ConsumeOutcome, CredentialStore, MemoryCredentialStore, PgCredentialStore, StoreError};
