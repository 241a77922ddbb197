//! Database entity models for stepup-db.
//!
//! These models represent the database tables and provide
//! type-safe interactions with PostgreSQL.

pub mod backup_code;
pub mod mfa_credential;
pub mod trusted_device;

pub use backup_code::BackupCode;
pub use mfa_credential::{MfaCredential, NewMfaCredential};
pub use trusted_device::{NewTrustedDevice, TrustedDevice};
