//! PostgreSQL persistence for the stepup MFA subsystem.
//!
//! One module per table, with `sqlx::FromRow` structs and executor-generic
//! async methods. Callers compose these inside transactions when a flow
//! needs atomicity (enrollment commit, backup-code consumption, disable).
//!
//! # Example
//!
//! ```rust,ignore
//! use stepup_db::{connect, run_migrations, MfaCredential};
//!
//! let pool = connect("postgres://localhost/stepup").await?;
//! run_migrations(&pool).await?;
//!
//! let credential = MfaCredential::find_by_account(&pool, account_id).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use models::backup_code::BackupCode;
pub use models::mfa_credential::{MfaCredential, NewMfaCredential};
pub use models::trusted_device::{NewTrustedDevice, TrustedDevice};
pub use pool::connect;
