//! Stepup core library.
//!
//! Shared types for the stepup MFA subsystem.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (`AccountId`, `DeviceId`)
//!
//! # Example
//!
//! ```
//! use stepup_core::{AccountId, DeviceId};
//!
//! let account_id = AccountId::new();
//! let device_id = DeviceId::new();
//! assert_ne!(account_id.to_string(), device_id.to_string());
//! ```

pub mod ids;

pub use ids::{AccountId, DeviceId, ParseIdError};
