//! Strongly typed identifiers.
//!
//! Newtype wrappers around [`Uuid`] so that account and device identifiers
//! cannot be swapped at a call site by accident.
//!
//! # Example
//!
//! ```
//! use stepup_core::{AccountId, DeviceId};
//!
//! fn requires_account(id: AccountId) -> String {
//!     id.to_string()
//! }
//!
//! let account = AccountId::new();
//! let _device = DeviceId::new();
//!
//! let rendered = requires_account(account);
//! // requires_account(_device); // does not compile
//! assert_eq!(rendered.len(), 36);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The underlying UUID parse error message.
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Consumes the ID, returning the underlying UUID.
            #[must_use]
            pub fn into_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Strongly typed identifier for the account that owns an MFA credential.
    ///
    /// # Example
    ///
    /// ```
    /// use stepup_core::AccountId;
    /// use uuid::Uuid;
    ///
    /// let uuid = Uuid::new_v4();
    /// let account_id = AccountId::from_uuid(uuid);
    /// assert_eq!(account_id.as_uuid(), &uuid);
    ///
    /// let parsed: AccountId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
    /// assert_eq!(parsed.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    /// ```
    AccountId
);

define_id!(
    /// Strongly typed identifier for a trusted device record.
    ///
    /// Identifies the stored record, not the opaque device token that a
    /// client presents at login.
    ///
    /// # Example
    ///
    /// ```
    /// use stepup_core::DeviceId;
    ///
    /// let device_id = DeviceId::new();
    /// println!("Device: {}", device_id);
    /// ```
    DeviceId
);
