//! Cryptographic helpers for secret material at rest.

pub mod secret_encryption;

pub use secret_encryption::{SecretEncryption, SecretEncryptionError};
