//! Error types for the second-factor protocol.

use crate::crypto::SecretEncryptionError;
use crate::store::StoreError;
use thiserror::Error;

/// Failures of the MFA protocol layer.
///
/// Every variant except `RateLimited` is recoverable from the caller's
/// perspective: retry with correct input, or fall back to a backup code.
/// `RateLimited` is terminal for the current pending session and requires
/// the user to restart login.
#[derive(Debug, Error)]
pub enum MfaError {
    /// Password re-check failed (enrollment start, disable).
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// TOTP or backup code failed verification.
    #[error("Invalid verification code")]
    InvalidCode,

    /// The backup code was already consumed.
    #[error("Backup code already used")]
    AlreadyUsed,

    /// The submitted candidate does not match any known code shape.
    #[error("Code format not recognized")]
    InvalidFormat,

    /// Too many failed attempts within the pending session's window.
    #[error("Too many failed attempts")]
    RateLimited,

    /// Verification or disable attempted with no active credential.
    #[error("MFA is not enabled for this account")]
    NotEnrolled,

    /// Enrollment attempted while an active credential already exists.
    #[error("MFA is already enabled for this account")]
    AlreadyEnrolled,

    /// Presented device token is invalid, expired or unknown.
    #[error("Device is not trusted")]
    DeviceNotTrusted,

    /// Malformed input outside the code-candidate path (e.g. fingerprint).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The credential store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Encrypting or decrypting secret material failed.
    #[error("Encryption error: {0}")]
    Encryption(#[from] SecretEncryptionError),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MfaError {
    /// The message safe to show the end user.
    ///
    /// `InvalidCode`, `InvalidFormat` and `AlreadyUsed` collapse into one
    /// generic string so the response does not reveal which check failed.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidCode | Self::InvalidFormat | Self::AlreadyUsed => {
                "Invalid code. Please try again."
            }
            Self::RateLimited => {
                "Too many failed attempts. Please restart the login and wait before retrying."
            }
            Self::InvalidCredentials => "The password you entered is incorrect.",
            Self::NotEnrolled => "Two-factor authentication is not enabled for this account.",
            Self::AlreadyEnrolled => "Two-factor authentication is already enabled.",
            Self::DeviceNotTrusted => "This device is not recognized.",
            Self::Validation(_) => "The request was not valid.",
            Self::Store(_) | Self::Encryption(_) | Self::Internal(_) => {
                "Something went wrong. Please try again."
            }
        }
    }
}
