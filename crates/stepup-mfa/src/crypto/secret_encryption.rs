//! TOTP secret encryption using AES-256-GCM.
//!
//! Secrets are never persisted in the clear; the store receives only the
//! ciphertext and the per-encryption nonce.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

/// Size of the AES-256 key in bytes.
const KEY_SIZE: usize = 32;

/// Size of the GCM nonce in bytes.
const NONCE_SIZE: usize = 12;

/// Errors that can occur while encrypting or decrypting secrets.
#[derive(Debug, Error)]
pub enum SecretEncryptionError {
    #[error("Encryption key not configured (MFA_ENCRYPTION_KEY environment variable)")]
    KeyNotConfigured,

    #[error("Invalid encryption key length: expected {KEY_SIZE} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Invalid nonce length: expected {NONCE_SIZE} bytes, got {0}")]
    InvalidNonceLength(usize),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Authenticated encryption of TOTP secrets at rest.
#[derive(Clone)]
pub struct SecretEncryption {
    cipher: Aes256Gcm,
}

impl SecretEncryption {
    /// Create an instance from the `MFA_ENCRYPTION_KEY` environment variable.
    ///
    /// The key must be exactly 32 bytes (256 bits), hex-encoded.
    pub fn from_env() -> Result<Self, SecretEncryptionError> {
        let key_hex = std::env::var("MFA_ENCRYPTION_KEY")
            .map_err(|_| SecretEncryptionError::KeyNotConfigured)?;

        Self::from_hex_key(&key_hex)
    }

    /// Create an instance from a hex-encoded key string.
    pub fn from_hex_key(key_hex: &str) -> Result<Self, SecretEncryptionError> {
        let key_bytes = hex::decode(key_hex.trim())
            .map_err(|e| SecretEncryptionError::InvalidKeyFormat(e.to_string()))?;

        Self::from_key(&key_bytes)
    }

    /// Create an instance from raw key bytes.
    pub fn from_key(key: &[u8]) -> Result<Self, SecretEncryptionError> {
        if key.len() != KEY_SIZE {
            return Err(SecretEncryptionError::InvalidKeyLength(key.len()));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| SecretEncryptionError::InvalidKeyFormat(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// Encrypt a secret. Returns `(ciphertext, nonce)`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>), SecretEncryptionError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| SecretEncryptionError::EncryptionFailed(e.to_string()))?;

        Ok((ciphertext, nonce_bytes.to_vec()))
    }

    /// Decrypt a secret produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>, SecretEncryptionError> {
        if nonce.len() != NONCE_SIZE {
            return Err(SecretEncryptionError::InvalidNonceLength(nonce.len()));
        }

        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| SecretEncryptionError::DecryptionFailed(e.to_string()))
    }

    /// Generate a fresh random key, hex-encoded, for initial deployment.
    #[must_use]
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }
}

impl std::fmt::Debug for SecretEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEncryption")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> Vec<u8> {
        (0u8..32).collect()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let encryption = SecretEncryption::from_key(&test_key()).unwrap();
        let plaintext = b"JBSWY3DPEHPK3PXP";

        let (ciphertext, nonce) = encryption.encrypt(plaintext).unwrap();
        assert_ne!(ciphertext, plaintext.to_vec());

        let decrypted = encryption.decrypt(&ciphertext, &nonce).unwrap();
        assert_eq!(decrypted, plaintext.to_vec());
    }

    #[test]
    fn nonces_are_unique_per_encryption() {
        let encryption = SecretEncryption::from_key(&test_key()).unwrap();

        let (c1, n1) = encryption.encrypt(b"secret").unwrap();
        let (c2, n2) = encryption.encrypt(b"secret").unwrap();

        assert_ne!(n1, n2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let encryption = SecretEncryption::from_key(&test_key()).unwrap();
        let (ciphertext, nonce) = encryption.encrypt(b"secret").unwrap();

        let mut other_key = test_key();
        other_key[0] ^= 0xFF;
        let other = SecretEncryption::from_key(&other_key).unwrap();

        assert!(matches!(
            other.decrypt(&ciphertext, &nonce),
            Err(SecretEncryptionError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn rejects_short_key() {
        assert!(matches!(
            SecretEncryption::from_key(&[0u8; 16]),
            Err(SecretEncryptionError::InvalidKeyLength(16))
        ));
    }

    #[test]
    fn rejects_short_nonce() {
        let encryption = SecretEncryption::from_key(&test_key()).unwrap();
        let (ciphertext, _) = encryption.encrypt(b"secret").unwrap();

        assert!(matches!(
            encryption.decrypt(&ciphertext, &[0u8; 8]),
            Err(SecretEncryptionError::InvalidNonceLength(8))
        ));
    }

    #[test]
    fn generated_keys_are_valid_and_distinct() {
        let k1 = SecretEncryption::generate_key();
        let k2 = SecretEncryption::generate_key();

        assert_eq!(k1.len(), 64);
        assert_ne!(k1, k2);
        assert!(SecretEncryption::from_hex_key(&k1).is_ok());
    }

    #[test]
    fn debug_redacts_cipher() {
        let encryption = SecretEncryption::from_key(&test_key()).unwrap();
        assert!(format!("{encryption:?}").contains("REDACTED"));
    }
}
