//! Secret and code generation.
//!
//! Pure, stateless logic: TOTP secrets, provisioning URIs, QR payloads and
//! single-use backup codes. Backup codes are generated independently of the
//! TOTP secret so compromise of one never compromises the other.

use crate::error::MfaError;
use data_encoding::BASE32_NOPAD;
use image::Luma;
use qrcode::QrCode;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};
use totp_rs::{Algorithm, TOTP};

/// TOTP secret length in bytes (160 bits).
pub const TOTP_SECRET_LENGTH: usize = 20;

/// Digits in a TOTP code.
pub const TOTP_DIGITS: usize = 6;

/// TOTP time step in seconds.
pub const TOTP_STEP_SECS: u64 = 30;

/// Accepted clock-drift tolerance, in steps, on each side of the current one.
pub const TOTP_SKEW_STEPS: u8 = 1;

/// Length of a backup code in characters.
pub const BACKUP_CODE_LENGTH: usize = 8;

/// Generate a new TOTP secret from the operating system's CSPRNG.
#[must_use]
pub fn generate_totp_secret() -> Vec<u8> {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut secret = vec![0u8; TOTP_SECRET_LENGTH];
    OsRng.fill_bytes(&mut secret[..]);
    secret
}

/// Base32-encode a raw secret for manual authenticator entry.
#[must_use]
pub fn secret_to_base32(secret: &[u8]) -> String {
    BASE32_NOPAD.encode(secret)
}

/// Decode a base32 secret issued by [`secret_to_base32`].
pub fn secret_from_base32(encoded: &str) -> Result<Vec<u8>, MfaError> {
    BASE32_NOPAD
        .decode(encoded.trim().as_bytes())
        .map_err(|e| MfaError::Internal(format!("malformed TOTP secret: {e}")))
}

fn build_totp(secret: &[u8], issuer: Option<String>, label: String) -> Result<TOTP, MfaError> {
    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW_STEPS,
        TOTP_STEP_SECS,
        secret.to_vec(),
        issuer,
        label,
    )
    .map_err(|e| MfaError::Internal(format!("TOTP construction failed: {e}")))
}

/// Build the `otpauth://` provisioning URI for a secret.
///
/// Deterministic formatting, no side effects; any QR renderer can consume
/// the result.
pub fn provisioning_uri(
    secret: &[u8],
    issuer: &str,
    account_label: &str,
) -> Result<String, MfaError> {
    let totp = build_totp(
        secret,
        Some(issuer.to_string()),
        account_label.to_string(),
    )?;
    Ok(totp.get_url())
}

/// Render a provisioning URI as a base64-encoded PNG QR code.
pub fn qr_code_base64(uri: &str) -> Result<String, MfaError> {
    let code = QrCode::new(uri.as_bytes())
        .map_err(|e| MfaError::Internal(format!("QR code generation failed: {e}")))?;

    let pixels = code.render::<Luma<u8>>().build();

    let mut png_bytes = Vec::new();
    let mut cursor = Cursor::new(&mut png_bytes);
    pixels
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| MfaError::Internal(format!("PNG encoding failed: {e}")))?;

    Ok(base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        &png_bytes,
    ))
}

/// Compute the 6-digit TOTP code for a secret at a given Unix time.
pub fn compute_totp(secret: &[u8], time: u64) -> Result<String, MfaError> {
    let totp = build_totp(secret, None, String::new())?;
    Ok(totp.generate(time))
}

/// Verify a candidate TOTP code at a given Unix time.
///
/// Accepts the current 30-second step plus one step on either side to
/// absorb clock drift; anything further is rejected, which bounds replay.
pub fn verify_totp(secret: &[u8], candidate: &str, time: u64) -> Result<bool, MfaError> {
    let totp = build_totp(secret, None, String::new())?;
    // totp-rs subtracts skew * step from the timestamp and underflows near
    // the epoch; clamping keeps step 0 inside the accepted window.
    let time = time.max(u64::from(TOTP_SKEW_STEPS) * TOTP_STEP_SECS);
    Ok(totp.check(candidate, time))
}

/// Current Unix time in seconds.
pub fn unix_time_now() -> Result<u64, MfaError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| MfaError::Internal(format!("system clock before Unix epoch: {e}")))
}

/// Generate a batch of backup codes.
///
/// Each code is 8 uppercase alphanumeric characters drawn independently
/// from the OS CSPRNG. Returns `(plaintext_codes, hashes)`; the plaintext
/// is shown to the user once and must never be logged or persisted.
#[must_use]
pub fn generate_backup_codes(count: usize) -> (Vec<String>, Vec<String>) {
    use rand::distributions::Alphanumeric;
    use rand::rngs::OsRng;
    use rand::Rng;

    let mut codes = Vec::with_capacity(count);
    let mut hashes = Vec::with_capacity(count);

    for _ in 0..count {
        let code: String = (0..BACKUP_CODE_LENGTH)
            .map(|_| OsRng.sample(Alphanumeric) as char)
            .collect::<String>()
            .to_uppercase();

        hashes.push(hash_backup_code(&code));
        codes.push(code);
    }

    (codes, hashes)
}

/// Hash a backup code with SHA-256 for storage.
#[must_use]
pub fn hash_backup_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_have_full_length_and_differ() {
        let s1 = generate_totp_secret();
        let s2 = generate_totp_secret();
        assert_eq!(s1.len(), TOTP_SECRET_LENGTH);
        assert_eq!(s2.len(), TOTP_SECRET_LENGTH);
        assert_ne!(s1, s2);
    }

    #[test]
    fn base32_roundtrip() {
        let secret = generate_totp_secret();
        let encoded = secret_to_base32(&secret);
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(secret_from_base32(&encoded).unwrap(), secret);
    }

    #[test]
    fn computed_code_verifies_at_same_time() {
        let secret = generate_totp_secret();
        for t in [0u64, 59, 1_000_000_000, 1_767_225_600] {
            let code = compute_totp(&secret, t).unwrap();
            assert_eq!(code.len(), TOTP_DIGITS);
            assert!(verify_totp(&secret, &code, t).unwrap());
        }
    }

    #[test]
    fn one_step_of_drift_is_tolerated() {
        let secret = generate_totp_secret();
        let t0 = 1_700_000_010;

        // Code computed one step late still verifies at t0.
        let late = compute_totp(&secret, t0 + 45).unwrap();
        assert!(verify_totp(&secret, &late, t0).unwrap());

        // And one step early.
        let early = compute_totp(&secret, t0 - 30).unwrap();
        assert!(verify_totp(&secret, &early, t0).unwrap());
    }

    #[test]
    fn codes_outside_the_window_are_rejected() {
        let secret = generate_totp_secret();
        let t0 = 1_700_000_010;

        let stale = compute_totp(&secret, t0 + 120).unwrap();
        assert!(!verify_totp(&secret, &stale, t0).unwrap());
    }

    #[test]
    fn verification_near_the_epoch_does_not_panic() {
        let secret = generate_totp_secret();

        let code = compute_totp(&secret, 0).unwrap();
        assert!(verify_totp(&secret, &code, 0).unwrap());
        assert!(verify_totp(&secret, &code, 29).unwrap());

        // Far-future codes stay rejected even with the clamped window.
        let future = compute_totp(&secret, 150).unwrap();
        assert!(!verify_totp(&secret, &future, 0).unwrap());
    }

    #[test]
    fn wrong_code_is_rejected() {
        let secret = generate_totp_secret();
        let t0 = 1_700_000_010;
        let valid = compute_totp(&secret, t0).unwrap();
        let wrong = if valid == "000000" { "000001" } else { "000000" };
        assert!(!verify_totp(&secret, wrong, t0).unwrap());
    }

    #[test]
    fn provisioning_uri_embeds_issuer_and_label() {
        let secret = generate_totp_secret();
        let uri = provisioning_uri(&secret, "Stepup", "user@example.com").unwrap();
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("Stepup"));
        assert!(uri.contains("user%40example.com"));
    }

    #[test]
    fn qr_code_renders_to_png() {
        let secret = generate_totp_secret();
        let uri = provisioning_uri(&secret, "Stepup", "user@example.com").unwrap();
        let png_b64 = qr_code_base64(&uri).unwrap();
        assert!(!png_b64.is_empty());

        let png = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &png_b64)
            .unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn backup_codes_have_fixed_shape() {
        let (codes, hashes) = generate_backup_codes(10);
        assert_eq!(codes.len(), 10);
        assert_eq!(hashes.len(), 10);

        for (code, hash) in codes.iter().zip(hashes.iter()) {
            assert_eq!(code.len(), BACKUP_CODE_LENGTH);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
            assert_eq!(&hash_backup_code(code), hash);
        }
    }

    #[test]
    fn backup_codes_are_independent_of_each_other() {
        let (codes, _) = generate_backup_codes(10);
        let mut unique = codes.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn backup_code_hash_is_stable_sha256() {
        let h1 = hash_backup_code("ABCD1234");
        let h2 = hash_backup_code("ABCD1234");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, hash_backup_code("ABCD1235"));
    }
}
