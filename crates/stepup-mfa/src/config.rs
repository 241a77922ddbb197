//! Protocol policy configuration.

use std::time::Duration;

/// Number of backup codes generated per batch.
pub const DEFAULT_BACKUP_CODE_COUNT: usize = 10;

/// Maximum failed verification attempts per pending session.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Lifetime of a pending MFA session in seconds.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 600;

/// Trusted-device lifetime in days.
pub const DEFAULT_TRUST_DURATION_DAYS: i64 = 30;

/// Policy knobs for the MFA subsystem.
#[derive(Debug, Clone)]
pub struct MfaConfig {
    /// Issuer label embedded in provisioning URIs.
    pub issuer: String,
    /// Backup codes generated per batch.
    pub backup_code_count: usize,
    /// Failed attempts tolerated within a pending session before the
    /// session fails closed.
    pub max_attempts: usize,
    /// How long a pending session (and its attempt window) lives.
    pub session_ttl: Duration,
    /// How long a trusted device stays exempt from live verification.
    pub trust_duration_days: i64,
    /// Whether disabling MFA also deletes the account's trusted devices.
    pub revoke_devices_on_disable: bool,
}

impl Default for MfaConfig {
    fn default() -> Self {
        Self {
            issuer: "Stepup".to_string(),
            backup_code_count: DEFAULT_BACKUP_CODE_COUNT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            trust_duration_days: DEFAULT_TRUST_DURATION_DAYS,
            revoke_devices_on_disable: true,
        }
    }
}

impl MfaConfig {
    /// Build a config from environment variables, falling back to defaults.
    ///
    /// Recognized variables: `MFA_ISSUER`, `MFA_MAX_ATTEMPTS`,
    /// `MFA_SESSION_TTL_SECS`, `MFA_TRUST_DURATION_DAYS`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(issuer) = std::env::var("MFA_ISSUER") {
            config.issuer = issuer;
        }
        if let Some(max) = env_parse::<usize>("MFA_MAX_ATTEMPTS") {
            config.max_attempts = max;
        }
        if let Some(secs) = env_parse::<u64>("MFA_SESSION_TTL_SECS") {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(days) = env_parse::<i64>("MFA_TRUST_DURATION_DAYS") {
            config.trust_duration_days = days;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
