//! Consumed identity/session interface.
//!
//! The primary-credential system is an external collaborator: this crate
//! never touches passwords or session tokens beyond these two calls.

use crate::error::MfaError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use stepup_core::AccountId;

/// The identity system this subsystem layers a second factor on top of.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Re-validate the account's current password.
    ///
    /// Guards enrollment start and disable against a hijacked but still
    /// logged-in session. This is the only password-touching boundary.
    async fn re_authenticate(&self, account_id: AccountId, password: &str)
        -> Result<bool, MfaError>;

    /// Issue the primary session token once the login orchestrator has
    /// cleared the second factor (verification passed or device trusted).
    async fn issue_session_token(&self, account_id: AccountId) -> Result<String, MfaError>;
}

/// In-memory identity provider for tests and examples.
#[derive(Default)]
pub struct MockIdentityProvider {
    passwords: Mutex<HashMap<AccountId, String>>,
}

impl MockIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account's password.
    pub fn set_password(&self, account_id: AccountId, password: &str) {
        self.passwords.lock().insert(account_id, password.to_string());
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn re_authenticate(
        &self,
        account_id: AccountId,
        password: &str,
    ) -> Result<bool, MfaError> {
        Ok(self
            .passwords
            .lock()
            .get(&account_id)
            .is_some_and(|stored| stored == password))
    }

    async fn issue_session_token(&self, account_id: AccountId) -> Result<String, MfaError> {
        Ok(format!("session-{account_id}"))
    }
}
