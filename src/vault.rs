//! In-memory holder for the pending sign-in nonce and the current federated token.
//!
//! Nothing here is persisted. A sign-in left pending across a restart has to
//! start over, which is what a lost nonce forces.

use parking_lot::Mutex;

use crate::error::AuthError;

#[derive(Debug, Default)]
pub struct TokenVault {
    nonce: Mutex<Option<String>>,
    token: Mutex<Option<String>>,
}

impl TokenVault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly generated nonce, replacing any earlier pending one.
    pub fn store(&self, nonce: String) {
        *self.nonce.lock() = Some(nonce);
    }

    /// Takes the pending nonce. A nonce can be read exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NonceMissing`] when nothing is pending.
    pub fn consume_nonce(&self) -> Result<String, AuthError> {
        self.nonce.lock().take().ok_or(AuthError::NonceMissing)
    }

    #[must_use]
    pub fn has_pending_nonce(&self) -> bool {
        self.nonce.lock().is_some()
    }

    /// Records the provider-issued identity token of the last successful sign-in.
    pub fn set_token(&self, token: String) {
        *self.token.lock() = Some(token);
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    /// Drops both the pending nonce and the stored token.
    pub fn clear(&self) {
        self.nonce.lock().take();
        self.token.lock().take();
    }
}
