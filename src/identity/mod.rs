//! Sign-in with Apple or Google, converging on one backend identity exchange.
//!
//! ```rust,ignore
//! // Apple: begin, present the sheet, complete.
//! let request = broker.begin_apple_sign_in()?;
//! let result = present_apple_sheet(request.scopes, &request.nonce_digest).await;
//! let identity = broker.complete_apple_sign_in(result).await?;
//!
//! // Google: a single call.
//! let identity = broker.sign_in_with_google(&window).await?;
//! ```

mod traits;
mod types;

pub use traits::{FederatedAuth, GoogleSignIn};
pub use types::{
    AppleAuthorization, AppleScope, AppleSignInRequest, AuthState, Credential, FederatedUser,
    GoogleTokens, Identity, PersonName, ProviderError,
};

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::api::LoginRequest;
use crate::dispatch::Dispatcher;
use crate::entitlement::{EntitlementCache, UserDocumentStore};
use crate::error::AuthError;
use crate::nonce;
use crate::types::{Provider, UserId};
use crate::vault::TokenVault;

/// Owns the signed-in [`Identity`] and drives the authentication state machine.
///
/// The only writer of identity state. A successful exchange sets it, sign-out
/// clears it, and a failed attempt leaves it exactly as it was.
pub struct IdentityBroker<G, F, D> {
    dispatcher: Dispatcher,
    google: G,
    federated: F,
    entitlements: EntitlementCache<D>,
    vault: TokenVault,
    identity: RwLock<Option<Identity>>,
    state: RwLock<AuthState>,
    last_error: RwLock<Option<String>>,
    loading: AtomicBool,
}

impl<G, F, D> IdentityBroker<G, F, D>
where
    G: GoogleSignIn,
    F: FederatedAuth,
    D: UserDocumentStore,
{
    #[must_use]
    pub fn new(
        dispatcher: Dispatcher,
        google: G,
        federated: F,
        entitlements: EntitlementCache<D>,
    ) -> Self {
        Self {
            dispatcher,
            google,
            federated,
            entitlements,
            vault: TokenVault::new(),
            identity: RwLock::new(None),
            state: RwLock::new(AuthState::SignedOut),
            last_error: RwLock::new(None),
            loading: AtomicBool::new(false),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.read().clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.identity.read().clone()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.identity.read().as_ref().map(|i| i.user_id.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.read(), AuthState::Authenticated)
    }

    /// True while a sign-in attempt is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Human-readable message of the last failed attempt.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    #[must_use]
    pub fn entitlements(&self) -> &EntitlementCache<D> {
        &self.entitlements
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn vault(&self) -> &TokenVault {
        &self.vault
    }

    // ── Apple ─────────────────────────────────────────────────────

    /// Prepares an Apple authorization request.
    ///
    /// Generates and stores a fresh nonce; only its digest leaves the broker.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RandomSource`] if secure randomness is unavailable.
    pub fn begin_apple_sign_in(&self) -> Result<AppleSignInRequest, AuthError> {
        self.enter_authenticating();

        let raw = match nonce::generate_nonce(nonce::DEFAULT_NONCE_LENGTH) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "Secure random source unavailable");
                self.record_failure(&e);
                return Err(e);
            }
        };
        let nonce_digest = nonce::nonce_digest(&raw);
        self.vault.store(raw);

        Ok(AppleSignInRequest {
            scopes: vec![AppleScope::FullName, AppleScope::Email],
            nonce_digest,
        })
    }

    /// Finishes an Apple sign-in with the provider's result.
    ///
    /// The pending nonce is consumed whatever the outcome, so it can never be
    /// used twice.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ProviderCancelled`] / [`AuthError::Provider`] from the provider
    /// - [`AuthError::NonceMissing`] if no sign-in was begun (or it was already completed)
    /// - [`AuthError::ProviderDataMissing`] if the token is absent or not UTF-8
    /// - [`AuthError::ExchangeRejected`] / [`AuthError::Network`] from the backend exchange
    pub async fn complete_apple_sign_in(
        &self,
        result: Result<AppleAuthorization, ProviderError>,
    ) -> Result<Identity, AuthError> {
        self.enter_authenticating();
        let outcome = self.apple_flow(result).await;
        self.finish(outcome).await
    }

    async fn apple_flow(
        &self,
        result: Result<AppleAuthorization, ProviderError>,
    ) -> Result<Identity, AuthError> {
        let pending = self.vault.consume_nonce();
        let authorization = result?;
        let raw_nonce = pending?;

        let token = authorization
            .identity_token
            .ok_or(AuthError::ProviderDataMissing("identity token"))?;
        let id_token =
            String::from_utf8(token).map_err(|_| AuthError::ProviderDataMissing("identity token"))?;

        let credential = Credential::apple(id_token, raw_nonce);
        let user = self.federated.sign_in(&credential).await?;

        let email = user.email.or(authorization.email);
        let name = authorization
            .full_name
            .as_ref()
            .and_then(PersonName::display)
            .or(user.display_name);

        self.exchange(credential, email, name).await
    }

    // ── Google ────────────────────────────────────────────────────

    /// Runs the Google flow end to end.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ProviderCancelled`] / [`AuthError::Provider`] from the SDK or federated service
    /// - [`AuthError::ProviderDataMissing`] if the SDK returned no ID token
    /// - [`AuthError::ExchangeRejected`] / [`AuthError::Network`] from the backend exchange
    pub async fn sign_in_with_google(&self, context: &G::Context) -> Result<Identity, AuthError> {
        self.enter_authenticating();
        let outcome = self.google_flow(context).await;
        self.finish(outcome).await
    }

    async fn google_flow(&self, context: &G::Context) -> Result<Identity, AuthError> {
        let tokens = self.google.sign_in(context).await?;
        let id_token = tokens
            .id_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::ProviderDataMissing("ID token"))?;

        let credential = Credential::google(id_token, tokens.access_token);
        let user = self.federated.sign_in(&credential).await?;

        let mut identity = self.exchange(credential, None, None).await?;
        identity.email = user.email;
        identity.name = user.display_name;
        Ok(identity)
    }

    // ── Exchange ──────────────────────────────────────────────────

    /// Converts a credential into a backend user id.
    ///
    /// Email and name are only forwarded for Apple; the backend derives them
    /// itself for Google.
    async fn exchange(
        &self,
        credential: Credential,
        email: Option<String>,
        name: Option<String>,
    ) -> Result<Identity, AuthError> {
        let is_apple = credential.provider == Provider::Apple;
        let request = LoginRequest {
            id_token: credential.id_token.clone(),
            provider: is_apple.then(|| Provider::Apple.as_str()),
            email: if is_apple { email.clone() } else { None },
            name: if is_apple { name.clone() } else { None },
        };

        let response = self.dispatcher.exchange_identity(&request).await?;
        let user_id = response
            .user_id
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::ExchangeRejected)?;

        self.vault.set_token(credential.id_token);

        Ok(Identity {
            user_id: UserId(user_id),
            email,
            name,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────────

    /// Restores a session persisted by the federated service, without a new
    /// sign-in round trip.
    pub async fn check_persisted_session(&self) -> Option<Identity> {
        let Some(user) = self.federated.current_user() else {
            *self.state.write() = AuthState::SignedOut;
            return None;
        };

        let identity = Identity {
            user_id: UserId(user.uid),
            email: user.email,
            name: user.display_name,
        };
        tracing::info!(user_id = %identity.user_id, "Restored persisted session");
        *self.identity.write() = Some(identity);
        *self.state.write() = AuthState::Authenticated;

        self.refresh_entitlements().await;
        self.identity()
    }

    /// Ends the session: federated sign-out, then identity, vault and
    /// entitlements go back to signed-out defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] if the federated service refuses to sign
    /// out. Nothing is cleared in that case.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        if let Err(e) = self.federated.sign_out() {
            let e = AuthError::from(e);
            tracing::warn!(error = %e, "Federated sign-out failed");
            *self.last_error.write() = Some(e.to_string());
            return Err(e);
        }
        self.google.sign_out();

        *self.identity.write() = None;
        self.vault.clear();
        self.entitlements.reset();
        *self.state.write() = AuthState::SignedOut;
        *self.last_error.write() = None;

        tracing::info!("Signed out");
        Ok(())
    }

    /// Re-reads the signed-in user's entitlement record, best-effort.
    ///
    /// Profile fields present in the record overwrite the identity's.
    pub async fn refresh_entitlements(&self) {
        let Some(user_id) = self.user_id() else {
            return;
        };
        let Some(doc) = self.entitlements.refresh(&user_id).await else {
            return;
        };

        let mut guard = self.identity.write();
        if let Some(identity) = guard.as_mut().filter(|i| i.user_id == user_id) {
            if doc.email.is_some() {
                identity.email = doc.email;
            }
            if doc.name.is_some() {
                identity.name = doc.name;
            }
        }
    }

    // ── State machine ─────────────────────────────────────────────

    fn enter_authenticating(&self) {
        self.loading.store(true, Ordering::Release);
        *self.last_error.write() = None;
        *self.state.write() = AuthState::Authenticating;
    }

    /// A failed attempt on top of an existing session returns to
    /// `Authenticated`; the state never disagrees with the identity.
    fn record_failure(&self, e: &AuthError) {
        *self.last_error.write() = Some(e.to_string());
        *self.state.write() = if self.identity.read().is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Failed(e.clone())
        };
        self.loading.store(false, Ordering::Release);
    }

    async fn finish(&self, outcome: Result<Identity, AuthError>) -> Result<Identity, AuthError> {
        match outcome {
            Ok(identity) => {
                tracing::info!(user_id = %identity.user_id, "Signed in");
                *self.identity.write() = Some(identity.clone());
                *self.state.write() = AuthState::Authenticated;
                self.refresh_entitlements().await;
                self.loading.store(false, Ordering::Release);
                Ok(self.identity().unwrap_or(identity))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-in failed");
                self.record_failure(&e);
                Err(e)
            }
        }
    }
}
