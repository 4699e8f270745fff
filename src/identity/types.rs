use crate::error::AuthError;
use crate::types::{Provider, UserId};

/// Provider-issued credential for one sign-in attempt.
///
/// Built once per attempt and consumed by the backend exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub provider: Provider,
    pub id_token: String,
    /// Google only.
    pub access_token: Option<String>,
    /// Apple only: the raw nonce whose digest the provider signed.
    pub nonce: Option<String>,
}

impl Credential {
    #[must_use]
    pub fn google(id_token: String, access_token: String) -> Self {
        Self {
            provider: Provider::Google,
            id_token,
            access_token: Some(access_token),
            nonce: None,
        }
    }

    #[must_use]
    pub fn apple(id_token: String, nonce: String) -> Self {
        Self {
            provider: Provider::Apple,
            id_token,
            access_token: None,
            nonce: Some(nonce),
        }
    }
}

/// Authenticated user as known to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Where the broker is in the sign-in lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    Authenticating,
    Authenticated,
    /// Last attempt failed. Retrying re-enters `Authenticating`.
    Failed(AuthError),
}

/// Scopes requested from Apple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppleScope {
    FullName,
    Email,
}

/// What the caller hands to the Apple authorization sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppleSignInRequest {
    pub scopes: Vec<AppleScope>,
    /// Hex SHA-256 of the pending nonce.
    pub nonce_digest: String,
}

/// Person name as Apple reports it (first consent only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl PersonName {
    /// `"given family"`, trimmed; `None` when both parts are blank.
    #[must_use]
    pub fn display(&self) -> Option<String> {
        let full = format!(
            "{} {}",
            self.given_name.as_deref().unwrap_or_default(),
            self.family_name.as_deref().unwrap_or_default()
        );
        let full = full.trim();
        (!full.is_empty()).then(|| full.to_string())
    }
}

/// Successful Apple authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppleAuthorization {
    /// Raw identity token bytes; expected to be UTF-8.
    pub identity_token: Option<Vec<u8>>,
    pub email: Option<String>,
    pub full_name: Option<PersonName>,
}

/// Tokens returned by the Google SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleTokens {
    pub id_token: Option<String>,
    pub access_token: String,
}

/// User record of the federated-auth service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FederatedUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Failure reported by a provider SDK or the federated-auth service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("cancelled by user")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}

impl From<ProviderError> for AuthError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Cancelled => Self::ProviderCancelled,
            ProviderError::Failed(msg) => Self::Provider(msg),
        }
    }
}
