use crate::policy::QuotaVerdict;

/// Crate-level error returned by the [`ApexClient`](crate::ApexClient) facade.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Request limit reached for your plan")]
    QuotaExceeded(QuotaVerdict),
    /// 2xx response whose payload reports a failure.
    #[error("{0}")]
    Backend(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures of the sign-in flows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The user dismissed the provider sheet.
    #[error("Sign-in was cancelled")]
    ProviderCancelled,

    /// The provider reported success but a required field was absent or unreadable.
    #[error("Unable to read {0} from the identity provider")]
    ProviderDataMissing(&'static str),

    /// A completion arrived without a matching begin, or the nonce was already used.
    #[error("Invalid state: a login callback was received, but no login request was sent")]
    NonceMissing,

    /// The backend answered without a `user_id`.
    #[error("The server did not accept the sign-in")]
    ExchangeRejected,

    /// Provider SDK or federated-auth failure other than cancellation.
    #[error("{0}")]
    Provider(String),

    /// Transport, status or decode failure during the identity exchange.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The operating system could not supply secure random bytes.
    #[error("Unable to generate nonce: {0}")]
    RandomSource(String),
}

/// Outcome classification of a [`Dispatcher`](crate::Dispatcher) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Server error: {0}")]
    Server(u16),
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Local persistence and user-document failures.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("User document error: {0}")]
    Backend(String),
    #[error("No session with id {0}")]
    SessionNotFound(crate::types::SessionId),
}
