use std::future::Future;

use super::types::{Credential, FederatedUser, GoogleTokens, ProviderError};

/// Google sign-in SDK.
///
/// # Example
///
/// ```rust,ignore
/// impl GoogleSignIn for NativeGoogle {
///     type Context = Window;
///
///     async fn sign_in(&self, window: &Window) -> Result<GoogleTokens, ProviderError> {
///         let user = self.sdk.sign_in(window).await.map_err(map_sdk_error)?;
///         Ok(GoogleTokens {
///             id_token: user.id_token,
///             access_token: user.access_token,
///         })
///     }
///
///     fn sign_out(&self) {
///         self.sdk.sign_out();
///     }
/// }
/// ```
pub trait GoogleSignIn: Send + Sync + 'static {
    /// Whatever the SDK needs to present its UI.
    type Context: ?Sized + Sync;

    /// Run the interactive sign-in.
    fn sign_in(
        &self,
        context: &Self::Context,
    ) -> impl Future<Output = Result<GoogleTokens, ProviderError>> + Send;

    /// Forget the SDK's cached account.
    fn sign_out(&self);
}

/// Federated-auth service sitting between the providers and the backend.
///
/// Holds its own durable session, which is what lets a restarted process
/// skip the sign-in round trip.
pub trait FederatedAuth: Send + Sync + 'static {
    /// Sign in with a provider credential.
    fn sign_in(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<FederatedUser, ProviderError>> + Send;

    /// The persisted user, if a session survived from an earlier run.
    fn current_user(&self) -> Option<FederatedUser>;

    /// End the federated session.
    fn sign_out(&self) -> Result<(), ProviderError>;
}
