use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::NetworkError;
use crate::types::UserId;

/// Header carrying the durable identity on authenticated calls.
pub const USER_ID_HEADER: &str = "UserId";

/// Stateless executor for JSON calls against the ApexVision backend.
///
/// Each call is independent; any number may be in flight at once. The
/// dispatcher knows nothing about quota. Callers refresh entitlements
/// themselves after a quota-consuming call succeeds.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    base_url: Url,
    http: reqwest::Client,
}

impl Dispatcher {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an endpoint path such as `/math`.
    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Executes one request and decodes the JSON response into `R`.
    ///
    /// When `user_id` is present it is sent in the [`USER_ID_HEADER`] header.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::Transport`] if the request never completed
    /// - [`NetworkError::Server`] for any non-2xx status; the body is not read
    /// - [`NetworkError::Decode`] if the body is not JSON of the expected shape
    ///
    /// # Panics
    ///
    /// Panics if `body` fails to serialize. Request bodies are plain structs,
    /// so that would be a bug in the caller.
    pub async fn execute<B, R>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&B>,
        user_id: Option<&UserId>,
    ) -> Result<R, NetworkError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint);
        tracing::debug!(%method, endpoint, authenticated = user_id.is_some(), "Dispatching request");

        let mut request = self
            .http
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(user_id) = user_id {
            request = request.header(USER_ID_HEADER, user_id.as_str());
        }

        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).expect("request body serializes to JSON");
            request = request.body(bytes);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(endpoint, status = status.as_u16(), "Request failed");
            return Err(NetworkError::Server(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| NetworkError::Decode(e.to_string()))
    }

    /// `GET` with no body.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn get<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        user_id: Option<&UserId>,
    ) -> Result<R, NetworkError> {
        self.execute::<(), R>(endpoint, Method::GET, None, user_id)
            .await
    }

    /// `POST` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn post<B, R>(
        &self,
        endpoint: &str,
        body: &B,
        user_id: Option<&UserId>,
    ) -> Result<R, NetworkError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.execute(endpoint, Method::POST, Some(body), user_id)
            .await
    }
}
