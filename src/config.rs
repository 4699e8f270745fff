use std::path::{Path, PathBuf};

use url::Url;

use crate::error::Error;

const DEFAULT_BASE_URL: &str = "https://api.apexvision.ai";

/// Free requests granted to an account before the backend reports otherwise.
pub const DEFAULT_FREE_REQUESTS: u32 = 10;

/// ApexVision client configuration.
///
/// Required fields are constructor parameters; everything else has a default.
///
/// ```rust,ignore
/// use apexvision_client::ClientConfig;
///
/// let config = ClientConfig::new("https://staging.apexvision.ai".parse()?)
///     .with_history_path("/var/lib/apex/chat_sessions.json");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) default_free_requests: u32,
    pub(crate) history_path: PathBuf,
    pub(crate) preferences_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL.parse().expect("valid default URL"))
    }
}

impl ClientConfig {
    /// Create a configuration pointing at `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            default_free_requests: DEFAULT_FREE_REQUESTS,
            history_path: PathBuf::from("chat_sessions.json"),
            preferences_path: PathBuf::from("preferences.json"),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Optional env vars
    /// - `APEXVISION_API_URL`: backend base URL
    /// - `APEXVISION_FREE_REQUESTS`: free allotment assumed while signed out
    /// - `APEXVISION_HISTORY_PATH`: chat history JSON file
    /// - `APEXVISION_PREFERENCES_PATH`: preferences JSON file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();

        if let Ok(url_str) = std::env::var("APEXVISION_API_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| Error::Config(format!("APEXVISION_API_URL: {e}")))?;
            config = config.with_base_url(url);
        }
        if let Ok(free) = std::env::var("APEXVISION_FREE_REQUESTS") {
            let free: u32 = free
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("APEXVISION_FREE_REQUESTS: {e}")))?;
            config = config.with_default_free_requests(free);
        }
        if let Ok(path) = std::env::var("APEXVISION_HISTORY_PATH") {
            config = config.with_history_path(path);
        }
        if let Ok(path) = std::env::var("APEXVISION_PREFERENCES_PATH") {
            config = config.with_preferences_path(path);
        }

        Ok(config)
    }

    /// Override the backend base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = url;
        self
    }

    /// Override the free allotment used for signed-out defaults (default: 10).
    #[must_use]
    pub fn with_default_free_requests(mut self, free: u32) -> Self {
        self.default_free_requests = free;
        self
    }

    #[must_use]
    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = path.into();
        self
    }

    #[must_use]
    pub fn with_preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = path.into();
        self
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn default_free_requests(&self) -> u32 {
        self.default_free_requests
    }

    /// Where archived chat sessions are written.
    #[must_use]
    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    #[must_use]
    pub fn preferences_path(&self) -> &Path {
        &self.preferences_path
    }
}
