use std::{fmt, path::PathBuf};

use bon::Builder;
use unify_ox_common::{AuthMethod, RequestConfig};

use crate::UnifyError;

/// Production API root.
pub const BASE_URL: &str = "https://api.unify.ai/v0";
/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "UNIFY_KEY";
/// Environment variable overriding [`BASE_URL`].
pub const BASE_URL_ENV: &str = "UNIFY_BASE_URL";
/// Default location of the local response cache, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = ".cache.json";

/// Connection settings handed to every client.
#[derive(Clone, Builder)]
pub struct ApiConfig {
    #[builder(into)]
    api_key: String,

    #[builder(default = BASE_URL.to_string(), into)]
    base_url: String,

    #[builder(default = PathBuf::from(DEFAULT_CACHE_FILE), into)]
    cache_path: PathBuf,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    /// Read the key from `UNIFY_KEY` and the base URL from `UNIFY_BASE_URL`.
    pub fn from_env() -> Result<Self, UnifyError> {
        Self::resolve(None)
    }

    /// Use `api_key` when given, otherwise fall back to the environment.
    pub fn resolve(api_key: Option<String>) -> Result<Self, UnifyError> {
        let api_key = api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
            .ok_or(UnifyError::MissingApiKey)?;
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| BASE_URL.to_string());

        Ok(Self::builder().api_key(api_key).base_url(base_url).build())
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_cache_path(mut self, cache_path: impl Into<PathBuf>) -> Self {
        self.cache_path = cache_path.into();
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache_path(&self) -> &std::path::Path {
        &self.cache_path
    }

    pub(crate) fn request_config(&self) -> RequestConfig {
        RequestConfig::new(&self.base_url)
            .with_auth(AuthMethod::Bearer(self.api_key.clone()))
            .with_header("accept", "application/json")
            .with_user_agent(concat!("unify-ox/", env!("CARGO_PKG_VERSION")))
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("cache_path", &self.cache_path)
            .finish()
    }
}
