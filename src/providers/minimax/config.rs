//! MiniMax provider configuration

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::GenError;

pub const DEFAULT_BASE_URL: &str = "https://api.minimax.io/v1";

/// How long a cached account snapshot stays fresh
pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(300);

/// Configuration for the MiniMax client
#[derive(Debug, Clone)]
pub struct MinimaxConfig {
    pub api_key: SecretString,
    pub base_url: String,
    /// Staleness window for the account metadata/credit cache
    pub metadata_ttl: Duration,
}

impl MinimaxConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            metadata_ttl: DEFAULT_METADATA_TTL,
        }
    }

    /// Read the API key from `MINIMAX_API_KEY`.
    pub fn from_env() -> Result<Self, GenError> {
        let api_key = std::env::var("MINIMAX_API_KEY")
            .map_err(|_| GenError::MissingApiKey("MINIMAX_API_KEY is not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_metadata_ttl(mut self, ttl: Duration) -> Self {
        self.metadata_ttl = ttl;
        self
    }

    pub(crate) fn headers(&self) -> Result<HeaderMap, GenError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        crate::utils::http_headers::inject_request_id(&mut headers);
        let bearer = format!("Bearer {}", self.api_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| GenError::ConfigurationError(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }
}
