//! Error types for the omnigen library
//!
//! Provides the crate-wide error enum, the canonical timeout error, and the
//! timeout classifier applied at every network call boundary.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the omnigen library
#[derive(Error, Debug)]
pub enum GenError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Connection-level failure (DNS, TLS, refused, reset)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Canonical timeout error, see [`TimeoutError`]
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// Error reported by the provider API
    #[error("API error {status}: {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Machine-readable error code when the provider supplies one
        code: Option<String>,
        /// Human-readable message
        message: String,
        /// Offending parameter, if the provider names one
        param: Option<String>,
        /// Raw error body for programmatic inspection
        details: Option<serde_json::Value>,
    },

    /// Response parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Streaming protocol error
    #[error("Stream error: {0}")]
    StreamError(String),

    /// The stream was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Client/provider configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Invalid request parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation not supported by this provider
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// API key missing from configuration and environment
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GenError {
    /// Create an API error with only a status code and message.
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            code: None,
            message: message.into(),
            param: None,
            details: None,
        }
    }

    /// HTTP status associated with this error, when one exists.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            Self::Timeout(_) => Some(TimeoutError::STATUS_CODE),
            _ => None,
        }
    }

    /// Whether this error is (or wraps) a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_)) || is_timeout_error(self)
    }
}

impl From<reqwest::Error> for GenError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            return Self::ConnectionError(err.to_string());
        }
        // Timeouts keep their "timed out" message here and are converted to
        // the canonical shape by `classify_timeout` at the call boundary,
        // which knows which provider was being addressed.
        Self::HttpError(err.to_string())
    }
}

/// Canonical timeout error
///
/// All timeouts observed at network boundaries are converted into this shape
/// so callers can branch on a single variant regardless of where in the
/// transport stack the deadline fired. Always reported as HTTP 408.
#[derive(Error, Debug)]
#[error("request to {provider} timed out{}: {message}", fmt_duration(.duration))]
pub struct TimeoutError {
    /// Provider the request was addressed to
    pub provider: String,
    /// Elapsed deadline, when known
    pub duration: Option<Duration>,
    /// Message including the fixed troubleshooting guidance
    pub message: String,
    /// Underlying error that was classified as a timeout
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

fn fmt_duration(duration: &Option<Duration>) -> String {
    match duration {
        Some(d) => format!(" after {d:?}"),
        None => String::new(),
    }
}

/// Troubleshooting guidance attached to every canonical timeout error.
pub const TIMEOUT_GUIDANCE: &str = "the configured deadline is likely too short for this \
    operation; set a longer timeout on the calling side. Media generation (video, image) \
    routinely takes minutes and needs a much longer deadline than chat completions";

impl TimeoutError {
    /// Status code carried by every canonical timeout error.
    pub const STATUS_CODE: u16 = 408;

    /// Wrap an underlying error that was classified as a timeout.
    pub fn from_cause(
        provider: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self {
            provider: provider.into(),
            duration: None,
            message: TIMEOUT_GUIDANCE.to_string(),
            source: Some(source),
        }
    }

    /// Timeout with a known elapsed deadline (e.g. from `tokio::time::timeout`).
    pub fn elapsed(provider: impl Into<String>, duration: Duration) -> Self {
        Self {
            provider: provider.into(),
            duration: Some(duration),
            message: TIMEOUT_GUIDANCE.to_string(),
            source: None,
        }
    }
}

/// Message fragments that identify a timeout regardless of the transport that
/// produced it. Matched case-sensitively on every error in the source chain.
const TIMEOUT_MARKERS: [&str; 5] = [
    "context deadline exceeded",
    "timeout",
    "timed out",
    "deadline exceeded",
    "i/o timeout",
];

/// Check whether `err` or any error it wraps is a timeout.
///
/// Walks the `source()` chain one level at a time with no depth limit,
/// testing for elapsed-deadline error types and for the fixed message
/// fragments in [`TIMEOUT_MARKERS`].
pub fn is_timeout_error(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<TimeoutError>().is_some()
            || e.downcast_ref::<tokio::time::error::Elapsed>().is_some()
        {
            return true;
        }
        if let Some(r) = e.downcast_ref::<reqwest::Error>()
            && r.is_timeout()
        {
            return true;
        }
        let message = e.to_string();
        if TIMEOUT_MARKERS.iter().any(|m| message.contains(m)) {
            return true;
        }
        current = e.source();
    }
    false
}

/// Convert timeouts into the canonical [`TimeoutError`]; pass everything
/// else through unchanged.
///
/// Idempotent: an error that is already `GenError::Timeout` is returned
/// as-is. Applied at every network call boundary that can legitimately
/// exceed a short default deadline.
pub fn classify_timeout(err: GenError, provider: &str) -> GenError {
    match err {
        GenError::Timeout(_) => err,
        other if other.is_timeout() => {
            tracing::debug!(provider, "classified error as timeout: {other}");
            GenError::Timeout(TimeoutError::from_cause(provider, Box::new(other)))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("{message}")]
    struct Wrapper {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    }

    fn deadline_error() -> Wrapper {
        Wrapper {
            message: "context deadline exceeded".into(),
            source: None,
        }
    }

    #[test]
    fn detects_direct_deadline_error() {
        assert!(is_timeout_error(&deadline_error()));
    }

    #[test]
    fn detects_deeply_wrapped_deadline_error() {
        let wrapped = Wrapper {
            message: "request failed".into(),
            source: Some(Box::new(Wrapper {
                message: "transport broke".into(),
                source: Some(Box::new(Wrapper {
                    message: "socket closed".into(),
                    source: Some(Box::new(deadline_error())),
                })),
            })),
        };
        assert!(is_timeout_error(&wrapped));
    }

    #[test]
    fn rejects_unrelated_error() {
        let err = Wrapper {
            message: "connection refused".into(),
            source: None,
        };
        assert!(!is_timeout_error(&err));
    }

    #[test]
    fn marker_match_is_case_sensitive() {
        let err = Wrapper {
            message: "Request TIMED OUT".into(),
            source: None,
        };
        assert!(!is_timeout_error(&err));
    }

    #[test]
    fn classify_wraps_timeout_messages() {
        let err = GenError::StreamError("read tcp: i/o timeout".into());
        let classified = classify_timeout(err, "openai");
        match classified {
            GenError::Timeout(t) => {
                assert_eq!(t.provider, "openai");
                assert!(t.message.contains("longer deadline"));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[test]
    fn classify_is_idempotent() {
        let once = classify_timeout(
            GenError::StreamError("operation timed out".into()),
            "anthropic",
        );
        let provider_before = match &once {
            GenError::Timeout(t) => t.provider.clone(),
            other => panic!("expected Timeout, got {other:?}"),
        };
        let twice = classify_timeout(once, "minimax");
        match twice {
            GenError::Timeout(t) => assert_eq!(t.provider, provider_before),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[test]
    fn classify_passes_through_unrelated_errors() {
        let err = classify_timeout(GenError::api_error(429, "rate limited"), "openai");
        assert!(matches!(err, GenError::ApiError { status: 429, .. }));
    }

    #[test]
    fn timeout_status_code_is_408() {
        let err = GenError::Timeout(TimeoutError::elapsed("openai", Duration::from_secs(30)));
        assert_eq!(err.status_code(), Some(408));
    }
}
