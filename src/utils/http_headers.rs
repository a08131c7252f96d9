//! Shared HTTP header helpers

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Attach a per-request id so provider-side logs can be correlated with
/// client traces.
pub fn inject_request_id(headers: &mut HeaderMap) {
    let request_id = uuid::Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(HeaderName::from_static("x-request-id"), value);
    }
    tracing::debug!(request_id, "outgoing request");
}
