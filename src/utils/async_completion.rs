//! Long-running completion protocol
//!
//! Slow operations (video generation in particular) stream a sequence of
//! keep-alive frames followed by exactly one terminal frame: either the
//! result payload or an error. This module drives that protocol as a small
//! state machine over SSE frames.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use futures_util::{Stream, StreamExt};

use crate::error::GenError;
use crate::utils::cancel::CancelHandle;
use crate::utils::sse_stream::SseEvent;

/// State of one long-running request
///
/// Terminal states are absorbing: once reached, later frames are never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Streaming,
    Completed,
    Failed,
}

/// Error frame payload of the completion protocol
#[derive(Debug, Deserialize)]
struct CompletionErrorFrame {
    message: String,
    #[serde(rename = "errorType", alias = "code")]
    error_type: Option<String>,
    #[serde(rename = "statusCode")]
    status_code: Option<u16>,
    param: Option<String>,
}

/// Driver for the long-running completion protocol
pub struct AsyncCompletion {
    provider: String,
    cancel: Option<CancelHandle>,
}

impl AsyncCompletion {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Consume frames until a terminal frame and decode the result payload.
    ///
    /// Heartbeat and progress frames only signal liveness. The cancellation
    /// handle is checked before each frame read; on trigger the cancellation
    /// error returns immediately and partial state is discarded. Every exit
    /// releases the connection the same way: the frame stream is dropped.
    pub async fn run<R, S>(&self, frames: S) -> Result<R, GenError>
    where
        R: DeserializeOwned,
        S: Stream<Item = Result<SseEvent, GenError>> + Unpin,
    {
        let mut frames = frames;
        let mut state = CompletionState::Streaming;

        while state == CompletionState::Streaming {
            if let Some(cancel) = &self.cancel
                && cancel.is_cancelled()
            {
                return Err(GenError::Cancelled);
            }

            let Some(next) = frames.next().await else {
                break;
            };
            let frame = next?;
            if frame.is_done_sentinel() {
                break;
            }
            if frame.data.trim().is_empty() {
                continue;
            }

            let value: serde_json::Value = match serde_json::from_str(&frame.data) {
                Ok(value) => value,
                Err(e) => {
                    // Only terminal frames are allowed to fail the request
                    tracing::warn!(provider = %self.provider, "skipping malformed frame: {e}");
                    continue;
                }
            };

            match value.get("type").and_then(|t| t.as_str()) {
                Some("heartbeat") => {}
                Some("progress") => {
                    let percent = value.get("percent").and_then(|p| p.as_f64());
                    tracing::debug!(provider = %self.provider, percent, "generation progress");
                }
                Some("result") => {
                    state = CompletionState::Completed;
                    let result = serde_json::from_value(value).map_err(|e| {
                        GenError::ParseError(format!("malformed result frame: {e}"))
                    })?;
                    tracing::debug!(provider = %self.provider, ?state, "completion finished");
                    return Ok(result);
                }
                Some("error") => {
                    state = CompletionState::Failed;
                    let frame: CompletionErrorFrame = serde_json::from_value(value)
                        .map_err(|e| GenError::ParseError(format!("malformed error frame: {e}")))?;
                    tracing::debug!(provider = %self.provider, ?state, "completion failed");
                    return Err(GenError::ApiError {
                        status: frame.status_code.unwrap_or(500),
                        code: frame.error_type,
                        message: frame.message,
                        param: frame.param,
                        details: None,
                    });
                }
                other => {
                    tracing::debug!(provider = %self.provider, frame_type = ?other, "ignoring frame");
                }
            }
        }

        Err(GenError::StreamError(
            "generation ended without a completion frame".to_string(),
        ))
    }
}
