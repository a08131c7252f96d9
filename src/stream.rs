//! Canonical generation stream types
//!
//! Every provider's streaming endpoint is normalized into a sequence of
//! [`StreamChunk`] values. The stream is pull-based: the provider connection
//! advances only when the caller requests the next chunk.

use std::pin::Pin;

use futures::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::types::{ChatResponse, FinishReason, ResponseMetadata, ToolCall, Usage};

/// One unit of a normalized, provider-agnostic generation stream
///
/// The variant set is closed. A well-formed sequence is ordered and ends in
/// `Finish` or `Error` (or is terminated by an error item from the stream
/// itself).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamChunk {
    /// Incremental text content
    Text { text: String },
    /// Incremental reasoning/thinking content
    Reasoning { text: String },
    /// A sealed tool call with fully accumulated, parsed arguments
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// Terminal chunk: canonical finish reason plus final usage when known
    Finish {
        reason: FinishReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    /// Advisory mid-stream usage update
    Usage { usage: Usage },
    /// Terminal chunk for an explicit provider error frame
    Error { message: String },
}

impl StreamChunk {
    /// Whether this chunk terminates the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. } | Self::Error { .. })
    }
}

/// Generation stream — the main interface for streaming responses
///
/// A pinned, boxed stream yielding `StreamChunk` items. All providers
/// implement streaming by returning this type.
pub type GenerationStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, GenError>> + Send>>;

/// Drain a stream into a unified [`ChatResponse`].
///
/// Text and reasoning deltas are concatenated, tool calls collected, and the
/// finish chunk supplies reason and usage. Mid-stream usage updates are kept
/// only until a finish-attached usage replaces them.
pub async fn collect_response(
    mut stream: GenerationStream,
    metadata: ResponseMetadata,
) -> Result<ChatResponse, GenError> {
    let mut content = String::new();
    let mut reasoning = String::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();
    let mut finish_reason = None;
    let mut usage: Option<Usage> = None;

    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::Text { text } => content.push_str(&text),
            StreamChunk::Reasoning { text } => reasoning.push_str(&text),
            StreamChunk::ToolCall {
                id,
                name,
                arguments,
            } => tool_calls.push(ToolCall {
                id,
                name,
                arguments,
            }),
            StreamChunk::Usage { usage: update } => usage = Some(update),
            StreamChunk::Finish {
                reason,
                usage: final_usage,
            } => {
                finish_reason = Some(reason);
                if final_usage.is_some() {
                    usage = final_usage;
                }
                break;
            }
            StreamChunk::Error { message } => {
                return Err(GenError::StreamError(message));
            }
        }
    }

    Ok(ChatResponse {
        content,
        reasoning: (!reasoning.is_empty()).then_some(reasoning),
        tool_calls,
        finish_reason,
        usage,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ResponseMetadata {
        ResponseMetadata {
            id: None,
            model: None,
            created: None,
            provider: "test".to_string(),
            request_id: None,
        }
    }

    #[test]
    fn chunk_tags_are_stable() {
        let chunk = StreamChunk::ToolCall {
            id: "c1".into(),
            name: "shell".into(),
            arguments: serde_json::json!({}),
        };
        let value = serde_json::to_value(&chunk).expect("encode");
        assert_eq!(value["type"], "tool-call");

        let value = serde_json::to_value(StreamChunk::Finish {
            reason: FinishReason::Stop,
            usage: None,
        })
        .expect("encode");
        assert_eq!(value["type"], "finish");
    }

    #[tokio::test]
    async fn collect_concatenates_deltas_and_stops_at_finish() {
        let chunks: Vec<Result<StreamChunk, GenError>> = vec![
            Ok(StreamChunk::Text {
                text: "Hello, ".into(),
            }),
            Ok(StreamChunk::Text {
                text: "world".into(),
            }),
            Ok(StreamChunk::Finish {
                reason: FinishReason::Stop,
                usage: Some(Usage::new(3, 5)),
            }),
        ];
        let stream: GenerationStream = Box::pin(futures::stream::iter(chunks));
        let response = collect_response(stream, metadata()).await.expect("collect");
        assert_eq!(response.content, "Hello, world");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(8));
    }

    #[tokio::test]
    async fn collect_surfaces_error_chunks() {
        let chunks: Vec<Result<StreamChunk, GenError>> = vec![
            Ok(StreamChunk::Text { text: "par".into() }),
            Ok(StreamChunk::Error {
                message: "overloaded".into(),
            }),
        ];
        let stream: GenerationStream = Box::pin(futures::stream::iter(chunks));
        let err = collect_response(stream, metadata()).await.unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }
}
