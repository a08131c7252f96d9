//! Anthropic streaming implementation
//!
//! Normalizes the block-event stream into canonical chunks. A
//! `content_block_start` of type `tool_use` establishes a tool call's
//! identity, `input_json_delta` frames accumulate its arguments, and
//! `content_block_stop` seals it. Usage is split across `message_start`
//! (input side) and `message_delta` (output side).

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::error::GenError;
use crate::stream::StreamChunk;
use crate::types::{FinishReason, Usage, UsageDetails};
use crate::utils::sse_stream::SseEvent;
use crate::utils::streaming::{EventBuilder, SseEventConverter, ToolCallAccumulator};

/// Anthropic stream event structure
///
/// Kept permissive: every field is optional so unknown event shapes fail
/// soft instead of aborting the stream.
#[derive(Debug, Clone, Deserialize)]
struct AnthropicStreamEvent {
    r#type: String,
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    message: Option<AnthropicMessage>,
    #[serde(default)]
    content_block: Option<AnthropicContentBlock>,
    #[serde(default)]
    delta: Option<AnthropicDelta>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
    #[serde(default)]
    error: Option<AnthropicError>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicMessage {
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicContentBlock {
    r#type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicDelta {
    #[serde(rename = "type")]
    #[serde(default)]
    delta_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    partial_json: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicError {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type")]
    #[serde(default)]
    error_type: Option<String>,
}

/// Event types whose decode failure aborts the stream
const TERMINAL_EVENTS: [&str; 3] = ["message_delta", "message_stop", "error"];

/// Anthropic event converter
#[derive(Clone, Default)]
pub struct AnthropicEventConverter {
    tool_calls: Arc<Mutex<ToolCallAccumulator>>,
    block_types: Arc<Mutex<std::collections::HashMap<usize, String>>>,
    usage: Arc<Mutex<AnthropicUsage>>,
}

impl AnthropicEventConverter {
    pub fn new() -> Self {
        Self::default()
    }

    fn convert_anthropic_event(&self, event: AnthropicStreamEvent) -> Vec<StreamChunk> {
        match event.r#type.as_str() {
            // Liveness only
            "ping" => vec![],
            "message_start" => {
                if let Some(usage) = event.message.and_then(|m| m.usage) {
                    self.merge_usage(usage);
                }
                vec![]
            }
            "content_block_start" => {
                let (Some(index), Some(block)) = (event.index, event.content_block) else {
                    return vec![];
                };
                if block.r#type == "tool_use" {
                    let id = block.id.unwrap_or_default();
                    let name = block.name.unwrap_or_default();
                    if !id.is_empty() && !name.is_empty()
                        && let Ok(mut acc) = self.tool_calls.lock()
                    {
                        acc.register(index.to_string(), id, name);
                    }
                }
                if let Ok(mut types) = self.block_types.lock() {
                    types.insert(index, block.r#type);
                }
                vec![]
            }
            "content_block_delta" => {
                let Some(delta) = event.delta else {
                    return vec![];
                };
                match delta.delta_type.as_deref() {
                    Some("text_delta") => EventBuilder::new()
                        .add_text(delta.text.unwrap_or_default())
                        .build(),
                    Some("thinking_delta") => EventBuilder::new()
                        .add_reasoning(delta.thinking.unwrap_or_default())
                        .build(),
                    Some("input_json_delta") => {
                        if let (Some(index), Some(partial)) = (event.index, delta.partial_json)
                            && !partial.is_empty()
                            && let Ok(mut acc) = self.tool_calls.lock()
                        {
                            acc.append(&index.to_string(), &partial);
                        }
                        vec![]
                    }
                    // signature_delta and future delta kinds carry nothing canonical
                    _ => vec![],
                }
            }
            "content_block_stop" => {
                let Some(index) = event.index else {
                    return vec![];
                };
                let block_type = self
                    .block_types
                    .lock()
                    .ok()
                    .and_then(|mut types| types.remove(&index));
                if block_type.as_deref() == Some("tool_use")
                    && let Ok(mut acc) = self.tool_calls.lock()
                    && let Some(chunk) = acc.seal(&index.to_string())
                {
                    return vec![chunk];
                }
                vec![]
            }
            "message_delta" => {
                if let Some(usage) = event.usage {
                    self.merge_usage(usage);
                }
                let Some(stop_reason) = event.delta.and_then(|d| d.stop_reason) else {
                    return vec![];
                };
                let reason = match stop_reason.as_str() {
                    "end_turn" | "stop_sequence" => FinishReason::Stop,
                    "max_tokens" => FinishReason::Length,
                    "tool_use" => FinishReason::ToolCalls,
                    "refusal" => FinishReason::ContentFilter,
                    other => FinishReason::Other {
                        raw: other.to_string(),
                    },
                };
                EventBuilder::new()
                    .add_finish(reason, Some(self.unified_usage()))
                    .build()
            }
            "message_stop" => EventBuilder::new()
                .add_finish(FinishReason::Stop, Some(self.unified_usage()))
                .build(),
            "error" => {
                let message = event
                    .error
                    .map(|e| {
                        let message = e.message.unwrap_or_else(|| "unknown error".to_string());
                        match e.error_type {
                            Some(kind) => format!("{kind}: {message}"),
                            None => message,
                        }
                    })
                    .unwrap_or_else(|| "provider reported a failure".to_string());
                vec![StreamChunk::Error { message }]
            }
            _ => vec![],
        }
    }

    fn merge_usage(&self, update: AnthropicUsage) {
        let Ok(mut usage) = self.usage.lock() else {
            return;
        };
        if update.input_tokens.is_some() {
            usage.input_tokens = update.input_tokens;
        }
        if update.output_tokens.is_some() {
            usage.output_tokens = update.output_tokens;
        }
        if update.cache_read_input_tokens.is_some() {
            usage.cache_read_input_tokens = update.cache_read_input_tokens;
        }
        if update.cache_creation_input_tokens.is_some() {
            usage.cache_creation_input_tokens = update.cache_creation_input_tokens;
        }
    }

    fn unified_usage(&self) -> Usage {
        let raw = self
            .usage
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default();
        let mut usage = Usage::new(
            raw.input_tokens.unwrap_or(0),
            raw.output_tokens.unwrap_or(0),
        );
        if raw.cache_read_input_tokens.is_some() || raw.cache_creation_input_tokens.is_some() {
            usage = usage.with_details(UsageDetails {
                cache_read_tokens: raw.cache_read_input_tokens,
                cache_write_tokens: raw.cache_creation_input_tokens,
                ..Default::default()
            });
        }
        usage
    }
}

impl SseEventConverter for AnthropicEventConverter {
    fn convert_event(
        &self,
        event: SseEvent,
    ) -> Pin<Box<dyn Future<Output = Vec<Result<StreamChunk, GenError>>> + Send + Sync + '_>> {
        Box::pin(async move {
            tracing::trace!("Anthropic SSE event: {}", event.data);
            match serde_json::from_str::<AnthropicStreamEvent>(&event.data) {
                Ok(anthropic_event) => self
                    .convert_anthropic_event(anthropic_event)
                    .into_iter()
                    .map(Ok)
                    .collect(),
                Err(e) => {
                    let event_type = event.event.as_deref().unwrap_or("");
                    if TERMINAL_EVENTS.contains(&event_type) {
                        return vec![Err(GenError::ParseError(format!(
                            "Failed to parse terminal Anthropic event `{event_type}`: {e}"
                        )))];
                    }
                    tracing::warn!("skipping malformed Anthropic event: {e}");
                    vec![]
                }
            }
        })
    }
}
