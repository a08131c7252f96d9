//! OpenAI streaming implementation
//!
//! Normalizes the Responses-API event stream into canonical chunks. Tool
//! calls arrive as an `output_item.added` frame (establishing call id and
//! name), a series of `function_call_arguments.delta` frames, and a
//! `function_call_arguments.done` frame that seals the accumulated
//! arguments.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::error::GenError;
use crate::stream::StreamChunk;
use crate::types::{FinishReason, Usage, UsageDetails};
use crate::utils::sse_stream::SseEvent;
use crate::utils::streaming::{EventBuilder, SseEventConverter, ToolCallAccumulator};

/// Event types that finish the stream; a frame of one of these kinds that
/// cannot be decoded is a fatal error rather than a skip.
const TERMINAL_EVENTS: [&str; 3] = ["response.completed", "response.incomplete", "response.failed"];

/// OpenAI event converter
#[derive(Clone, Default)]
pub struct OpenAiEventConverter {
    tool_calls: Arc<Mutex<ToolCallAccumulator>>,
    /// Set once any tool call has been sealed; drives the finish reason
    saw_tool_call: Arc<Mutex<bool>>,
}

impl OpenAiEventConverter {
    pub fn new() -> Self {
        Self::default()
    }

    fn convert_openai_event(&self, event_type: &str, json: &serde_json::Value) -> Vec<StreamChunk> {
        match event_type {
            "response.output_text.delta" => EventBuilder::new()
                .add_text(str_field(json, "delta").to_string())
                .build(),
            "response.reasoning_text.delta" | "response.reasoning_summary_text.delta" => {
                EventBuilder::new()
                    .add_reasoning(str_field(json, "delta").to_string())
                    .build()
            }
            "response.output_item.added" => {
                // Establishes the tool call's identity before any arguments
                if let Some(item) = json.get("item")
                    && item.get("type").and_then(|t| t.as_str()) == Some("function_call")
                {
                    let item_id = str_field(item, "id");
                    let call_id = item
                        .get("call_id")
                        .and_then(|c| c.as_str())
                        .filter(|c| !c.is_empty())
                        .unwrap_or(item_id);
                    let name = str_field(item, "name");
                    if !item_id.is_empty()
                        && let Ok(mut acc) = self.tool_calls.lock()
                    {
                        acc.register(item_id, call_id, name);
                    }
                }
                vec![]
            }
            "response.function_call_arguments.delta" => {
                let item_id = str_field(json, "item_id");
                let delta = str_field(json, "delta");
                if !item_id.is_empty()
                    && !delta.is_empty()
                    && let Ok(mut acc) = self.tool_calls.lock()
                {
                    acc.append(item_id, delta);
                }
                vec![]
            }
            "response.function_call_arguments.done" => self.seal(str_field(json, "item_id")),
            "response.output_item.done" => {
                // Covers gateways that never send an explicit arguments.done;
                // a second seal for the same item is a no-op
                match json.get("item") {
                    Some(item) if item.get("type").and_then(|t| t.as_str()) == Some("function_call") => {
                        self.seal(str_field(item, "id"))
                    }
                    _ => vec![],
                }
            }
            "response.completed" | "response.incomplete" => {
                let response = json.get("response").unwrap_or(json);
                let usage = response.get("usage").map(extract_usage);
                let reason = self.finish_reason(response);
                EventBuilder::new().add_finish(reason, usage).build()
            }
            "response.failed" | "error" => {
                let message = json
                    .pointer("/response/error/message")
                    .or_else(|| json.pointer("/error/message"))
                    .or_else(|| json.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("provider reported a failure")
                    .to_string();
                vec![StreamChunk::Error { message }]
            }
            // created / in_progress / *.done text frames and anything new
            // from the provider carry no canonical content
            _ => vec![],
        }
    }

    fn seal(&self, item_id: &str) -> Vec<StreamChunk> {
        if item_id.is_empty() {
            return vec![];
        }
        let sealed = self
            .tool_calls
            .lock()
            .ok()
            .and_then(|mut acc| acc.seal(item_id));
        match sealed {
            Some(chunk) => {
                if let Ok(mut saw) = self.saw_tool_call.lock() {
                    *saw = true;
                }
                vec![chunk]
            }
            None => vec![],
        }
    }

    fn finish_reason(&self, response: &serde_json::Value) -> FinishReason {
        if let Some(reason) = response
            .pointer("/incomplete_details/reason")
            .and_then(|r| r.as_str())
        {
            return match reason {
                "max_output_tokens" => FinishReason::Length,
                "content_filter" => FinishReason::ContentFilter,
                other => FinishReason::Other {
                    raw: other.to_string(),
                },
            };
        }
        if self.saw_tool_call.lock().map(|s| *s).unwrap_or(false) {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        }
    }

}

fn str_field<'a>(json: &'a serde_json::Value, field: &str) -> &'a str {
    json.get(field).and_then(|v| v.as_str()).unwrap_or("")
}

pub(crate) fn extract_usage(usage: &serde_json::Value) -> Usage {
    let input_tokens = u64_field(usage, "input_tokens");
    let output_tokens = u64_field(usage, "output_tokens");
    let cached = usage
        .pointer("/input_tokens_details/cached_tokens")
        .and_then(|v| v.as_u64());
    let reasoning = usage
        .pointer("/output_tokens_details/reasoning_tokens")
        .and_then(|v| v.as_u64());

    let mut unified = Usage::new(input_tokens, output_tokens);
    if cached.is_some() || reasoning.is_some() {
        unified = unified.with_details(UsageDetails {
            cache_read_tokens: cached,
            reasoning_tokens: reasoning,
            no_cache_tokens: cached.map(|c| input_tokens.saturating_sub(c)),
            ..Default::default()
        });
    }
    unified
}

fn u64_field(json: &serde_json::Value, field: &str) -> u64 {
    json.get(field).and_then(|v| v.as_u64()).unwrap_or(0)
}

impl SseEventConverter for OpenAiEventConverter {
    fn convert_event(
        &self,
        event: SseEvent,
    ) -> Pin<Box<dyn Future<Output = Vec<Result<StreamChunk, GenError>>> + Send + Sync + '_>> {
        Box::pin(async move {
            let json: serde_json::Value = match serde_json::from_str(&event.data) {
                Ok(json) => json,
                Err(e) => {
                    let event_type = event.event.as_deref().unwrap_or("");
                    if TERMINAL_EVENTS.contains(&event_type) {
                        return vec![Err(GenError::ParseError(format!(
                            "Failed to parse terminal OpenAI event `{event_type}`: {e}"
                        )))];
                    }
                    tracing::warn!("skipping malformed OpenAI event: {e}");
                    return vec![];
                }
            };
            // The event name is duplicated inside the payload; prefer the
            // SSE field and fall back to the payload's `type`
            let event_type = event
                .event
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(String::from)
                .unwrap_or_else(|| str_field(&json, "type").to_string());

            self.convert_openai_event(&event_type, &json)
                .into_iter()
                .map(Ok)
                .collect()
        })
    }
}
