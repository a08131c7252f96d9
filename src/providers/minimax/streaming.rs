//! MiniMax streaming implementation
//!
//! MiniMax chat speaks the OpenAI-compatible delta protocol: tool-call
//! fragments are keyed by array index, the first fragment carrying an id
//! establishes the call, and the `finish_reason` frame seals everything
//! still pending. The stream is closed by the `[DONE]` sentinel.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::error::GenError;
use crate::stream::StreamChunk;
use crate::types::{FinishReason, Usage, UsageDetails};
use crate::utils::sse_stream::SseEvent;
use crate::utils::streaming::{EventBuilder, SseEventConverter, ToolCallAccumulator};

/// MiniMax stream event structure (OpenAI-compatible)
#[derive(Debug, Clone, Deserialize)]
struct MinimaxStreamEvent {
    #[serde(default)]
    choices: Option<Vec<StreamChoice>>,
    #[serde(default)]
    usage: Option<StreamUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallFragment>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolCallFragment {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionFragment>,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionFragment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamUsage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
    #[serde(default)]
    completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Clone, Deserialize)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionTokensDetails {
    #[serde(default)]
    reasoning_tokens: Option<u64>,
}

/// MiniMax event converter
#[derive(Clone, Default)]
pub struct MinimaxEventConverter {
    tool_calls: Arc<Mutex<ToolCallAccumulator>>,
    /// Registration order so sealed calls are emitted in call order
    call_order: Arc<Mutex<Vec<String>>>,
}

impl MinimaxEventConverter {
    pub fn new() -> Self {
        Self::default()
    }

    fn convert_minimax_event(&self, event: MinimaxStreamEvent) -> Vec<StreamChunk> {
        let mut builder = EventBuilder::new();
        let choice = event.choices.as_ref().and_then(|c| c.first());

        if let Some(delta) = choice.and_then(|c| c.delta.as_ref()) {
            if let Some(content) = &delta.content {
                builder = builder.add_text(content.clone());
            }
            if let Some(reasoning) = &delta.reasoning_content {
                builder = builder.add_reasoning(reasoning.clone());
            }
            for fragment in delta.tool_calls.iter().flatten() {
                self.absorb_fragment(fragment);
            }
        }

        if let Some(finish_reason) = choice.and_then(|c| c.finish_reason.as_deref()) {
            // Seal pending calls in registration order before finishing
            for chunk in self.seal_pending() {
                builder = builder.add_chunk(chunk);
            }
            builder = builder.add_finish(
                FinishReason::from_provider(finish_reason),
                event.usage.as_ref().map(unify_usage),
            );
        } else if let Some(usage) = &event.usage {
            builder = builder.add_usage(unify_usage(usage));
        }

        builder.build()
    }

    /// The first fragment carrying an id establishes the entry; later
    /// fragments only append argument text.
    fn absorb_fragment(&self, fragment: &ToolCallFragment) {
        let Some(index) = fragment.index else {
            return;
        };
        let key = index.to_string();
        let Ok(mut acc) = self.tool_calls.lock() else {
            return;
        };

        if let Some(id) = fragment.id.as_deref().filter(|id| !id.is_empty()) {
            let name = fragment
                .function
                .as_ref()
                .and_then(|f| f.name.as_deref())
                .unwrap_or_default();
            acc.register(key.clone(), id, name);
            if let Ok(mut order) = self.call_order.lock() {
                order.push(key.clone());
            }
        }
        if let Some(arguments) = fragment.function.as_ref().and_then(|f| f.arguments.as_deref()) {
            acc.append(&key, arguments);
        }
    }

    fn seal_pending(&self) -> Vec<StreamChunk> {
        let keys = self
            .call_order
            .lock()
            .map(|mut order| std::mem::take(&mut *order))
            .unwrap_or_default();
        let Ok(mut acc) = self.tool_calls.lock() else {
            return vec![];
        };
        keys.iter().filter_map(|key| acc.seal(key)).collect()
    }
}

fn unify_usage(usage: &StreamUsage) -> Usage {
    let cached = usage
        .prompt_tokens_details
        .as_ref()
        .and_then(|d| d.cached_tokens);
    let reasoning = usage
        .completion_tokens_details
        .as_ref()
        .and_then(|d| d.reasoning_tokens);
    let mut unified = Usage::new(
        usage.prompt_tokens.unwrap_or(0),
        usage.completion_tokens.unwrap_or(0),
    );
    if cached.is_some() || reasoning.is_some() {
        unified = unified.with_details(UsageDetails {
            cache_read_tokens: cached,
            reasoning_tokens: reasoning,
            ..Default::default()
        });
    }
    unified
}

impl SseEventConverter for MinimaxEventConverter {
    fn convert_event(
        &self,
        event: SseEvent,
    ) -> Pin<Box<dyn Future<Output = Vec<Result<StreamChunk, GenError>>> + Send + Sync + '_>> {
        Box::pin(async move {
            match serde_json::from_str::<MinimaxStreamEvent>(&event.data) {
                Ok(minimax_event) => self
                    .convert_minimax_event(minimax_event)
                    .into_iter()
                    .map(Ok)
                    .collect(),
                Err(e) => {
                    // Delta frames are non-terminal; skip and keep reading
                    tracing::warn!("skipping malformed MiniMax event: {e}");
                    vec![]
                }
            }
        })
    }
}
