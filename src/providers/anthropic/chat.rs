//! Anthropic chat request building and response decoding

use crate::error::GenError;
use crate::types::{
    ChatRequest, ChatResponse, FinishReason, MessageRole, ResponseMetadata, ToolCall, Usage,
    UsageDetails,
};

/// Anthropic requires an explicit output token budget
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Build the JSON body for a `/v1/messages` call.
pub(crate) fn build_request_body(
    request: &ChatRequest,
    stream: bool,
) -> Result<serde_json::Value, GenError> {
    if request.model.is_empty() {
        return Err(GenError::InvalidParameter("model must not be empty".into()));
    }

    let mut system = String::new();
    let mut messages: Vec<serde_json::Value> = Vec::new();

    for message in &request.messages {
        match message.role {
            MessageRole::System => {
                if !system.is_empty() {
                    system.push('\n');
                }
                system.push_str(&message.content);
            }
            MessageRole::User => {
                messages.push(serde_json::json!({
                    "role": "user",
                    "content": message.content,
                }));
            }
            MessageRole::Assistant => {
                let mut content = Vec::new();
                if !message.content.is_empty() {
                    content.push(serde_json::json!({"type": "text", "text": message.content}));
                }
                for call in message.tool_calls.iter().flatten() {
                    content.push(serde_json::json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                messages.push(serde_json::json!({"role": "assistant", "content": content}));
            }
            MessageRole::Tool => {
                let call_id = message.tool_call_id.as_deref().ok_or_else(|| {
                    GenError::InvalidParameter("tool message without tool_call_id".into())
                })?;
                messages.push(serde_json::json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": call_id,
                        "content": message.content,
                    }],
                }));
            }
        }
    }

    let mut body = serde_json::json!({
        "model": request.model,
        "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "messages": messages,
        "stream": stream,
    });
    if !system.is_empty() {
        body["system"] = serde_json::json!(system);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = serde_json::json!(temperature);
    }
    if let Some(tools) = &request.tools {
        body["tools"] = tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.function.name,
                    "description": tool.function.description,
                    "input_schema": tool.function.parameters,
                })
            })
            .collect();
    }
    Ok(body)
}

/// Decode a non-streaming `/v1/messages` body into the unified response.
pub(crate) fn parse_response(json: serde_json::Value) -> Result<ChatResponse, GenError> {
    let mut content = String::new();
    let mut reasoning = String::new();
    let mut tool_calls = Vec::new();

    for block in json
        .get("content")
        .and_then(|c| c.as_array())
        .into_iter()
        .flatten()
    {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                    content.push_str(text);
                }
            }
            Some("thinking") => {
                if let Some(text) = block.get("thinking").and_then(|t| t.as_str()) {
                    reasoning.push_str(text);
                }
            }
            Some("tool_use") => {
                tool_calls.push(ToolCall {
                    id: block
                        .get("id")
                        .and_then(|i| i.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    name: block
                        .get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    arguments: block
                        .get("input")
                        .cloned()
                        .unwrap_or_else(|| serde_json::json!({})),
                });
            }
            _ => {}
        }
    }

    let finish_reason = json
        .get("stop_reason")
        .and_then(|r| r.as_str())
        .map(|reason| match reason {
            "end_turn" | "stop_sequence" => FinishReason::Stop,
            "max_tokens" => FinishReason::Length,
            "tool_use" => FinishReason::ToolCalls,
            "refusal" => FinishReason::ContentFilter,
            other => FinishReason::Other {
                raw: other.to_string(),
            },
        });

    let usage = json.get("usage").map(|u| {
        let input = u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
        let output = u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
        let cache_read = u.get("cache_read_input_tokens").and_then(|v| v.as_u64());
        let cache_write = u
            .get("cache_creation_input_tokens")
            .and_then(|v| v.as_u64());
        let mut usage = Usage::new(input, output);
        if cache_read.is_some() || cache_write.is_some() {
            usage = usage.with_details(UsageDetails {
                cache_read_tokens: cache_read,
                cache_write_tokens: cache_write,
                ..Default::default()
            });
        }
        usage
    });

    Ok(ChatResponse {
        content,
        reasoning: (!reasoning.is_empty()).then_some(reasoning),
        tool_calls,
        finish_reason,
        usage,
        metadata: ResponseMetadata {
            id: json.get("id").and_then(|i| i.as_str()).map(String::from),
            model: json.get("model").and_then(|m| m.as_str()).map(String::from),
            created: Some(chrono::Utc::now()),
            provider: "anthropic".to_string(),
            request_id: None,
        },
    })
}
