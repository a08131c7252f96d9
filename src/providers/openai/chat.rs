//! OpenAI chat request building and response decoding (Responses API)

use crate::error::GenError;
use crate::providers::openai::streaming::extract_usage;
use crate::types::{
    ChatRequest, ChatResponse, FinishReason, MessageRole, ResponseMetadata, ToolCall,
};

/// Build the JSON body for a Responses-API call.
pub(crate) fn build_request_body(
    request: &ChatRequest,
    stream: bool,
) -> Result<serde_json::Value, GenError> {
    if request.model.is_empty() {
        return Err(GenError::InvalidParameter("model must not be empty".into()));
    }

    let mut input = Vec::new();
    for message in &request.messages {
        match message.role {
            MessageRole::System | MessageRole::User => {
                input.push(serde_json::json!({
                    "role": role_name(message.role),
                    "content": message.content,
                }));
            }
            MessageRole::Assistant => {
                if !message.content.is_empty() {
                    input.push(serde_json::json!({
                        "role": "assistant",
                        "content": message.content,
                    }));
                }
                for call in message.tool_calls.iter().flatten() {
                    input.push(serde_json::json!({
                        "type": "function_call",
                        "call_id": call.id,
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }));
                }
            }
            MessageRole::Tool => {
                let call_id = message.tool_call_id.as_deref().ok_or_else(|| {
                    GenError::InvalidParameter("tool message without tool_call_id".into())
                })?;
                input.push(serde_json::json!({
                    "type": "function_call_output",
                    "call_id": call_id,
                    "output": message.content,
                }));
            }
        }
    }

    let mut body = serde_json::json!({
        "model": request.model,
        "input": input,
        "stream": stream,
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = serde_json::json!(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_output_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(tools) = &request.tools {
        body["tools"] = tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "name": tool.function.name,
                    "description": tool.function.description,
                    "parameters": tool.function.parameters,
                })
            })
            .collect();
    }
    Ok(body)
}

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}

/// Decode a non-streaming Responses-API body into the unified response.
pub(crate) fn parse_response(json: serde_json::Value) -> Result<ChatResponse, GenError> {
    let mut content = String::new();
    let mut reasoning = String::new();
    let mut tool_calls = Vec::new();

    for item in json
        .get("output")
        .and_then(|o| o.as_array())
        .into_iter()
        .flatten()
    {
        match item.get("type").and_then(|t| t.as_str()) {
            Some("message") => {
                for part in item
                    .get("content")
                    .and_then(|c| c.as_array())
                    .into_iter()
                    .flatten()
                {
                    if part.get("type").and_then(|t| t.as_str()) == Some("output_text")
                        && let Some(text) = part.get("text").and_then(|t| t.as_str())
                    {
                        content.push_str(text);
                    }
                }
            }
            Some("reasoning") => {
                for part in item
                    .get("summary")
                    .and_then(|s| s.as_array())
                    .into_iter()
                    .flatten()
                {
                    if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                        reasoning.push_str(text);
                    }
                }
            }
            Some("function_call") => {
                let arguments = item
                    .get("arguments")
                    .and_then(|a| a.as_str())
                    .and_then(|a| serde_json::from_str(a).ok())
                    .unwrap_or_else(|| serde_json::json!({}));
                tool_calls.push(ToolCall {
                    id: item
                        .get("call_id")
                        .or_else(|| item.get("id"))
                        .and_then(|i| i.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    name: item
                        .get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    arguments,
                });
            }
            _ => {}
        }
    }

    let finish_reason = match json
        .pointer("/incomplete_details/reason")
        .and_then(|r| r.as_str())
    {
        Some("max_output_tokens") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(other) => FinishReason::Other {
            raw: other.to_string(),
        },
        None if !tool_calls.is_empty() => FinishReason::ToolCalls,
        None => FinishReason::Stop,
    };

    Ok(ChatResponse {
        content,
        reasoning: (!reasoning.is_empty()).then_some(reasoning),
        tool_calls,
        finish_reason: Some(finish_reason),
        usage: json.get("usage").map(extract_usage),
        metadata: ResponseMetadata {
            id: json.get("id").and_then(|i| i.as_str()).map(String::from),
            model: json.get("model").and_then(|m| m.as_str()).map(String::from),
            created: Some(chrono::Utc::now()),
            provider: "openai".to_string(),
            request_id: None,
        },
    })
}
