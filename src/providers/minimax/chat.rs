//! MiniMax chat request building and response decoding (OpenAI-compatible)

use crate::error::GenError;
use crate::types::{
    ChatRequest, ChatResponse, FinishReason, MessageRole, ResponseMetadata, ToolCall, Usage,
};

/// Build the JSON body for a `/chat/completions` call.
pub(crate) fn build_request_body(
    request: &ChatRequest,
    stream: bool,
) -> Result<serde_json::Value, GenError> {
    if request.model.is_empty() {
        return Err(GenError::InvalidParameter("model must not be empty".into()));
    }

    let messages: Vec<serde_json::Value> = request
        .messages
        .iter()
        .map(|message| {
            let role = match message.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::Tool => "tool",
            };
            let mut item = serde_json::json!({"role": role, "content": message.content});
            if let Some(calls) = &message.tool_calls {
                item["tool_calls"] = calls
                    .iter()
                    .map(|call| {
                        serde_json::json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            },
                        })
                    })
                    .collect();
            }
            if let Some(call_id) = &message.tool_call_id {
                item["tool_call_id"] = serde_json::json!(call_id);
            }
            item
        })
        .collect();

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": messages,
        "stream": stream,
    });
    if stream {
        body["stream_options"] = serde_json::json!({"include_usage": true});
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = serde_json::json!(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(tools) = &request.tools {
        body["tools"] = tools
            .iter()
            .map(|tool| serde_json::to_value(tool).unwrap_or_default())
            .collect();
    }
    Ok(body)
}

/// Decode a non-streaming `/chat/completions` body into the unified response.
pub(crate) fn parse_response(json: serde_json::Value) -> Result<ChatResponse, GenError> {
    let choice = json
        .pointer("/choices/0")
        .ok_or_else(|| GenError::ParseError("response carries no choices".into()))?;
    let message = choice.get("message").cloned().unwrap_or_default();

    let tool_calls = message
        .get("tool_calls")
        .and_then(|calls| calls.as_array())
        .into_iter()
        .flatten()
        .map(|call| ToolCall {
            id: call
                .get("id")
                .and_then(|i| i.as_str())
                .unwrap_or_default()
                .to_string(),
            name: call
                .pointer("/function/name")
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string(),
            arguments: call
                .pointer("/function/arguments")
                .and_then(|a| a.as_str())
                .and_then(|a| serde_json::from_str(a).ok())
                .unwrap_or_else(|| serde_json::json!({})),
        })
        .collect();

    let usage = json.get("usage").map(|u| {
        Usage::new(
            u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            u.get("completion_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
        )
    });

    let reasoning = message
        .get("reasoning_content")
        .and_then(|r| r.as_str())
        .filter(|r| !r.is_empty())
        .map(String::from);

    Ok(ChatResponse {
        content: message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string(),
        reasoning,
        tool_calls,
        finish_reason: choice
            .get("finish_reason")
            .and_then(|r| r.as_str())
            .map(FinishReason::from_provider),
        usage,
        metadata: ResponseMetadata {
            id: json.get("id").and_then(|i| i.as_str()).map(String::from),
            model: json.get("model").and_then(|m| m.as_str()).map(String::from),
            created: Some(chrono::Utc::now()),
            provider: "minimax".to_string(),
            request_id: None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    #[test]
    fn streaming_body_requests_usage() {
        let request = ChatRequest::new("MiniMax-M2", vec![ChatMessage::user("hi")]);
        let body = build_request_body(&request, true).expect("body");
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    #[test]
    fn response_decodes_compat_shape() {
        let json = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "MiniMax-M2",
            "choices": [{
                "message": {
                    "content": "hello",
                    "tool_calls": [{
                        "id": "call_1",
                        "function": {"name": "shell", "arguments": "{\"command\":\"ls\"}"},
                    }],
                },
                "finish_reason": "tool_calls",
            }],
            "usage": {"prompt_tokens": 4, "completion_tokens": 2},
        });
        let response = parse_response(json).expect("response");
        assert_eq!(response.content, "hello");
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(
            response.tool_calls[0].arguments,
            serde_json::json!({"command": "ls"})
        );
    }

    #[test]
    fn missing_choices_is_a_parse_error() {
        assert!(parse_response(serde_json::json!({})).is_err());
    }
}
