//! End-to-end normalizer tests: raw SSE text through the frame reader,
//! stream driver, and each provider converter.

mod support;

use omnigen::providers::anthropic::AnthropicEventConverter;
use omnigen::providers::minimax::MinimaxEventConverter;
use omnigen::providers::openai::OpenAiEventConverter;
use omnigen::stream::StreamChunk;
use omnigen::types::FinishReason;
use support::stream_fixture::{collect, collect_ok, drive_sse};

const OPENAI_TOOL_CALL_STREAM: &str = r#"event: response.created
data: {"type":"response.created","response":{"id":"resp_1"}}

event: response.output_text.delta
data: {"type":"response.output_text.delta","item_id":"msg_1","delta":"Let me check"}

event: response.output_item.added
data: {"type":"response.output_item.added","item":{"type":"function_call","id":"fc_1","call_id":"call_7","name":"shell"}}

event: response.function_call_arguments.delta
data: {"type":"response.function_call_arguments.delta","item_id":"fc_1","delta":"{\"command\""}

event: response.function_call_arguments.delta
data: {"type":"response.function_call_arguments.delta","item_id":"fc_1","delta":": \"uname"}

event: response.function_call_arguments.delta
data: {"type":"response.function_call_arguments.delta","item_id":"fc_1","delta":" -a\"}"}

event: response.function_call_arguments.done
data: {"type":"response.function_call_arguments.done","item_id":"fc_1"}

event: response.completed
data: {"type":"response.completed","response":{"status":"completed","usage":{"input_tokens":12,"output_tokens":30}}}

data: [DONE]

"#;

#[tokio::test]
async fn openai_stream_normalizes_text_tool_call_and_finish() {
    let chunks = collect_ok(drive_sse(OPENAI_TOOL_CALL_STREAM, OpenAiEventConverter::new())).await;
    assert_eq!(
        chunks,
        vec![
            StreamChunk::Text {
                text: "Let me check".into()
            },
            StreamChunk::ToolCall {
                id: "call_7".into(),
                name: "shell".into(),
                arguments: serde_json::json!({"command": "uname -a"}),
            },
            StreamChunk::Finish {
                reason: FinishReason::ToolCalls,
                usage: Some(omnigen::types::Usage::new(12, 30)),
            },
        ]
    );
}

const ANTHROPIC_STREAM: &str = r#"event: message_start
data: {"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":20}}}

event: ping
data: {"type":"ping"}

event: content_block_start
data: {"type":"content_block_start","index":0,"content_block":{"type":"text"}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Open"}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"ing"}}

event: content_block_stop
data: {"type":"content_block_stop","index":0}

event: content_block_start
data: {"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"toolu_1","name":"file_editor"}}

event: content_block_delta
data: {"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"command\":\"view\","}}

event: content_block_delta
data: {"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"\"path\":\"/etc/hosts\"}"}}

event: content_block_stop
data: {"type":"content_block_stop","index":1}

event: message_delta
data: {"type":"message_delta","delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":9}}

"#;

#[tokio::test]
async fn anthropic_stream_normalizes_blocks_and_usage() {
    let chunks = collect_ok(drive_sse(ANTHROPIC_STREAM, AnthropicEventConverter::new())).await;
    assert_eq!(chunks.len(), 4);
    assert_eq!(
        chunks[0],
        StreamChunk::Text {
            text: "Open".into()
        }
    );
    assert_eq!(chunks[1], StreamChunk::Text { text: "ing".into() });
    assert_eq!(
        chunks[2],
        StreamChunk::ToolCall {
            id: "toolu_1".into(),
            name: "file_editor".into(),
            arguments: serde_json::json!({"command": "view", "path": "/etc/hosts"}),
        }
    );
    match &chunks[3] {
        StreamChunk::Finish { reason, usage } => {
            assert_eq!(*reason, FinishReason::ToolCalls);
            let usage = usage.as_ref().expect("usage");
            assert_eq!(usage.input_tokens, 20);
            assert_eq!(usage.output_tokens, 9);
            assert_eq!(usage.total_tokens, 29);
        }
        other => panic!("expected finish, got {other:?}"),
    }
}

const MINIMAX_STREAM: &str = r#": keep-alive

data: {"id":"chatcmpl-1","choices":[{"delta":{"role":"assistant","content":"He"}}]}

data: {"id":"chatcmpl-1","choices":[{"delta":{"content":"llo"}}]}

data: {"id":"chatcmpl-1","choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"prompt_tokens":5,"completion_tokens":2}}

data: [DONE]

"#;

#[tokio::test]
async fn minimax_stream_normalizes_deltas_and_done_sentinel() {
    let chunks = collect_ok(drive_sse(MINIMAX_STREAM, MinimaxEventConverter::new())).await;
    assert_eq!(
        chunks,
        vec![
            StreamChunk::Text { text: "He".into() },
            StreamChunk::Text { text: "llo".into() },
            StreamChunk::Finish {
                reason: FinishReason::Stop,
                usage: Some(omnigen::types::Usage::new(5, 2)),
            },
        ]
    );
}

#[tokio::test]
async fn arguments_split_across_n_deltas_yield_one_tool_call() {
    for n in [1usize, 2, 10] {
        let arguments = r#"{"command": "echo split"}"#;
        let step = arguments.len().div_ceil(n);
        let mut raw = String::from(
            "event: response.output_item.added\ndata: {\"item\":{\"type\":\"function_call\",\"id\":\"fc_n\",\"call_id\":\"call_n\",\"name\":\"shell\"}}\n\n",
        );
        for piece in arguments.as_bytes().chunks(step) {
            let piece = std::str::from_utf8(piece).expect("ascii fixture");
            let frame = serde_json::json!({"item_id": "fc_n", "delta": piece});
            raw.push_str(&format!(
                "event: response.function_call_arguments.delta\ndata: {frame}\n\n"
            ));
        }
        raw.push_str(
            "event: response.function_call_arguments.done\ndata: {\"item_id\":\"fc_n\"}\n\n",
        );
        raw.push_str("event: response.completed\ndata: {\"response\":{}}\n\n");

        let chunks = collect_ok(drive_sse(&raw, OpenAiEventConverter::new())).await;
        assert_eq!(chunks.len(), 2, "n = {n}");
        assert_eq!(
            chunks[0],
            StreamChunk::ToolCall {
                id: "call_n".into(),
                name: "shell".into(),
                arguments: serde_json::json!({"command": "echo split"}),
            },
            "n = {n}"
        );
    }
}

#[tokio::test]
async fn eof_without_completion_signal_is_an_error() {
    let raw = r#"event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"partial"}}

"#;
    let items = collect(drive_sse(raw, AnthropicEventConverter::new())).await;
    assert_eq!(items.len(), 2);
    assert!(matches!(
        items[0].as_ref().unwrap(),
        StreamChunk::Text { .. }
    ));
    let err = items[1].as_ref().unwrap_err();
    assert!(err.to_string().contains("without completion signal"));
}

#[tokio::test]
async fn provider_error_frame_terminates_the_stream() {
    let raw = r#"event: error
data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"never seen"}}

"#;
    let chunks = collect_ok(drive_sse(raw, AnthropicEventConverter::new())).await;
    assert_eq!(
        chunks,
        vec![StreamChunk::Error {
            message: "overloaded_error: Overloaded".into()
        }]
    );
}

#[tokio::test]
async fn frames_after_finish_are_ignored() {
    let raw = r#"data: {"choices":[{"delta":{"content":"done"},"finish_reason":"stop"}]}

data: {"choices":[{"delta":{"content":"late"}}]}

"#;
    let chunks = collect_ok(drive_sse(raw, MinimaxEventConverter::new())).await;
    assert_eq!(chunks.len(), 2);
    assert!(matches!(chunks[1], StreamChunk::Finish { .. }));
}
