//! Common streaming utilities
//!
//! The converter contract every provider normalizer implements, the shared
//! stream driver that enforces the completion-signal invariant, and the
//! tool-call accumulator owned by the normalizers.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use futures_util::StreamExt;

use crate::error::{GenError, classify_timeout};
use crate::stream::{GenerationStream, StreamChunk};
use crate::utils::cancel::CancelHandle;
use crate::utils::sse_stream::{SseEvent, SseEventStream, SseStreamExt};

/// Type alias for SSE event conversion futures
type SseChunkFuture<'a> =
    Pin<Box<dyn Future<Output = Vec<Result<StreamChunk, GenError>>> + Send + Sync + 'a>>;

/// Trait for converting provider-specific SSE frames to canonical chunks
///
/// A single provider frame may expand into zero or more chunks (heartbeats
/// produce nothing, a finish frame may produce usage plus finish). A
/// malformed non-terminal frame should be skipped by returning an empty
/// vector; a malformed terminal frame is a fatal decode error.
pub trait SseEventConverter: Send + Sync {
    /// Convert one SSE frame to zero or more canonical chunks
    fn convert_event(&self, event: SseEvent) -> SseChunkFuture<'_>;
}

/// Stream factory wiring frames, converter, and invariants together
pub struct StreamFactory;

impl StreamFactory {
    /// Drive an SSE frame stream through a converter.
    ///
    /// The loop is pull-based: one frame is read per caller demand. The
    /// cancellation signal is checked before every read. Once a terminal
    /// chunk (`Finish` or `Error`) has been emitted the remaining frames are
    /// ignored and the connection is released by dropping the frame stream —
    /// the one close path shared by every exit, including decode errors. If
    /// the frames end without a terminal chunk, the stream yields the
    /// missing-completion error instead of stopping silently.
    pub fn drive<C>(
        frames: SseEventStream,
        converter: C,
        cancel: Option<CancelHandle>,
    ) -> GenerationStream
    where
        C: SseEventConverter + 'static,
    {
        let stream = async_stream::stream! {
            let mut frames = frames;
            let mut finished = false;
            loop {
                if let Some(cancel) = &cancel
                    && cancel.is_cancelled()
                {
                    yield Err(GenError::Cancelled);
                    return;
                }

                let frame = match frames.next().await {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        yield Err(e);
                        return;
                    }
                    None => break,
                };

                if frame.is_done_sentinel() {
                    break;
                }
                if frame.data.trim().is_empty() {
                    continue;
                }

                for item in converter.convert_event(frame).await {
                    match item {
                        Ok(chunk) => {
                            finished = finished || chunk.is_terminal();
                            yield Ok(chunk);
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
                if finished {
                    break;
                }
            }

            if !finished {
                yield Err(GenError::StreamError(
                    "stream ended without completion signal".to_string(),
                ));
            }
        };
        Box::pin(stream)
    }

    /// Send a streaming request and normalize the response body.
    ///
    /// Timeouts at the handshake are classified into the canonical timeout
    /// error; a non-success status is decoded into an API error preserving
    /// the status code and body.
    pub async fn create_chunk_stream<C>(
        provider: &str,
        request: reqwest::RequestBuilder,
        converter: C,
        cancel: Option<CancelHandle>,
    ) -> Result<GenerationStream, GenError>
    where
        C: SseEventConverter + 'static,
    {
        let response = request
            .send()
            .await
            .map_err(|e| classify_timeout(e.into(), provider))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(api_error_from_body(status, response.text().await.ok()));
        }

        let byte_stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| GenError::HttpError(format!("Stream error: {e}"))));
        Ok(Self::drive(
            byte_stream.into_sse_stream(),
            converter,
            cancel,
        ))
    }
}

/// Decode a provider error body into an API error, preserving the
/// machine-readable code when the body carries one.
pub fn api_error_from_body(status: u16, body: Option<String>) -> GenError {
    let body = body.unwrap_or_default();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
        let error = value.get("error").unwrap_or(&value);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or(&body)
            .to_string();
        let code = error
            .get("code")
            .or_else(|| error.get("type"))
            .and_then(|c| c.as_str())
            .map(String::from);
        let param = error
            .get("param")
            .and_then(|p| p.as_str())
            .map(String::from);
        return GenError::ApiError {
            status,
            code,
            message,
            param,
            details: Some(value),
        };
    }
    GenError::api_error(status, body)
}

/// Bookkeeping table accumulating partial tool-call argument text
///
/// Entries are keyed by a provider-local item identifier (content-block
/// index or output index) and exist from the explicit "item added" signal
/// until sealed. Sealed entries are removed immediately so long tool-heavy
/// streams stay bounded.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    entries: HashMap<String, ToolCallEntry>,
}

#[derive(Debug)]
struct ToolCallEntry {
    call_id: String,
    tool_name: String,
    arg_text: String,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new entry on the "item added" signal. Call id and tool
    /// name are established before any argument deltas arrive.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) {
        self.entries.insert(
            key.into(),
            ToolCallEntry {
                call_id: call_id.into(),
                tool_name: tool_name.into(),
                arg_text: String::new(),
            },
        );
    }

    /// Append an argument delta to the matching entry. Pure bookkeeping:
    /// deltas for unknown keys (no preceding "item added") are dropped.
    pub fn append(&mut self, key: &str, delta: &str) {
        match self.entries.get_mut(key) {
            Some(entry) => entry.arg_text.push_str(delta),
            None => tracing::warn!(key, "arguments delta for unregistered tool call"),
        }
    }

    /// Seal an entry, emitting its tool-call chunk.
    ///
    /// The accumulated text is parsed as JSON; malformed or empty text
    /// yields empty arguments rather than an error. The entry is removed,
    /// so a duplicate seal for the same key returns `None` — the first
    /// seal is authoritative.
    pub fn seal(&mut self, key: &str) -> Option<StreamChunk> {
        let entry = self.entries.remove(key)?;
        let arguments = match serde_json::from_str(&entry.arg_text) {
            Ok(value) => value,
            Err(e) => {
                if !entry.arg_text.is_empty() {
                    tracing::warn!(
                        key,
                        tool = %entry.tool_name,
                        "tool call arguments are not valid JSON: {e}"
                    );
                }
                serde_json::json!({})
            }
        };
        Some(StreamChunk::ToolCall {
            id: entry.call_id,
            name: entry.tool_name,
            arguments,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Helper for building the chunk vector of one conversion
pub struct EventBuilder {
    chunks: Vec<StreamChunk>,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self {
            // Most conversions produce 1-2 chunks
            chunks: Vec::with_capacity(2),
        }
    }

    /// Add a text chunk (only if the delta is not empty)
    pub fn add_text(mut self, text: String) -> Self {
        if !text.is_empty() {
            self.chunks.push(StreamChunk::Text { text });
        }
        self
    }

    /// Add a reasoning chunk (only if the delta is not empty)
    pub fn add_reasoning(mut self, text: String) -> Self {
        if !text.is_empty() {
            self.chunks.push(StreamChunk::Reasoning { text });
        }
        self
    }

    pub fn add_chunk(mut self, chunk: StreamChunk) -> Self {
        self.chunks.push(chunk);
        self
    }

    pub fn add_usage(mut self, usage: crate::types::Usage) -> Self {
        self.chunks.push(StreamChunk::Usage { usage });
        self
    }

    pub fn add_finish(
        mut self,
        reason: crate::types::FinishReason,
        usage: Option<crate::types::Usage>,
    ) -> Self {
        self.chunks.push(StreamChunk::Finish { reason, usage });
        self
    }

    pub fn build(self) -> Vec<StreamChunk> {
        self.chunks
    }

    pub fn build_results(self) -> Vec<Result<StreamChunk, GenError>> {
        self.chunks.into_iter().map(Ok).collect()
    }
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FinishReason;

    struct EchoConverter;

    impl SseEventConverter for EchoConverter {
        fn convert_event(&self, event: SseEvent) -> SseChunkFuture<'_> {
            Box::pin(async move {
                match event.event.as_deref() {
                    Some("finish") => vec![Ok(StreamChunk::Finish {
                        reason: FinishReason::Stop,
                        usage: None,
                    })],
                    Some("heartbeat") => vec![],
                    _ => vec![Ok(StreamChunk::Text { text: event.data })],
                }
            })
        }
    }

    fn frames(frames: Vec<SseEvent>) -> SseEventStream {
        Box::pin(futures_util::stream::iter(frames.into_iter().map(Ok)))
    }

    fn data_frame(data: &str) -> SseEvent {
        SseEvent {
            event: None,
            data: data.to_string(),
        }
    }

    fn typed_frame(event: &str, data: &str) -> SseEvent {
        SseEvent {
            event: Some(event.to_string()),
            data: data.to_string(),
        }
    }

    async fn collect(stream: GenerationStream) -> Vec<Result<StreamChunk, GenError>> {
        stream.collect::<Vec<_>>().await
    }

    #[tokio::test]
    async fn driver_stops_after_finish() {
        let stream = StreamFactory::drive(
            frames(vec![
                data_frame("hello"),
                typed_frame("finish", "{}"),
                data_frame("ignored tail"),
            ]),
            EchoConverter,
            None,
        );
        let items = collect(stream).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[1].as_ref().unwrap(),
            StreamChunk::Finish { .. }
        ));
    }

    #[tokio::test]
    async fn eof_without_finish_is_an_error() {
        let stream = StreamFactory::drive(
            frames(vec![data_frame("partial"), typed_frame("heartbeat", "{}")]),
            EchoConverter,
            None,
        );
        let items = collect(stream).await;
        let last = items.last().expect("items").as_ref().unwrap_err();
        assert!(last.to_string().contains("without completion signal"));
    }

    #[tokio::test]
    async fn done_sentinel_without_finish_is_an_error() {
        let stream = StreamFactory::drive(
            frames(vec![data_frame("text"), data_frame("[DONE]")]),
            EchoConverter,
            None,
        );
        let items = collect(stream).await;
        let last = items.last().expect("items").as_ref().unwrap_err();
        assert!(last.to_string().contains("without completion signal"));
    }

    #[tokio::test]
    async fn cancellation_is_checked_before_each_read() {
        let cancel = CancelHandle::new();
        cancel.cancel();
        let stream = StreamFactory::drive(
            frames(vec![data_frame("never read")]),
            EchoConverter,
            Some(cancel),
        );
        let items = collect(stream).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0].as_ref().unwrap_err(),
            GenError::Cancelled
        ));
    }

    #[test]
    fn accumulator_appends_and_seals_once() {
        let mut acc = ToolCallAccumulator::new();
        acc.register("item_0", "call_1", "shell");
        acc.append("item_0", "{\"comm");
        acc.append("item_0", "and\": \"ls\"}");
        let chunk = acc.seal("item_0").expect("sealed");
        match chunk {
            StreamChunk::ToolCall {
                id,
                name,
                arguments,
            } => {
                assert_eq!(id, "call_1");
                assert_eq!(name, "shell");
                assert_eq!(arguments, serde_json::json!({"command": "ls"}));
            }
            other => panic!("expected ToolCall, got {other:?}"),
        }
        // First seal is authoritative; the entry is gone
        assert!(acc.seal("item_0").is_none());
        assert!(acc.is_empty());
    }

    #[test]
    fn accumulator_malformed_json_yields_empty_arguments() {
        let mut acc = ToolCallAccumulator::new();
        acc.register("0", "call_2", "code_interpreter");
        acc.append("0", "{\"code\": \"print(");
        let chunk = acc.seal("0").expect("sealed");
        match chunk {
            StreamChunk::ToolCall { arguments, .. } => {
                assert_eq!(arguments, serde_json::json!({}));
            }
            other => panic!("expected ToolCall, got {other:?}"),
        }
    }

    #[test]
    fn accumulator_ignores_deltas_without_registration() {
        let mut acc = ToolCallAccumulator::new();
        acc.append("ghost", "{}");
        assert!(acc.is_empty());
        assert!(acc.seal("ghost").is_none());
    }
}
