//! SSE frame reader
//!
//! Parses a byte stream into discrete Server-Sent-Events frames. Frames are
//! `event`/`data` blocks separated by blank lines: `data:` lines accumulate
//! (joined by `\n`) until a blank line terminates the frame, an `event:`
//! line sets the frame's type, and comment lines (leading `:`) are ignored.
//! The legacy `data: [DONE]` sentinel is surfaced as a regular frame and
//! interpreted by the stream driver.

use futures_util::{Stream, StreamExt};
use std::pin::Pin;

use crate::error::GenError;

/// One raw SSE frame, consumed immediately by a converter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    /// Frame type from the `event:` field, when present
    pub event: Option<String>,
    /// Accumulated `data:` payload, lines joined by `\n`
    pub data: String,
}

impl SseEvent {
    /// Whether this frame is the legacy `[DONE]` end-of-stream sentinel.
    pub fn is_done_sentinel(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Incremental SSE parser
///
/// Keeps a partial line across `feed` calls so frames split at arbitrary
/// byte boundaries are reassembled correctly. Only complete lines are ever
/// decoded, so multi-byte characters split across network chunks are safe.
#[derive(Debug, Default)]
pub struct SseFrameParser {
    line_buffer: Vec<u8>,
    event_type: Option<String>,
    data_lines: Vec<String>,
}

impl SseFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every frame completed by it.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for byte in bytes {
            if *byte == b'\n' {
                let line = std::mem::take(&mut self.line_buffer);
                if let Some(event) = self.handle_line(&line) {
                    events.push(event);
                }
            } else {
                self.line_buffer.push(*byte);
            }
        }
        events
    }

    fn handle_line(&mut self, raw: &[u8]) -> Option<SseEvent> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);

        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(rest) = line.strip_prefix(':') {
            tracing::trace!("SSE comment: {rest}");
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            // A line without a colon is a field with an empty value
            None => (line.as_ref(), ""),
        };

        match field {
            "data" => self.data_lines.push(value.to_string()),
            "event" => self.event_type = Some(value.to_string()),
            // id/retry and unknown fields are not consumed by this client
            _ => {}
        }
        None
    }

    /// Terminate the current frame on a blank line.
    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_type = self.event_type.take();
        if self.data_lines.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data_lines).join("\n");
        Some(SseEvent {
            event: event_type,
            data,
        })
    }
}

/// Boxed stream of SSE frames
pub type SseEventStream = Pin<Box<dyn Stream<Item = Result<SseEvent, GenError>> + Send>>;

/// Extension trait converting a byte stream into an SSE frame stream
pub trait SseStreamExt {
    fn into_sse_stream(self) -> SseEventStream;
}

impl<S, B> SseStreamExt for S
where
    S: Stream<Item = Result<B, GenError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    fn into_sse_stream(self) -> SseEventStream {
        let stream = async_stream::stream! {
            let mut parser = SseFrameParser::new();
            let mut bytes = Box::pin(self);
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for event in parser.feed(chunk.as_ref()) {
                            yield Ok(event);
                        }
                    }
                    // Read errors on the underlying stream propagate as-is
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            // An unterminated trailing frame is discarded; the stream driver
            // reports the missing completion signal.
        };
        Box::pin(stream)
    }
}
