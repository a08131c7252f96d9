//! Test fixture utilities: feed hand-written SSE text through the real
//! frame reader and stream driver.

use futures_util::StreamExt;

use omnigen::error::GenError;
use omnigen::stream::{GenerationStream, StreamChunk};
use omnigen::utils::sse_stream::SseStreamExt;
use omnigen::utils::streaming::{SseEventConverter, StreamFactory};

/// Split raw SSE text into per-frame byte chunks, the way a provider
/// delivers them over HTTP.
pub fn sse_byte_chunks(raw: &str) -> Vec<Result<Vec<u8>, GenError>> {
    let normalized = raw.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(|frame| frame.trim_end_matches('\n'))
        .filter(|frame| !frame.is_empty())
        .map(|frame| Ok(format!("{frame}\n\n").into_bytes()))
        .collect()
}

/// Drive raw SSE text through the frame reader and the stream driver.
pub fn drive_sse<C>(raw: &str, converter: C) -> GenerationStream
where
    C: SseEventConverter + 'static,
{
    let frames = futures_util::stream::iter(sse_byte_chunks(raw)).into_sse_stream();
    StreamFactory::drive(frames, converter, None)
}

/// Collect every item a stream produces.
pub async fn collect(stream: GenerationStream) -> Vec<Result<StreamChunk, GenError>> {
    stream.collect().await
}

/// Collect a stream expected to contain no error items.
pub async fn collect_ok(stream: GenerationStream) -> Vec<StreamChunk> {
    collect(stream)
        .await
        .into_iter()
        .map(|item| item.expect("stream item"))
        .collect()
}
