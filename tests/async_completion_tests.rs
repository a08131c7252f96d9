//! Long-running completion protocol tests through the real frame reader.

mod support;

use futures_util::StreamExt;

use omnigen::error::GenError;
use omnigen::types::{MediaAsset, VideoGenerationResult};
use omnigen::utils::async_completion::AsyncCompletion;
use omnigen::utils::cancel::CancelHandle;
use omnigen::utils::sse_stream::SseStreamExt;
use support::stream_fixture::sse_byte_chunks;

fn frames(raw: &str) -> omnigen::utils::sse_stream::SseEventStream {
    futures_util::stream::iter(sse_byte_chunks(raw)).into_sse_stream()
}

#[tokio::test]
async fn heartbeats_then_result_completes() {
    for heartbeat_count in [0usize, 1, 2, 50] {
        let mut raw = String::new();
        for _ in 0..heartbeat_count {
            raw.push_str("data: {\"type\":\"heartbeat\"}\n\n");
        }
        raw.push_str("data: {\"type\":\"progress\",\"percent\":50}\n\n");
        raw.push_str(
            "data: {\"type\":\"result\",\"videos\":[{\"type\":\"url\",\"url\":\"https://x/a.mp4\",\"mediaType\":\"video/mp4\"}]}\n\n",
        );

        let result: VideoGenerationResult = AsyncCompletion::new("minimax")
            .run(frames(&raw))
            .await
            .expect("completed");
        assert_eq!(
            result.videos,
            vec![MediaAsset::Url {
                url: "https://x/a.mp4".into(),
                media_type: "video/mp4".into(),
            }],
            "heartbeats = {heartbeat_count}"
        );
        assert!(result.warnings.is_empty());
    }
}

#[tokio::test]
async fn heartbeats_only_is_a_distinct_failure() {
    let raw = "data: {\"type\":\"heartbeat\"}\n\ndata: {\"type\":\"heartbeat\"}\n\n";
    let err = AsyncCompletion::new("minimax")
        .run::<VideoGenerationResult, _>(frames(raw))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("without a completion frame"));
}

#[tokio::test]
async fn error_frame_yields_typed_error_with_code_and_status() {
    let raw = "data: {\"type\":\"error\",\"message\":\"Rate limit exceeded\",\"errorType\":\"rate_limit_exceeded\",\"statusCode\":429}\n\n";
    let err = AsyncCompletion::new("minimax")
        .run::<VideoGenerationResult, _>(frames(raw))
        .await
        .unwrap_err();
    match err {
        GenError::ApiError {
            status,
            code,
            message,
            ..
        } => {
            assert_eq!(status, 429);
            assert_eq!(code.as_deref(), Some("rate_limit_exceeded"));
            assert!(message.contains("Rate limit exceeded"));
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn transport_errors_propagate_as_is() {
    let chunks: Vec<Result<Vec<u8>, GenError>> = vec![
        Ok(b"data: {\"type\":\"heartbeat\"}\n\n".to_vec()),
        Err(GenError::HttpError("connection reset".into())),
    ];
    let stream = futures_util::stream::iter(chunks).into_sse_stream();
    let err = AsyncCompletion::new("minimax")
        .run::<VideoGenerationResult, _>(stream)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn cancellation_discards_partial_state() {
    let cancel = CancelHandle::new();
    cancel.cancel();
    let raw = "data: {\"type\":\"result\",\"videos\":[]}\n\n";
    let err = AsyncCompletion::new("minimax")
        .with_cancel(cancel)
        .run::<VideoGenerationResult, _>(frames(raw))
        .await
        .unwrap_err();
    assert!(matches!(err, GenError::Cancelled));
}

#[tokio::test]
async fn frames_stream_is_released_on_completion() {
    // The result frame arrives before the stream ends; the driver must not
    // keep reading past it.
    let raw = "data: {\"type\":\"result\",\"videos\":[]}\n\ndata: {\"type\":\"error\",\"message\":\"late\",\"statusCode\":500}\n\n";
    let mut stream = frames(raw);
    let result: VideoGenerationResult = AsyncCompletion::new("minimax")
        .run(&mut stream)
        .await
        .expect("completed");
    assert!(result.videos.is_empty());
    // The trailing error frame was never consumed
    let leftover = stream.next().await.expect("frame").expect("ok");
    assert!(leftover.data.contains("late"));
}
