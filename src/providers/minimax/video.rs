//! MiniMax video generation
//!
//! Video generation streams heartbeat/progress frames while the model
//! renders, then exactly one result or error frame. The request blocks
//! until the terminal frame; callers should budget a deadline measured in
//! minutes, not seconds.

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::error::{GenError, classify_timeout};
use crate::providers::minimax::client::MinimaxClient;
use crate::traits::VideoGenerationCapability;
use crate::types::{VideoGenerationRequest, VideoGenerationResult};
use crate::utils::async_completion::AsyncCompletion;
use crate::utils::cancel::CancelHandle;
use crate::utils::sse_stream::SseStreamExt;
use crate::utils::streaming::api_error_from_body;
use crate::utils::url::join_url;

pub(crate) fn build_request_body(
    request: &VideoGenerationRequest,
) -> Result<serde_json::Value, GenError> {
    if request.model.is_empty() {
        return Err(GenError::InvalidParameter("model must not be empty".into()));
    }
    if request.prompt.is_empty() {
        return Err(GenError::InvalidParameter(
            "prompt must not be empty".into(),
        ));
    }
    let mut body = serde_json::json!({
        "model": request.model,
        "prompt": request.prompt,
        "stream": true,
    });
    if let Some(duration) = request.duration_seconds {
        body["duration"] = serde_json::json!(duration);
    }
    if let Some(resolution) = &request.resolution {
        body["resolution"] = serde_json::json!(resolution);
    }
    Ok(body)
}

#[async_trait]
impl VideoGenerationCapability for MinimaxClient {
    async fn generate_video(
        &self,
        request: VideoGenerationRequest,
        cancel: Option<CancelHandle>,
    ) -> Result<VideoGenerationResult, GenError> {
        let body = build_request_body(&request)?;
        let url = join_url(self.base_url(), "/video/generation");
        let response = self
            .http()
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_timeout(e.into(), "minimax"))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(api_error_from_body(status, response.text().await.ok()));
        }

        let frames = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| GenError::HttpError(format!("Stream error: {e}"))))
            .into_sse_stream();

        let mut completion = AsyncCompletion::new("minimax");
        if let Some(cancel) = cancel {
            completion = completion.with_cancel(cancel);
        }
        completion
            .run(frames)
            .await
            .map_err(|e| classify_timeout(e, "minimax"))
    }
}
