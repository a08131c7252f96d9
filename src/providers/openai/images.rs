//! OpenAI image generation

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GenError;
use crate::providers::openai::client::OpenAiClient;
use crate::traits::ImageGenerationCapability;
use crate::types::{ImageGenerationRequest, ImageGenerationResponse, MediaAsset};

#[derive(Debug, Deserialize)]
struct OpenAiImageResponse {
    data: Vec<OpenAiImage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiImage {
    url: Option<String>,
    b64_json: Option<String>,
}

#[async_trait]
impl ImageGenerationCapability for OpenAiClient {
    async fn generate_image(
        &self,
        request: ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GenError> {
        let mut body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
        });
        if let Some(size) = &request.size {
            body["size"] = serde_json::json!(size);
        }
        if let Some(count) = request.count {
            body["n"] = serde_json::json!(count);
        }

        let json = self.post_json("/images/generations", &body).await?;
        let decoded: OpenAiImageResponse = serde_json::from_value(json)
            .map_err(|e| GenError::ParseError(format!("Malformed image response: {e}")))?;

        let images = decoded
            .data
            .into_iter()
            .filter_map(|image| match (image.url, image.b64_json) {
                (Some(url), _) => Some(MediaAsset::Url {
                    url,
                    media_type: "image/png".to_string(),
                }),
                (None, Some(data)) => Some(MediaAsset::Base64 {
                    data,
                    media_type: "image/png".to_string(),
                }),
                (None, None) => None,
            })
            .collect();

        Ok(ImageGenerationResponse {
            images,
            warnings: vec![],
            usage: None,
        })
    }
}
