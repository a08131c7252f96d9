//! OpenAI embeddings

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GenError;
use crate::providers::openai::client::OpenAiClient;
use crate::traits::EmbeddingCapability;
use crate::types::{EmbeddingRequest, EmbeddingResponse, Usage};

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbedding>,
    usage: Option<OpenAiEmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingUsage {
    prompt_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[async_trait]
impl EmbeddingCapability for OpenAiClient {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, GenError> {
        if request.input.is_empty() {
            return Err(GenError::InvalidParameter(
                "embedding input must not be empty".into(),
            ));
        }
        let body = serde_json::json!({
            "model": request.model,
            "input": request.input,
        });
        let json = self.post_json("/embeddings", &body).await?;
        let decoded: OpenAiEmbeddingResponse = serde_json::from_value(json)
            .map_err(|e| GenError::ParseError(format!("Malformed embedding response: {e}")))?;

        Ok(EmbeddingResponse {
            embeddings: decoded.data.into_iter().map(|d| d.embedding).collect(),
            usage: decoded.usage.map(|u| {
                let input = u.prompt_tokens.unwrap_or(0);
                let total = u.total_tokens.unwrap_or(input);
                Usage {
                    input_tokens: input,
                    output_tokens: total.saturating_sub(input),
                    total_tokens: total,
                    details: None,
                }
            }),
        })
    }
}
