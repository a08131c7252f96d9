//! OpenAI client

use async_trait::async_trait;

use crate::error::{GenError, classify_timeout};
use crate::providers::openai::config::OpenAiConfig;
use crate::providers::openai::streaming::OpenAiEventConverter;
use crate::stream::GenerationStream;
use crate::traits::ChatCapability;
use crate::types::{ChatRequest, ChatResponse};
use crate::utils::cancel::CancelHandle;
use crate::utils::streaming::{StreamFactory, api_error_from_body};
use crate::utils::url::join_url;

const PROVIDER: &str = "openai";

/// Explicitly constructed OpenAI client; no ambient global state
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    pub(crate) config: OpenAiConfig,
    pub(crate) http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, pools).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub(crate) async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, GenError> {
        let url = join_url(&self.config.base_url, path);
        let response = self
            .http
            .post(&url)
            .headers(self.config.headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| classify_timeout(e.into(), PROVIDER))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(api_error_from_body(status, response.text().await.ok()));
        }
        response
            .json()
            .await
            .map_err(|e| GenError::ParseError(format!("Failed to decode response body: {e}")))
    }
}

#[async_trait]
impl ChatCapability for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GenError> {
        let body = super::chat::build_request_body(&request, false)?;
        let json = self.post_json("/responses", &body).await?;
        super::chat::parse_response(json)
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        cancel: Option<CancelHandle>,
    ) -> Result<GenerationStream, GenError> {
        let body = super::chat::build_request_body(&request, true)?;
        let url = join_url(&self.config.base_url, "/responses");
        let builder = self
            .http
            .post(&url)
            .headers(self.config.headers()?)
            .json(&body);
        StreamFactory::create_chunk_stream(PROVIDER, builder, OpenAiEventConverter::new(), cancel)
            .await
    }
}
