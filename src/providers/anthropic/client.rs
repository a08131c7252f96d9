//! Anthropic client

use async_trait::async_trait;

use crate::error::{GenError, classify_timeout};
use crate::providers::anthropic::config::AnthropicConfig;
use crate::providers::anthropic::streaming::AnthropicEventConverter;
use crate::stream::GenerationStream;
use crate::traits::ChatCapability;
use crate::types::{ChatRequest, ChatResponse};
use crate::utils::cancel::CancelHandle;
use crate::utils::streaming::{StreamFactory, api_error_from_body};
use crate::utils::url::join_url;

const PROVIDER: &str = "anthropic";

/// Explicitly constructed Anthropic client; no ambient global state
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    config: AnthropicConfig,
    http: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
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

    fn messages_url(&self) -> String {
        join_url(&self.config.base_url, "/v1/messages")
    }
}

#[async_trait]
impl ChatCapability for AnthropicClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GenError> {
        let body = super::chat::build_request_body(&request, false)?;
        let response = self
            .http
            .post(self.messages_url())
            .headers(self.config.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_timeout(e.into(), PROVIDER))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(api_error_from_body(status, response.text().await.ok()));
        }
        let json = response
            .json()
            .await
            .map_err(|e| GenError::ParseError(format!("Failed to decode response body: {e}")))?;
        super::chat::parse_response(json)
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        cancel: Option<CancelHandle>,
    ) -> Result<GenerationStream, GenError> {
        let body = super::chat::build_request_body(&request, true)?;
        let builder = self
            .http
            .post(self.messages_url())
            .headers(self.config.headers()?)
            .json(&body);
        StreamFactory::create_chunk_stream(
            PROVIDER,
            builder,
            AnthropicEventConverter::new(),
            cancel,
        )
        .await
    }
}
