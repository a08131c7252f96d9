//! MiniMax client

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::error::{GenError, classify_timeout};
use crate::metadata::{AccountSnapshot, MetadataCache};
use crate::providers::minimax::config::MinimaxConfig;
use crate::providers::minimax::streaming::MinimaxEventConverter;
use crate::stream::GenerationStream;
use crate::traits::ChatCapability;
use crate::types::{ChatRequest, ChatResponse};
use crate::utils::cancel::CancelHandle;
use crate::utils::streaming::{StreamFactory, api_error_from_body};
use crate::utils::url::join_url;

const PROVIDER: &str = "minimax";

/// Explicitly constructed MiniMax client; no ambient global state
#[derive(Clone)]
pub struct MinimaxClient {
    config: MinimaxConfig,
    http: reqwest::Client,
    metadata: Arc<MetadataCache>,
}

impl MinimaxClient {
    pub fn new(config: MinimaxConfig) -> Self {
        let metadata = Arc::new(MetadataCache::new(config.metadata_ttl));
        Self {
            config,
            http: reqwest::Client::new(),
            metadata,
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, pools).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn headers(&self) -> Result<HeaderMap, GenError> {
        self.config.headers()
    }

    /// Account snapshot (remaining credits, model list) through the
    /// read-through cache. Concurrent readers share one fetch.
    pub async fn account_snapshot(&self) -> Result<Arc<AccountSnapshot>, GenError> {
        let url = join_url(&self.config.base_url, "/account/credits");
        let http = self.http.clone();
        let headers = self.headers()?;
        self.metadata
            .get_or_refresh(|| async move {
                let response = http
                    .get(&url)
                    .headers(headers)
                    .send()
                    .await
                    .map_err(|e| classify_timeout(e.into(), PROVIDER))?;
                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    return Err(api_error_from_body(status, response.text().await.ok()));
                }
                response.json().await.map_err(|e| {
                    GenError::ParseError(format!("Malformed account snapshot: {e}"))
                })
            })
            .await
    }

    /// Remaining prepaid credits, served from the cache while fresh.
    pub async fn remaining_credits(&self) -> Result<f64, GenError> {
        Ok(self.account_snapshot().await?.remaining_credits)
    }
}

#[async_trait]
impl ChatCapability for MinimaxClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GenError> {
        let body = super::chat::build_request_body(&request, false)?;
        let url = join_url(&self.config.base_url, "/chat/completions");
        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
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
        let url = join_url(&self.config.base_url, "/chat/completions");
        let builder = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body);
        StreamFactory::create_chunk_stream(PROVIDER, builder, MinimaxEventConverter::new(), cancel)
            .await
    }
}
