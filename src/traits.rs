//! Capability traits implemented by provider clients
//!
//! Each provider implements the subset of capabilities its API supports.
//! Callers program against these traits; the unified types keep provider
//! differences out of application code.

use async_trait::async_trait;

use crate::error::GenError;
use crate::stream::GenerationStream;
use crate::types::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, ImageGenerationRequest,
    ImageGenerationResponse, VideoGenerationRequest, VideoGenerationResult,
};
use crate::utils::cancel::CancelHandle;

/// Text generation, non-streaming and streaming
#[async_trait]
pub trait ChatCapability: Send + Sync {
    /// Send a chat request and wait for the complete response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GenError>;

    /// Send a chat request and stream canonical chunks.
    ///
    /// The optional cancellation handle is checked before every frame read.
    async fn chat_stream(
        &self,
        request: ChatRequest,
        cancel: Option<CancelHandle>,
    ) -> Result<GenerationStream, GenError>;
}

/// Embedding generation
#[async_trait]
pub trait EmbeddingCapability: Send + Sync {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, GenError>;
}

/// Image generation
#[async_trait]
pub trait ImageGenerationCapability: Send + Sync {
    async fn generate_image(
        &self,
        request: ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GenError>;
}

/// Long-running video generation
#[async_trait]
pub trait VideoGenerationCapability: Send + Sync {
    /// Generate a video, blocking until the provider reports the terminal
    /// frame. Needs a much longer caller deadline than chat operations.
    async fn generate_video(
        &self,
        request: VideoGenerationRequest,
        cancel: Option<CancelHandle>,
    ) -> Result<VideoGenerationResult, GenError>;
}
