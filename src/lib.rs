//! # omnigen
//!
//! A unified multi-provider generation client for Rust. Heterogeneous
//! vendor APIs for text, image, video and embedding generation are
//! normalized into one request/response model and one canonical stream of
//! [`stream::StreamChunk`] values.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use omnigen::prelude::*;
//!
//! # async fn run() -> Result<(), GenError> {
//! let client = OpenAiClient::new(OpenAiConfig::from_env()?);
//! let request = ChatRequest::new("gpt-4.1", vec![ChatMessage::user("Hello!")]);
//!
//! let mut stream = client.chat_stream(request, None).await?;
//! while let Some(chunk) = stream.next().await {
//!     match chunk? {
//!         StreamChunk::Text { text } => print!("{text}"),
//!         StreamChunk::Finish { reason, .. } => println!("\n[{reason:?}]"),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Design
//!
//! Streams are pull-based: the provider connection advances only when the
//! caller requests the next chunk. The library performs no retries and no
//! provider routing; it consumes a byte stream (or a single JSON response)
//! and produces canonical domain values or canonical errors. Timeouts from
//! any transport layer are classified into one actionable error type.

pub mod error;
pub mod metadata;
pub mod providers;
pub mod stream;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::{GenError, TimeoutError, classify_timeout, is_timeout_error};
pub use stream::{GenerationStream, StreamChunk, collect_response};

/// Convenient re-exports for typical usage
pub mod prelude {
    pub use crate::error::{GenError, TimeoutError};
    pub use crate::stream::{GenerationStream, StreamChunk, collect_response};
    pub use crate::traits::{
        ChatCapability, EmbeddingCapability, ImageGenerationCapability, VideoGenerationCapability,
    };
    pub use crate::types::{
        ChatMessage, ChatRequest, ChatResponse, EmbeddingRequest, FinishReason,
        ImageGenerationRequest, MediaAsset, MessageRole, Tool, ToolCall, ToolInput, ToolOutput,
        Usage, VideoGenerationRequest, VideoGenerationResult, Warning,
    };
    pub use crate::utils::cancel::CancelHandle;

    #[cfg(feature = "anthropic")]
    pub use crate::providers::anthropic::{AnthropicClient, AnthropicConfig};
    #[cfg(feature = "minimax")]
    pub use crate::providers::minimax::{MinimaxClient, MinimaxConfig};
    #[cfg(feature = "openai")]
    pub use crate::providers::openai::{OpenAiClient, OpenAiConfig};

    pub use futures_util::StreamExt;
}
