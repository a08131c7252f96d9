//! Anthropic provider
//!
//! Chat over the Messages API with block-event streaming.

mod chat;
mod client;
mod config;
mod streaming;

pub use client::AnthropicClient;
pub use config::AnthropicConfig;
pub use streaming::AnthropicEventConverter;
