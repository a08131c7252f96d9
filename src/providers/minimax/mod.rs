//! MiniMax provider
//!
//! OpenAI-compatible chat with streaming, long-running video generation,
//! and the account credit endpoint.

mod chat;
mod client;
mod config;
mod streaming;
mod video;

pub use client::MinimaxClient;
pub use config::MinimaxConfig;
pub use streaming::MinimaxEventConverter;
