//! Utility modules for omnigen
//!
//! This module contains the streaming infrastructure shared by all
//! providers and small supporting helpers.

pub mod async_completion;
pub mod cancel;
pub mod http_headers;
pub mod sse_stream;
pub mod streaming;
pub mod url;

pub use sse_stream::{SseEvent, SseEventStream, SseFrameParser, SseStreamExt};
pub use streaming::*;
pub use url::*;
