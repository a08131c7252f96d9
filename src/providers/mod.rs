//! Provider implementations
//!
//! Each provider module contains its configuration, its chunk normalizer,
//! and the capability implementations its API supports.

#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "minimax")]
pub mod minimax;
#[cfg(feature = "openai")]
pub mod openai;
