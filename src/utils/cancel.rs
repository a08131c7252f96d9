//! Cancellation utilities
//!
//! Provides first-class cancellation handles for streams and long-running
//! operations.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a new cancel handle that can be shared across tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Any stream or long-running operation observing
    /// this handle stops before its next read. Dropping the cancelled stream
    /// closes the underlying HTTP connection so providers stop generating.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
