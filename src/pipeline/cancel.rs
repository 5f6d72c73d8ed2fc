// src/pipeline/cancel.rs

//! Cooperative cancellation for a crawl run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable stop flag shared between the crawler and whoever may stop it.
///
/// The crawler polls it between queue entries only, so a page already in
/// flight always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    stop_requested: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn cancel(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}
