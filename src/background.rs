//! Background task registry for tracking spawned async tasks.
//!
//! The abandonment sweeper and any tasks spawned during request handling are
//! registered here so they can be awaited during graceful shutdown.

// std::sync::Mutex is correct here—lock is never held across .await points.
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{info, warn};

// ============================================================================
// BackgroundTasks
// ============================================================================

/// Registry for background tasks that should be awaited on shutdown.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    /// Create a new empty task registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Spawn a background task and register its handle.
    ///
    /// Registration is synchronous so the handle is tracked before this
    /// method returns, even for fast-completing tasks.
    pub fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);

        let mut guard = self.handles.lock().expect("mutex poisoned");
        guard.retain(|h| !h.is_finished());
        guard.push(handle);
    }

    /// Wait for all registered background tasks to complete.
    pub async fn shutdown(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock().expect("mutex poisoned"));

        if handles.is_empty() {
            return;
        }

        info!(count = handles.len(), "Waiting for background tasks");
        for (i, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                warn!(task = i, error = %e, "Background task panicked");
            }
        }
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        let mut guard = self.handles.lock().expect("mutex poisoned");
        guard.retain(|h| !h.is_finished());
        guard.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
