// src/exec/tokio_backend.rs

use tokio::runtime::Handle;

use crate::exec::backend::{Executor, Job};

/// Runs jobs on a Tokio runtime's blocking pool.
///
/// Task bodies are ordinary blocking closures, so they go through
/// `spawn_blocking` rather than the async worker threads.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is currently inside.
    ///
    /// Panics when called outside a Tokio runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // Completion is reported by the job itself.
        let _ = self.handle.spawn_blocking(job);
    }
}
