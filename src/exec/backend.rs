// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The engine only ever *submits* work; it never waits on an executor. This
//! makes it easy to swap in a fake executor in tests while keeping the
//! production implementations in [`super::pool`] and [`super::tokio_backend`].

use std::sync::Arc;

/// A unit of work submitted to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Trait abstracting how task work is executed.
///
/// Implementations give no ordering guarantee beyond best-effort FIFO.
pub trait Executor: Send + Sync {
    /// Submit a job. Must not block on the job itself.
    fn execute(&self, job: Job);
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}
