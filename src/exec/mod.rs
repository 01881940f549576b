// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] provides the [`Executor`] trait the engine submits work to.
//! - [`pool`] owns a fixed-size OS-thread [`WorkerPool`].
//! - [`tokio_backend`] adapts a Tokio runtime handle ([`TokioExecutor`]).
//! - [`privileged`] holds the FIFO handoff queue drained by the privileged
//!   thread.

pub mod backend;
pub mod pool;
pub mod privileged;
pub mod tokio_backend;

pub use backend::{Executor, Job};
pub use pool::{WorkerPool, default_parallelism};
pub use privileged::{PrivilegedExecutor, PrivilegedQueue};
pub use tokio_backend::TokioExecutor;
