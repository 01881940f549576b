// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the frozen task graph
//! - the worker executor and the privileged-thread queue
//! - completion counters and the must-wait latch
//! - task and run listeners
//!
//! [`Startup`] is the public face. The per-task state machine lives in
//! `run`; the counters it reports into live in `bookkeeping`.

mod bookkeeping;
mod latch;
pub mod listener;
pub mod monitor;
mod run;
pub mod startup;

pub use listener::{RunListener, TaskListener, TaskTiming};
pub use monitor::{TracingRunListener, TracingTaskListener};
pub use startup::{Startup, StartupBuilder, WaitOutcome};
