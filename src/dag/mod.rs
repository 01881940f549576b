// src/dag/mod.rs

//! Task graph representation.
//!
//! - [`task`] defines the registration record ([`TaskSpec`]), the read-only
//!   metadata view ([`TaskInfo`]) and the per-task lifecycle state.
//! - [`graph`] resolves dependency names into edges, rejects broken graphs
//!   and computes the priority-ordered start frontier.

pub mod graph;
pub mod task;

pub use graph::{GraphBuilder, TaskGraph};
pub use task::{TaskBody, TaskId, TaskInfo, TaskName, TaskSpec, TaskState};
