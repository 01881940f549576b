// src/engine/listener.rs

//! Lifecycle hooks.
//!
//! Task callbacks fire on the thread executing the task. Fan-out to
//! dependents happens on that same thread right after `on_task_finish`
//! returns, so slow listeners delay dependent tasks.

use std::time::Duration;

use crate::dag::TaskInfo;

/// Time spent by a task between being queued and finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTiming {
    /// Queued until the body started.
    pub wait: Duration,
    /// Queued until the body returned.
    pub total: Duration,
}

impl TaskTiming {
    /// Time spent inside the body.
    pub fn run(&self) -> Duration {
        self.total.saturating_sub(self.wait)
    }
}

/// Per-task lifecycle callbacks. All methods default to no-ops.
pub trait TaskListener: Send + Sync {
    /// All predecessors finished and the task was queued on its executor.
    fn on_wait_start(&self, _task: &TaskInfo) {}

    /// The executor picked the task up; the body is about to run.
    fn on_task_start(&self, _task: &TaskInfo) {}

    /// The body returned and the task is `Finished`.
    fn on_task_finish(&self, _task: &TaskInfo, _timing: TaskTiming) {}
}

/// Whole-run lifecycle callbacks. All methods default to no-ops.
pub trait RunListener: Send + Sync {
    fn on_run_start(&self) {}

    /// Fires exactly once, after every task's completion has been counted.
    fn on_run_finish(&self) {}

    /// Every task that participates in the stage has finished.
    fn on_stage_finish(&self) {}
}
