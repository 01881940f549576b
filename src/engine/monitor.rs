// src/engine/monitor.rs

//! Built-in listeners that report through `tracing`.

use tracing::{debug, info};

use crate::dag::TaskInfo;
use crate::engine::listener::{RunListener, TaskListener, TaskTiming};

/// Logs task start/finish with wait and cost in milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTaskListener;

impl TaskListener for TracingTaskListener {
    fn on_wait_start(&self, task: &TaskInfo) {
        debug!(task = %task.name, "task queued");
    }

    fn on_task_start(&self, task: &TaskInfo) {
        info!(
            task = %task.name,
            privileged = task.must_run_on_privileged,
            "task start"
        );
    }

    fn on_task_finish(&self, task: &TaskInfo, timing: TaskTiming) {
        info!(
            task = %task.name,
            wait_ms = timing.wait.as_millis() as u64,
            cost_ms = timing.run().as_millis() as u64,
            "task end"
        );
    }
}

/// Logs run and stage lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRunListener;

impl RunListener for TracingRunListener {
    fn on_run_start(&self) {
        info!("startup run started");
    }

    fn on_run_finish(&self) {
        info!("startup run finished");
    }

    fn on_stage_finish(&self) {
        info!("startup stage finished");
    }
}
