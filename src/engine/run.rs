// src/engine/run.rs

//! Per-task execution: start, execute, fan out.
//!
//! [`Run`] is shared (`Arc`) between the orchestrator and every queued job.
//! It owns the frozen graph and the executors, and reports completions
//! one way, through the [`CompletionSink`] it was constructed with.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, warn};

use crate::dag::{TaskGraph, TaskId, TaskState};
use crate::engine::listener::{TaskListener, TaskTiming};
use crate::errors::{BootError, Result};
use crate::exec::pool::panic_message;
use crate::exec::{Executor, Job, PrivilegedExecutor};
use crate::types::FailurePolicy;

/// Receiver of task completion reports.
pub(crate) trait CompletionSink: Send + Sync {
    /// The task reached `Finished`. Called before its dependents are released.
    fn task_finished(&self, graph: &TaskGraph, task: TaskId);

    /// The task body failed under [`FailurePolicy::Strict`].
    fn task_failed(&self, graph: &TaskGraph, task: TaskId, error: BootError);

    /// A structural error surfaced on a worker thread.
    fn run_aborted(&self, error: BootError);
}

pub(crate) struct Run {
    graph: TaskGraph,
    pool: Arc<dyn Executor>,
    privileged: PrivilegedExecutor,
    policy: FailurePolicy,
    listeners: Vec<Arc<dyn TaskListener>>,
    sink: Arc<dyn CompletionSink>,
}

impl Run {
    pub(crate) fn new(
        graph: TaskGraph,
        pool: Arc<dyn Executor>,
        privileged: PrivilegedExecutor,
        policy: FailurePolicy,
        listeners: Vec<Arc<dyn TaskListener>>,
        sink: Arc<dyn CompletionSink>,
    ) -> Self {
        Self {
            graph,
            pool,
            privileged,
            policy,
            listeners,
            sink,
        }
    }

    pub(crate) fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Idle -> Waiting, then submit the task to its executor.
    ///
    /// Any other starting state is an error: a correct acyclic graph starts
    /// each task exactly once, so a second start means a cycle or a re-run.
    pub(crate) fn start_task(self: &Arc<Self>, id: TaskId) -> Result<()> {
        let node = self.graph.node(id);
        if !node.transition(TaskState::Idle, TaskState::Waiting) {
            return Err(BootError::TaskStartedTwice(node.info.name.clone()));
        }

        let queued_at = Instant::now();
        for listener in &self.listeners {
            listener.on_wait_start(&node.info);
        }

        let run = Arc::clone(self);
        let job: Job = Box::new(move || run.execute(id, queued_at));

        if node.info.must_run_on_privileged {
            debug!(task = %node.info.name, "queued on privileged thread");
            self.privileged.execute(job);
        } else {
            debug!(task = %node.info.name, "queued on worker pool");
            self.pool.execute(job);
        }
        Ok(())
    }

    fn execute(self: Arc<Self>, id: TaskId, queued_at: Instant) {
        let node = self.graph.node(id);
        let info = &node.info;

        node.set_state(TaskState::Running);
        let wait = queued_at.elapsed();
        for listener in &self.listeners {
            listener.on_task_start(info);
        }

        let outcome = match node.take_body() {
            Some(body) => match panic::catch_unwind(AssertUnwindSafe(body)) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(format!("{err:#}")),
                Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
            },
            None => Ok(()),
        };

        if let Err(message) = outcome {
            match self.policy {
                FailurePolicy::Strict => {
                    error!(task = %info.name, %message, "task failed; aborting run");
                    let err = BootError::TaskFailed {
                        task: info.name.clone(),
                        message,
                    };
                    self.sink.task_failed(&self.graph, id, err);
                    return;
                }
                FailurePolicy::Lenient => {
                    warn!(task = %info.name, %message, "task failed; continuing");
                }
            }
        }

        node.set_state(TaskState::Finished);
        let timing = TaskTiming {
            wait,
            total: queued_at.elapsed(),
        };
        for listener in &self.listeners {
            listener.on_task_finish(info, timing);
        }

        self.sink.task_finished(&self.graph, id);
        self.fan_out(id);
    }

    /// Release each successor, in priority order. Successors whose last
    /// predecessor this was are started from the current thread.
    fn fan_out(self: &Arc<Self>, id: TaskId) {
        for &succ in self.graph.successors(id) {
            if !self.graph.node(succ).release_one() {
                continue;
            }
            if let Err(err) = self.start_task(succ) {
                error!(task = %self.graph.info(succ).name, error = %err, "could not start dependent task");
                self.sink.run_aborted(err);
            }
        }
    }
}
