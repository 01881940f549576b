// src/engine/bookkeeping.rs

//! Completion counters for a startup run.
//!
//! Tasks never touch these counters directly: the execution core reports
//! each finished (or failed) task through [`CompletionSink`], and
//! [`RunBook`] is the only implementation. Every counter moves through an
//! atomic decrement-and-check, so "reached zero" is observed by exactly one
//! caller and each terminal notification fires once.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use crate::dag::{TaskGraph, TaskId};
use crate::engine::latch::Countdown;
use crate::engine::listener::RunListener;
use crate::engine::run::CompletionSink;
use crate::errors::{BootError, Result};
use crate::exec::PrivilegedExecutor;
use crate::types::{FailurePolicy, RunState};

pub(crate) struct RunBook {
    state: AtomicU8,
    policy: FailurePolicy,
    /// Tasks that have not finished.
    remaining: AtomicUsize,
    /// Stage tasks that have not finished.
    stage_remaining: AtomicUsize,
    /// Present only when at least one task must run on the privileged thread.
    privileged_remaining: Option<AtomicUsize>,
    /// Present only when at least one task asks the privileged thread to wait.
    must_wait: Option<Countdown>,
    /// Opens once the run finished or aborted.
    finished: Countdown,
    listeners: Vec<Arc<dyn RunListener>>,
    waker: PrivilegedExecutor,
    aborted: AtomicBool,
    failure: Mutex<Option<BootError>>,
}

impl RunBook {
    pub(crate) fn new(
        graph: &TaskGraph,
        policy: FailurePolicy,
        listeners: Vec<Arc<dyn RunListener>>,
        waker: PrivilegedExecutor,
    ) -> Self {
        let mut in_stage = 0;
        let mut privileged = 0;
        let mut waits = 0;
        for id in graph.ids() {
            let info = graph.info(id);
            if info.in_stage {
                in_stage += 1;
            }
            if info.must_run_on_privileged {
                privileged += 1;
            }
            if info.wait_on_privileged {
                waits += 1;
            }
        }

        Self {
            state: AtomicU8::new(RunState::NotStarted.as_u8()),
            policy,
            remaining: AtomicUsize::new(graph.len()),
            stage_remaining: AtomicUsize::new(in_stage),
            privileged_remaining: (privileged > 0).then(|| AtomicUsize::new(privileged)),
            must_wait: (waits > 0).then(|| Countdown::new(waits)),
            finished: Countdown::new(1),
            listeners,
            waker,
            aborted: AtomicBool::new(false),
            failure: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// NotStarted -> Running. Fails on every later call.
    pub(crate) fn begin(&self) -> Result<()> {
        self.state
            .compare_exchange(
                RunState::NotStarted.as_u8(),
                RunState::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|_| BootError::RunAlreadyStarted)
    }

    pub(crate) fn notify_run_start(&self) {
        for listener in &self.listeners {
            listener.on_run_start();
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub(crate) fn pending_privileged(&self) -> usize {
        self.privileged_remaining
            .as_ref()
            .map(|c| c.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    pub(crate) fn pending_waits(&self) -> usize {
        self.must_wait.as_ref().map(Countdown::remaining).unwrap_or(0)
    }

    pub(crate) fn must_wait(&self) -> Option<&Countdown> {
        self.must_wait.as_ref()
    }

    pub(crate) fn finished(&self) -> &Countdown {
        &self.finished
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Surface the run's fatal error, if any.
    ///
    /// The first caller receives the original error; later callers get
    /// [`BootError::RunAborted`].
    pub(crate) fn check_failure(&self) -> Result<()> {
        if !self.is_aborted() {
            return Ok(());
        }
        let taken = match self.failure.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        Err(taken.unwrap_or(BootError::RunAborted))
    }

    /// Record a fatal error and release everything blocked in `wait`.
    fn abort(&self, error: BootError) {
        {
            let mut guard = match self.failure.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if self.aborted.swap(true, Ordering::AcqRel) {
                debug!(%error, "run already aborted; dropping secondary error");
                return;
            }
            *guard = Some(error);
        }

        if let Some(latch) = &self.must_wait {
            latch.open();
        }
        self.finished.open();
        self.waker.wake();
    }

    /// Per-flag counters shared by the success and failure paths.
    fn release_waiters(&self, graph: &TaskGraph, task: TaskId) {
        let info = graph.info(task);
        if info.wait_on_privileged {
            if let Some(latch) = &self.must_wait {
                latch.count_down();
            }
        }
        if info.must_run_on_privileged {
            if let Some(counter) = &self.privileged_remaining {
                decrement(counter);
            }
        }
    }

    fn notify_stage_finish(&self) {
        info!("all stage tasks finished");
        for listener in &self.listeners {
            listener.on_stage_finish();
        }
    }

    fn finish_run(&self, graph: &TaskGraph) {
        self.state.store(RunState::Finished.as_u8(), Ordering::Release);
        info!(tasks = graph.len(), "all tasks finished; run complete");

        for listener in &self.listeners {
            listener.on_run_finish();
        }

        let unfinished = graph.unfinished();
        if !unfinished.is_empty() {
            match self.policy {
                FailurePolicy::Strict => {
                    error!(?unfinished, "run finished with unfinished tasks");
                    self.abort(BootError::Inconsistent(unfinished));
                }
                FailurePolicy::Lenient => {
                    warn!(?unfinished, "run finished with unfinished tasks");
                }
            }
        }
        self.finished.count_down();
    }
}

impl CompletionSink for RunBook {
    fn task_finished(&self, graph: &TaskGraph, task: TaskId) {
        self.release_waiters(graph, task);

        if graph.info(task).in_stage && decrement(&self.stage_remaining) == Some(0) {
            self.notify_stage_finish();
        }

        let left = decrement(&self.remaining);
        debug!(task = %graph.info(task).name, remaining = ?left, "task completion counted");
        if left == Some(0) {
            self.finish_run(graph);
        }
    }

    fn task_failed(&self, graph: &TaskGraph, task: TaskId, error: BootError) {
        self.release_waiters(graph, task);
        self.abort(error);
    }

    fn run_aborted(&self, error: BootError) {
        self.abort(error);
    }
}

/// Decrement unless already zero. Returns the new value.
fn decrement(counter: &AtomicUsize) -> Option<usize> {
    match counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1)) {
        Ok(previous) => Some(previous - 1),
        Err(_) => {
            warn!("completion counter already at zero");
            None
        }
    }
}
