// src/exec/privileged.rs

//! Handoff queue for work that must run on the privileged thread.
//!
//! Worker threads submit jobs through a [`PrivilegedExecutor`]; nothing runs
//! them until the privileged thread pulls them out of the
//! [`PrivilegedQueue`] (see [`crate::engine::Startup::wait`]). Jobs that are
//! never pulled are never executed.

use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, warn};

use crate::exec::backend::{Executor, Job};

/// Message travelling through the privileged queue.
pub(crate) enum Handoff {
    /// A job to run on the privileged thread.
    Run(Job),
    /// Nothing to run; the receiver should re-check the run state.
    Wake,
}

/// FIFO channel drained by the privileged thread.
#[derive(Debug)]
pub struct PrivilegedQueue {
    tx: Sender<Handoff>,
    rx: Receiver<Handoff>,
}

impl PrivilegedQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Executor handle that enqueues onto this queue.
    pub fn executor(&self) -> PrivilegedExecutor {
        PrivilegedExecutor {
            tx: self.tx.clone(),
        }
    }

    /// Number of queued messages, including wake-ups.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Block for the next message. `None` means the deadline passed.
    pub(crate) fn next(&self, deadline: Option<Instant>) -> Option<Handoff> {
        match deadline {
            Some(deadline) => match self.rx.recv_deadline(deadline) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => None,
            },
            // `self.tx` keeps the channel connected, so this only returns
            // once something arrives.
            None => self.rx.recv().ok(),
        }
    }

    /// Drop every queued message without running it. Returns how many jobs
    /// were discarded.
    pub(crate) fn discard(&self) -> usize {
        self.rx
            .try_iter()
            .filter(|msg| matches!(msg, Handoff::Run(_)))
            .count()
    }
}

impl Default for PrivilegedQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending half of a [`PrivilegedQueue`].
#[derive(Clone)]
pub struct PrivilegedExecutor {
    tx: Sender<Handoff>,
}

impl PrivilegedExecutor {
    /// Nudge a thread blocked in [`PrivilegedQueue::next`].
    pub(crate) fn wake(&self) {
        if self.tx.send(Handoff::Wake).is_err() {
            debug!("privileged queue closed; wake-up not delivered");
        }
    }
}

impl std::fmt::Debug for PrivilegedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivilegedExecutor")
            .field("queued", &self.tx.len())
            .finish()
    }
}

impl Executor for PrivilegedExecutor {
    fn execute(&self, job: Job) {
        if self.tx.send(Handoff::Run(job)).is_err() {
            warn!("privileged queue closed; dropping job");
        }
    }
}
