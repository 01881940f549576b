// src/engine/latch.rs

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};

/// One-shot countdown latch.
///
/// Opens when the count reaches zero, or when [`Countdown::open`] is called
/// (used to release waiters when the run aborts). Waiters block on a
/// one-slot channel; the token is put back after every successful receive
/// so later waiters pass straight through.
#[derive(Debug)]
pub(crate) struct Countdown {
    remaining: AtomicUsize,
    released: AtomicBool,
    signal_tx: Sender<()>,
    signal_rx: Receiver<()>,
}

impl Countdown {
    pub(crate) fn new(count: usize) -> Self {
        let (signal_tx, signal_rx) = bounded(1);
        let latch = Self {
            remaining: AtomicUsize::new(count),
            released: AtomicBool::new(false),
            signal_tx,
            signal_rx,
        };
        if count == 0 {
            latch.open();
        }
        latch
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Decrement once. Returns `true` for the call that reached zero.
    pub(crate) fn count_down(&self) -> bool {
        let reached_zero = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map(|previous| previous == 1)
            .unwrap_or(false);
        if reached_zero {
            self.open();
        }
        reached_zero
    }

    pub(crate) fn open(&self) {
        self.released.store(true, Ordering::Release);
        let _ = self.signal_tx.try_send(());
    }

    pub(crate) fn is_open(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Block until open or until `deadline`. Returns whether the latch is open.
    pub(crate) fn wait(&self, deadline: Option<Instant>) -> bool {
        if self.is_open() {
            return true;
        }
        let received = match deadline {
            Some(deadline) => self.signal_rx.recv_deadline(deadline).is_ok(),
            None => self.signal_rx.recv().is_ok(),
        };
        if received {
            let _ = self.signal_tx.try_send(());
        }
        self.is_open()
    }
}
