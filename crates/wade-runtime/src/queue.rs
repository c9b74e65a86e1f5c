#![forbid(unsafe_code)]

//! The single inbound queue feeding the checkpoint scheduler.
//!
//! Observers and background listeners never touch bound output directly.
//! They push [`Signal`]s through a [`SignalSender`]; the scheduler drains the
//! [`SignalQueue`] only at checkpoint boundaries.
//!
//! Senders are `Send + Clone`, so listener threads hold their own copy. A
//! shared flag records that something arrived since the last drain, which is
//! what "a checkpoint is scheduled" means.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use crate::observe::ChangeNotification;

/// Work item for the next checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// A watched location changed.
    Change(ChangeNotification),
    /// An external source (I/O completion, host event) asks for a checkpoint.
    Wake,
}

/// Producer side of the inbound queue.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<Signal>,
    pending: Arc<AtomicBool>,
}

impl SignalSender {
    /// Enqueue a signal. Returns `false` once the queue is gone.
    pub fn send(&self, signal: Signal) -> bool {
        if !self.pending.swap(true, Ordering::AcqRel) {
            tracing::trace!("checkpoint scheduled");
        }
        self.tx.send(signal).is_ok()
    }

    /// Enqueue a change notification.
    pub fn notify(&self, notification: ChangeNotification) -> bool {
        self.send(Signal::Change(notification))
    }

    /// Request a checkpoint without a change payload.
    pub fn wake(&self) -> bool {
        self.send(Signal::Wake)
    }

    /// Mark a checkpoint as due without enqueuing anything.
    pub(crate) fn schedule(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Whether anything arrived since the last drain.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Consumer side of the inbound queue.
#[derive(Debug)]
pub struct SignalQueue {
    rx: mpsc::Receiver<Signal>,
    pending: Arc<AtomicBool>,
}

impl SignalQueue {
    /// Everything currently queued, in arrival order. Clears the scheduled
    /// flag first, so signals racing with the drain schedule the next one.
    pub fn drain(&self) -> Vec<Signal> {
        self.pending.store(false, Ordering::Release);
        self.rx.try_iter().collect()
    }

    /// Block until one signal arrives or `timeout` passes.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Signal> {
        self.rx.recv_timeout(timeout).ok()
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Create a connected sender/queue pair.
#[must_use]
pub fn signal_channel() -> (SignalSender, SignalQueue) {
    let (tx, rx) = mpsc::channel();
    let pending = Arc::new(AtomicBool::new(false));
    (
        SignalSender {
            tx,
            pending: Arc::clone(&pending),
        },
        SignalQueue { rx, pending },
    )
}
