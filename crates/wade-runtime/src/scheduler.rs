#![forbid(unsafe_code)]

//! Checkpoint scheduler.
//!
//! A checkpoint is the unit of update propagation. Observers push
//! notifications into one inbound queue; a checkpoint drains it, works out
//! which bindings read a changed location, and evaluates each of those
//! bindings once, in registration order.
//!
//! # Invariants
//!
//! - Any number of notifications for one binding between two checkpoints
//!   cause exactly one evaluation, which sees the final model state.
//! - Notifications raised while a checkpoint is running (a binding target
//!   writing to the model) stay queued for the next checkpoint.
//! - A newly bound value is evaluated by the next checkpoint.
//!
//! # Failure Modes
//!
//! - An evaluation error is logged at `warn`, recorded in the
//!   [`CheckpointReport`], and does not stop the remaining bindings.
//! - Background listeners outlive nothing: once the scheduler is dropped
//!   their wakes are discarded and they exit when their source closes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wade_template::ValueDescriptor;

use crate::binding::{BindingId, BindingTarget, Evaluator, PathEvaluator};
use crate::config::SchedulerConfig;
use crate::error::{EvalError, WatchError};
use crate::model::ModelObject;
use crate::observe::WatchId;
use crate::queue::{Signal, SignalQueue, SignalSender, signal_channel};
use crate::registry::{WatchRegistry, WatchTarget};

/// One binding that failed during a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingFailure {
    pub binding: BindingId,
    pub error: EvalError,
}

/// What a checkpoint did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointReport {
    /// Checkpoint sequence number, starting at 1.
    pub sequence: u64,
    /// Change notifications drained.
    pub notifications: usize,
    /// Wake requests drained.
    pub wakes: usize,
    /// Bindings evaluated successfully, in evaluation order.
    pub evaluated: Vec<BindingId>,
    /// Bindings whose evaluation failed.
    pub failures: Vec<BindingFailure>,
}

impl CheckpointReport {
    /// Nothing was drained and nothing was evaluated.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.notifications == 0
            && self.wakes == 0
            && self.evaluated.is_empty()
            && self.failures.is_empty()
    }
}

/// Thread-safe handle for requesting checkpoints from other threads.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    sender: SignalSender,
}

impl SchedulerHandle {
    /// Ask for a checkpoint. Returns `false` once the scheduler is gone.
    pub fn wake(&self) -> bool {
        self.sender.wake()
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.sender.is_scheduled()
    }
}

struct Binding {
    value: ValueDescriptor,
    scope: ModelObject,
    watches: Vec<WatchId>,
    target: Box<dyn BindingTarget>,
    fresh: bool,
}

/// Owner of the watch registry, the bindings and the inbound queue.
pub struct Scheduler {
    config: SchedulerConfig,
    sender: SignalSender,
    queue: SignalQueue,
    registry: WatchRegistry,
    evaluator: Box<dyn Evaluator>,
    bindings: BTreeMap<BindingId, Binding>,
    next_binding: u64,
    sequence: u64,
}

impl Scheduler {
    /// Scheduler that evaluates expressions as model paths.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_evaluator(config, PathEvaluator)
    }

    /// Scheduler with a host expression evaluator.
    pub fn with_evaluator(config: SchedulerConfig, evaluator: impl Evaluator + 'static) -> Self {
        let (sender, queue) = signal_channel();
        Self {
            config,
            registry: WatchRegistry::new(sender.clone()),
            sender,
            queue,
            evaluator: Box::new(evaluator),
            bindings: BTreeMap::new(),
            next_binding: 1,
            sequence: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Watch a target without a binding. Its notifications are drained and
    /// counted by checkpoints.
    pub fn watch(&mut self, target: WatchTarget) -> Result<WatchId, WatchError> {
        self.registry.watch(target)
    }

    /// Force-close a watch. Idempotent.
    pub fn unwatch(&mut self, id: WatchId) -> bool {
        self.registry.unwatch(id)
    }

    /// Register a bound value.
    ///
    /// Every path the value's expressions depend on is watched on `scope`.
    /// The value is evaluated by the next checkpoint.
    pub fn bind(
        &mut self,
        value: ValueDescriptor,
        scope: &ModelObject,
        target: impl BindingTarget + 'static,
    ) -> Result<BindingId, WatchError> {
        let mut watches: Vec<WatchId> = Vec::new();
        for expression in value.expressions() {
            for path in self.evaluator.dependencies(expression) {
                match self.registry.watch(WatchTarget::field(scope, path)) {
                    Ok(id) => watches.push(id),
                    Err(err) => {
                        for id in watches {
                            self.registry.release(id);
                        }
                        return Err(err);
                    }
                }
            }
        }

        let id = BindingId(self.next_binding);
        self.next_binding += 1;
        tracing::debug!(binding = %id, watches = watches.len(), "binding registered");
        self.bindings.insert(
            id,
            Binding {
                value,
                scope: scope.clone(),
                watches,
                target: Box::new(target),
                fresh: true,
            },
        );
        self.sender.schedule();
        Ok(id)
    }

    /// Remove a binding and release its watches. Idempotent.
    pub fn unbind(&mut self, id: BindingId) -> bool {
        let Some(binding) = self.bindings.remove(&id) else {
            return false;
        };
        for watch in binding.watches {
            self.registry.release(watch);
        }
        tracing::debug!(binding = %id, "binding removed");
        true
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Whether a checkpoint is due.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.queue.is_scheduled()
    }

    /// Flush all pending notifications now.
    pub fn checkpoint(&mut self) -> CheckpointReport {
        self.checkpoint_with(Vec::new())
    }

    /// Checkpoint that also processes signals already taken off the queue.
    fn checkpoint_with(&mut self, received: Vec<Signal>) -> CheckpointReport {
        self.sequence += 1;
        let span = tracing::debug_span!("checkpoint", seq = self.sequence);
        let _guard = span.enter();

        let mut report = CheckpointReport {
            sequence: self.sequence,
            ..CheckpointReport::default()
        };
        let mut dirty: BTreeSet<WatchId> = BTreeSet::new();
        for signal in received.into_iter().chain(self.queue.drain()) {
            match signal {
                Signal::Change(notification) => {
                    report.notifications += 1;
                    dirty.insert(notification.watch);
                }
                Signal::Wake => report.wakes += 1,
            }
        }

        let evaluator = &self.evaluator;
        for (&id, binding) in &mut self.bindings {
            let affected = binding.fresh || binding.watches.iter().any(|w| dirty.contains(w));
            if !affected {
                continue;
            }
            binding.fresh = false;
            let scope = &binding.scope;
            match binding
                .value
                .evaluate(|expression| evaluator.evaluate(expression, scope))
            {
                Ok(value) => {
                    binding.target.apply(&value);
                    report.evaluated.push(id);
                }
                Err(error) => {
                    tracing::warn!(binding = %id, error = %error, "binding evaluation failed");
                    report.failures.push(BindingFailure { binding: id, error });
                }
            }
        }

        tracing::debug!(
            notifications = report.notifications,
            wakes = report.wakes,
            evaluated = report.evaluated.len(),
            failures = report.failures.len(),
            "checkpoint complete"
        );
        report
    }

    /// Run a checkpoint if one is due and automatic checkpoints are on.
    pub fn run_scheduled(&mut self) -> Option<CheckpointReport> {
        if self.config.auto_checkpoint && self.is_scheduled() {
            Some(self.checkpoint())
        } else {
            None
        }
    }

    /// Block until something is queued, then run a checkpoint.
    ///
    /// Returns `None` on timeout. Automatic checkpoints must be enabled.
    pub fn wait_for_checkpoint(&mut self, timeout: Duration) -> Option<CheckpointReport> {
        if !self.config.auto_checkpoint {
            return None;
        }
        if self.is_scheduled() {
            return Some(self.checkpoint());
        }
        let first = self.queue.recv_timeout(timeout)?;
        Some(self.checkpoint_with(vec![first]))
    }

    /// Handle for waking the scheduler from other threads.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            sender: self.sender.clone(),
        }
    }

    /// Forward every event from `source` as a wake request, on a named
    /// background thread. The thread exits when `source` disconnects.
    pub fn spawn_listener<T: Send + 'static>(
        &self,
        name: &str,
        source: mpsc::Receiver<T>,
    ) -> io::Result<JoinHandle<()>> {
        let handle = self.handle();
        let thread_name = self.config.listener_thread_name(name);
        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                tracing::debug!(listener = %thread_name, "listener started");
                for _event in source {
                    if !handle.wake() {
                        break;
                    }
                }
                tracing::debug!(listener = %thread_name, "listener stopped");
            })
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.registry.close_all();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("bindings", &self.bindings.len())
            .field("registry", &self.registry)
            .field("sequence", &self.sequence)
            .finish()
    }
}
