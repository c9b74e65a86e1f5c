#![forbid(unsafe_code)]

//! Reactive runtime for Wade.
//!
//! # Role
//! Keeps bound output in sync with an observable model:
//!
//! 1. [`model`] hosts the observable data ([`ModelObject`], [`ObservableSeq`],
//!    [`ObservableMap`]).
//! 2. [`observe`] installs the observation strategy matching a target's kind
//!    and turns host events into [`ChangeNotification`]s.
//! 3. [`registry`] owns the live observations, one per target.
//! 4. [`scheduler`] batches notifications into checkpoints and re-evaluates
//!    affected bindings exactly once per checkpoint.
//!
//! # Threading
//! The model and scheduler live on one thread. Other threads interact only
//! through [`SchedulerHandle`] or listener threads started with
//! [`Scheduler::spawn_listener`], both of which enqueue wake requests.
//!
//! # Example
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use wade_runtime::{ModelObject, Scheduler, SchedulerConfig};
//! use wade_template::compile_text;
//!
//! let model = ModelObject::new().with("name", "world");
//! let mut scheduler = Scheduler::new(SchedulerConfig::default());
//! let rendered = Rc::new(RefCell::new(String::new()));
//! let out = Rc::clone(&rendered);
//! let greeting = compile_text("Hello, {{name}}!").unwrap();
//! scheduler
//!     .bind(greeting, &model, move |v: &serde_json::Value| {
//!         *out.borrow_mut() = v.as_str().unwrap_or_default().to_string();
//!     })
//!     .unwrap();
//!
//! scheduler.checkpoint();
//! assert_eq!(*rendered.borrow(), "Hello, world!");
//!
//! model.set("name", "Wade");
//! scheduler.checkpoint();
//! assert_eq!(*rendered.borrow(), "Hello, Wade!");
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod model;
pub mod observe;
pub mod queue;
pub mod registry;
pub mod scheduler;

pub use binding::{BindingId, BindingTarget, Evaluator, PathEvaluator};
pub use config::SchedulerConfig;
pub use error::{EvalError, WatchError};
pub use model::{
    FieldWrite, HostSubscription, MapWrite, ModelObject, ObservableMap, ObservableSeq, Path,
    PathStep, SeqSplice, Value, ValueKind,
};
pub use observe::{Change, ChangeNotification, Observation, WatchId};
pub use queue::{Signal, SignalQueue, SignalSender, signal_channel};
pub use registry::{WatchRegistry, WatchTarget};
pub use scheduler::{BindingFailure, CheckpointReport, Scheduler, SchedulerHandle};
