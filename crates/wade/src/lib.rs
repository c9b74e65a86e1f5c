#![forbid(unsafe_code)]

//! Wade: reactive templates with record/replay hydration.
//!
//! This crate re-exports the workspace crates and adds the pieces an
//! application needs around them:
//!
//! - [`App`]: a page's scheduler, with compile-and-bind helpers and the
//!   hydration backend.
//! - [`WadeConfig`]: TOML configuration for every crate.
//! - [`logging::init`]: a `tracing-subscriber` setup driven by `WADE_LOG`.
//!
//! # Example
//! ```
//! use wade::prelude::*;
//!
//! let mut app = App::new(WadeConfig::default());
//! let model = ModelObject::new().with("count", 1);
//! let attrs = [RawAttribute::from_source("data-count", Some("{{count}}"))];
//! app.bind_attributes(&attrs, &model, |_name| |value: &serde_json::Value| {
//!     println!("{value}");
//! })
//! .unwrap();
//!
//! model.set("count", 2);
//! model.set("count", 3);
//! let report = app.flush();
//! assert_eq!(report.evaluated.len(), 1);
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod logging;

pub use app::App;
pub use config::WadeConfig;
pub use error::{ConfigError, Error, LoggingError};
pub use logging::LoggingConfig;

pub use wade_http as http;
pub use wade_runtime as runtime;
pub use wade_template as template;

/// Common imports.
pub mod prelude {
    pub use crate::{App, Error, WadeConfig};
    pub use wade_runtime::{
        BindingId, BindingTarget, Change, ChangeNotification, CheckpointReport, Evaluator,
        ModelObject, ObservableMap, ObservableSeq, PathEvaluator, Scheduler, SchedulerConfig,
        SchedulerHandle, Value, WatchId, WatchTarget,
    };
    pub use wade_template::{
        RawAttribute, TextPart, ValueDescriptor, compile_attribute, compile_text,
        split_mustaches,
    };
    pub use wade_http::{CachedBackend, HttpBackend, Request, RequestCache, Response};
}
