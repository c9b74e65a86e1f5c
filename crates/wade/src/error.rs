#![forbid(unsafe_code)]

//! Facade error type.

use std::io;
use std::path::PathBuf;

/// Failure to load a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure to install the log subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Any error surfaced by [`App`](crate::App).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] wade_template::CompileError),
    #[error(transparent)]
    Watch(#[from] wade_runtime::WatchError),
    #[error(transparent)]
    Snapshot(#[from] wade_http::SnapshotError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
