#![forbid(unsafe_code)]

//! HTTP cache errors.

/// The embedded snapshot could not be read.
///
/// Fatal at startup: a page must not hydrate from a partial snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("malformed request snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    /// No matcher could be built for the configured script type.
    #[error("cannot match snapshot script type '{script_type}': {source}")]
    ScriptType {
        script_type: String,
        #[source]
        source: regex::Error,
    },
}

/// A request did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The live transport failed.
    #[error("request failed: {message}")]
    Failed { message: String },
    /// The failure was captured in the snapshot and is being replayed.
    #[error("recorded failure: {message}")]
    Recorded { message: String },
}

impl TransportError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Failed { message } | Self::Recorded { message } => message,
        }
    }
}
