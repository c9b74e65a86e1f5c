#![forbid(unsafe_code)]

//! Runtime errors.

/// Failure to install an observation.
///
/// Returned synchronously to whoever asked for the watch; never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// The watch path could not be parsed.
    #[error("invalid watch path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Failure to evaluate one bound expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// The expression names a location that does not exist.
    #[error("expression '{expression}' did not resolve")]
    Unresolved { expression: String },
    /// The evaluator cannot make sense of the expression.
    #[error("invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },
    /// Error reported by a host evaluator.
    #[error("evaluating '{expression}' failed: {message}")]
    Host { expression: String, message: String },
}
