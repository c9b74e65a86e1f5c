#![forbid(unsafe_code)]

//! Bound values: how expressions are evaluated and where results go.
//!
//! The scheduler never interprets expression bodies itself. It asks an
//! [`Evaluator`] for the value of a body against a scope object, and for the
//! model paths the body depends on, then hands each result to the binding's
//! [`BindingTarget`].

use std::fmt;

use serde_json::Value as Json;

use crate::error::EvalError;
use crate::model::ModelObject;

/// Identifier of a registered binding. Ordered by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub(crate) u64);

impl BindingId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Host expression evaluator.
pub trait Evaluator {
    /// Value of `expression` against `scope`.
    fn evaluate(&self, expression: &str, scope: &ModelObject) -> Result<Json, EvalError>;

    /// Model paths, relative to the scope, that `expression` reads.
    ///
    /// The default treats the whole body as one path.
    fn dependencies(&self, expression: &str) -> Vec<String> {
        vec![expression.trim().to_string()]
    }
}

/// Evaluates expression bodies as dotted model paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathEvaluator;

impl Evaluator for PathEvaluator {
    fn evaluate(&self, expression: &str, scope: &ModelObject) -> Result<Json, EvalError> {
        let resolved = scope
            .resolve(expression)
            .map_err(|err| EvalError::InvalidExpression {
                expression: expression.to_string(),
                reason: err.to_string(),
            })?;
        resolved
            .map(|value| value.to_json())
            .ok_or_else(|| EvalError::Unresolved {
                expression: expression.trim().to_string(),
            })
    }
}

/// Receiver of evaluated values, e.g. a DOM attribute or text node.
pub trait BindingTarget {
    fn apply(&mut self, value: &Json);
}

impl<F: FnMut(&Json)> BindingTarget for F {
    fn apply(&mut self, value: &Json) {
        self(value);
    }
}
