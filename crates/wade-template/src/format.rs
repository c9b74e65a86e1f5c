#![forbid(unsafe_code)]

//! Positional format strings for interpolated values.
//!
//! A [`FormatString`] with `n` placeholders is stored as `n + 1` literal
//! segments. Rendering interleaves the segments with the supplied values in
//! order, so literal text never needs escaping.

use std::fmt;

use crate::splitter::TextPart;

/// Literal text with positional placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatString {
    segments: Vec<String>,
}

impl FormatString {
    /// Build a format string from split parts; each expression becomes a
    /// placeholder. Returns the format and the expression bodies in order.
    #[must_use]
    pub fn from_parts(parts: &[TextPart]) -> (Self, Vec<String>) {
        let mut segments = vec![String::new()];
        let mut expressions = Vec::new();
        for part in parts {
            if part.is_expression {
                expressions.push(part.content.clone());
                segments.push(String::new());
            } else if let Some(current) = segments.last_mut() {
                current.push_str(&part.content);
            }
        }
        (Self { segments }, expressions)
    }

    /// Number of placeholders.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.segments.len() - 1
    }

    /// Literal segments surrounding the placeholders.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Substitute `values` into the placeholders in order.
    ///
    /// Missing values render as empty; surplus values are ignored.
    #[must_use]
    pub fn render<S: AsRef<str>>(&self, values: &[S]) -> String {
        let mut out = String::with_capacity(self.segments.iter().map(String::len).sum());
        for (i, segment) in self.segments.iter().enumerate() {
            if let Some(value) = i.checked_sub(1).and_then(|j| values.get(j)) {
                out.push_str(value.as_ref());
            }
            out.push_str(segment);
        }
        out
    }
}

impl fmt::Display for FormatString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("{}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}
