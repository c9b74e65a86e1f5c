#![forbid(unsafe_code)]

//! Dotted / indexed paths into the model.
//!
//! `todos.0.title` and `todos[0].title` name the same location. A numeric
//! step indexes sequences and is used as a key on objects and maps.

use std::fmt;
use std::str::FromStr;

use crate::error::WatchError;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

impl PathStep {
    /// The step as an object or map key.
    #[must_use]
    pub fn as_key(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Key(k) => std::borrow::Cow::Borrowed(k.as_str()),
            Self::Index(i) => std::borrow::Cow::Owned(i.to_string()),
        }
    }

    /// The step as a sequence index, if it is one.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Key(_) => None,
        }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A parsed, non-empty model path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// Parse a path string.
    ///
    /// # Errors
    ///
    /// [`WatchError::InvalidPath`] for empty paths, empty segments and
    /// malformed `[n]` suffixes.
    pub fn parse(source: &str) -> Result<Self, WatchError> {
        let invalid = |reason: &str| WatchError::InvalidPath {
            path: source.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut steps = Vec::new();
        for segment in trimmed.split('.') {
            let (head, mut rest) = match segment.find('[') {
                Some(pos) => segment.split_at(pos),
                None => (segment, ""),
            };
            let head = head.trim();
            if head.is_empty() && (rest.is_empty() || steps.is_empty()) {
                return Err(invalid("empty path segment"));
            }
            if !head.is_empty() {
                steps.push(parse_step(head));
            }
            while !rest.is_empty() {
                let Some(close) = rest.find(']') else {
                    return Err(invalid("unclosed '['"));
                };
                let index: usize = rest[1..close]
                    .trim()
                    .parse()
                    .map_err(|_| invalid("index must be a non-negative integer"))?;
                steps.push(PathStep::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected text after ']'"));
                }
            }
        }

        Ok(Self { steps })
    }

    /// Build a path from steps. Returns `None` for an empty list.
    #[must_use]
    pub fn from_steps(steps: Vec<PathStep>) -> Option<Self> {
        if steps.is_empty() {
            None
        } else {
            Some(Self { steps })
        }
    }

    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Last step: the field being observed.
    #[must_use]
    pub fn leaf(&self) -> &PathStep {
        &self.steps[self.steps.len() - 1]
    }
}

fn parse_step(segment: &str) -> PathStep {
    match segment.parse::<usize>() {
        Ok(i) => PathStep::Index(i),
        Err(_) => PathStep::Key(segment.to_string()),
    }
}

impl FromStr for Path {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_and_bracketed_forms_agree() {
        let a = Path::parse("todos.0.title").unwrap();
        let b = Path::parse("todos[0].title").unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.steps(),
            [
                PathStep::Key("todos".into()),
                PathStep::Index(0),
                PathStep::Key("title".into()),
            ]
        );
        assert_eq!(b.to_string(), "todos.0.title");
    }

    #[test]
    fn nested_indices() {
        let p = Path::parse("grid[1][2]").unwrap();
        assert_eq!(
            p.steps(),
            [
                PathStep::Key("grid".into()),
                PathStep::Index(1),
                PathStep::Index(2),
            ]
        );
        assert_eq!(p.leaf(), &PathStep::Index(2));
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "  ", "a..b", ".a", "a.", "a[x]", "a[1", "a[1]b", "[0]"] {
            assert!(
                matches!(Path::parse(bad), Err(WatchError::InvalidPath { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn step_views() {
        assert_eq!(PathStep::Index(3).as_key(), "3");
        assert_eq!(PathStep::Key("k".into()).as_index(), None);
    }
}
