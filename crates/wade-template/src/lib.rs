#![forbid(unsafe_code)]

//! Template compilation for Wade.
//!
//! - [`splitter`]: turns text into literal runs and `{{ mustache }}` slots.
//! - [`compiler`]: turns tokenized attributes and text nodes into
//!   [`ValueDescriptor`]s that the runtime evaluates on every checkpoint.
//! - [`format`]: positional format strings backing interpolated values.
//!
//! Expression bodies are opaque here. They are extracted, placed and later
//! handed to a host evaluator; this crate never interprets them.

pub mod compiler;
pub mod error;
pub mod format;
pub mod splitter;

pub use compiler::{
    AttributeKind, CompiledAttribute, RawAttribute, ValueDescriptor, compile_attribute,
    compile_attributes, compile_text, display_value,
};
pub use error::CompileError;
pub use format::FormatString;
pub use splitter::{
    MUSTACHE_PATTERN, TextPart, escape_newlines, is_blank_text, parts_to_template,
    split_mustaches,
};
