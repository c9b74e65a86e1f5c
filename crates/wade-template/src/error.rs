#![forbid(unsafe_code)]

//! Errors raised while compiling template attributes.

/// Compilation failures.
///
/// Both variants are configuration errors coming from the HTML parser side:
/// compilation must stop rather than emit a half-bound template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The attribute carries a kind tag no descriptor exists for.
    #[error("attribute '{attribute}' has unhandled kind '{kind}'")]
    UnknownAttributeKind { attribute: String, kind: String },
    /// The raw value and the pre-extracted expression list disagree.
    #[error(
        "attribute '{attribute}' has {placeholders} mustache placeholders but {expressions} expressions"
    )]
    PlaceholderMismatch {
        attribute: String,
        placeholders: usize,
        expressions: usize,
    },
}
