#![forbid(unsafe_code)]

//! Splitting of template text into literal runs and `{{ mustache }}` slots.
//!
//! Matching is driven by a single regular expression rather than a balanced
//! parser. An expression body may contain a lone `{` or `}` as long as it is
//! not doubled, so `{{ f({a: 1}) }}` is one expression while an unterminated
//! `{{` simply stays in the surrounding literal text.
//!
//! # Invariants
//!
//! 1. Literal parts are emitted verbatim; only expression bodies are trimmed.
//! 2. Empty literal runs (between adjacent mustaches, or at either end) are
//!    omitted.
//! 3. Text without any mustache yields exactly one literal part, even when
//!    the text is empty.
//!
//! # Known limitation
//!
//! A body that itself contains `}}` (for example a nested object literal
//! closing two braces at once) cannot be represented; the match ends at the
//! first `}}`.

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Pattern recognising one `{{ ... }}` span. Capture group 1 is the body.
pub const MUSTACHE_PATTERN: &str = r"\{\{((?:[^{}]|\{[^{]|\}[^}])+)\}\}";

pub(crate) fn mustache_regex() -> &'static Regex {
    static MUSTACHE: OnceLock<Regex> = OnceLock::new();
    MUSTACHE.get_or_init(|| Regex::new(MUSTACHE_PATTERN).expect("mustache pattern is valid"))
}

/// One piece of split template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPart {
    /// Literal text, or the trimmed body of a mustache.
    pub content: String,
    /// Whether `content` is an expression body.
    pub is_expression: bool,
}

impl TextPart {
    /// A literal text part.
    #[must_use]
    pub fn literal(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_expression: false,
        }
    }

    /// An expression part holding a mustache body.
    #[must_use]
    pub fn expression(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_expression: true,
        }
    }

    /// Whether any part in `parts` is an expression.
    #[must_use]
    pub fn has_expressions(parts: &[TextPart]) -> bool {
        parts.iter().any(|p| p.is_expression)
    }
}

impl fmt::Display for TextPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escaped = escape_newlines(&self.content);
        if self.is_expression {
            write!(f, "{{{{{escaped}}}}}")
        } else {
            write!(f, "\"{escaped}\"")
        }
    }
}

/// Split `text` into literal and expression parts.
///
/// `"ABC: {{x}} DEF"` becomes `"ABC: "`, `{{x}}` and `" DEF"`.
#[must_use]
pub fn split_mustaches(text: &str) -> Vec<TextPart> {
    let re = mustache_regex();
    let mut parts = Vec::new();
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            parts.push(TextPart::literal(&text[last..whole.start()]));
        }
        parts.push(TextPart::expression(body.as_str().trim()));
        last = whole.end();
    }

    if parts.is_empty() {
        return vec![TextPart::literal(text)];
    }

    if last < text.len() {
        parts.push(TextPart::literal(&text[last..]));
    }

    parts
}

/// Rebuild template text from parts, wrapping bodies back in `{{ }}`.
#[must_use]
pub fn parts_to_template(parts: &[TextPart]) -> String {
    let mut out = String::new();
    for part in parts {
        if part.is_expression {
            out.push_str("{{");
            out.push_str(&part.content);
            out.push_str("}}");
        } else {
            out.push_str(&part.content);
        }
    }
    out
}

/// Replace each `\n` with the two characters `\` `n` for one-line display.
#[must_use]
pub fn escape_newlines(text: &str) -> Cow<'_, str> {
    if !text.contains('\n') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace('\n', "\\n"))
}

/// Whether `text` holds nothing but spaces, tabs and newlines.
///
/// Such text nodes are formatting noise between tags and are never bound.
#[must_use]
pub fn is_blank_text(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_false_splits() {
        assert_eq!(
            split_mustaches("ABC: {{x}} DEF"),
            vec![
                TextPart::literal("ABC: "),
                TextPart::expression("x"),
                TextPart::literal(" DEF"),
            ]
        );
    }

    #[test]
    fn plain_text_is_one_literal() {
        assert_eq!(split_mustaches("hello"), vec![TextPart::literal("hello")]);
    }

    #[test]
    fn empty_text_is_one_empty_literal() {
        assert_eq!(split_mustaches(""), vec![TextPart::literal("")]);
    }

    #[test]
    fn only_lone_literals_may_be_empty() {
        for text in ["", "{{a}}", "x{{a}}", "{{a}}{{b}}", "{{a}}y"] {
            let parts = split_mustaches(text);
            if parts.len() > 1 {
                assert!(
                    parts.iter().all(|p| p.is_expression || !p.content.is_empty()),
                    "{text:?} -> {parts:?}"
                );
            }
            if !TextPart::has_expressions(&parts) {
                assert_eq!(parts_to_template(&parts), text);
            }
        }
    }

    #[test]
    fn expression_bodies_are_trimmed() {
        assert_eq!(
            split_mustaches("{{  user.name\n }}"),
            vec![TextPart::expression("user.name")]
        );
    }

    #[test]
    fn adjacent_expressions_have_no_empty_literal_between() {
        assert_eq!(
            split_mustaches("{{a}}{{b}}"),
            vec![TextPart::expression("a"), TextPart::expression("b")]
        );
    }

    #[test]
    fn single_braces_inside_body_do_not_terminate() {
        assert_eq!(
            split_mustaches("x {{ f({a: 1}) }} y"),
            vec![
                TextPart::literal("x "),
                TextPart::expression("f({a: 1})"),
                TextPart::literal(" y"),
            ]
        );
    }

    #[test]
    fn unterminated_delimiter_stays_literal() {
        assert_eq!(
            split_mustaches("a {{ b"),
            vec![TextPart::literal("a {{ b")]
        );
        assert_eq!(
            split_mustaches("{{a}} and {{ b"),
            vec![TextPart::expression("a"), TextPart::literal(" and {{ b")]
        );
    }

    #[test]
    fn empty_mustache_is_not_an_expression() {
        assert_eq!(split_mustaches("{{}}"), vec![TextPart::literal("{{}}")]);
    }

    #[test]
    fn display_escapes_newlines_only_for_display() {
        let part = TextPart::literal("line1\nline2");
        assert_eq!(part.to_string(), "\"line1\\nline2\"");
        assert_eq!(part.content, "line1\nline2");
        assert_eq!(TextPart::expression("x").to_string(), "{{x}}");
    }

    #[test]
    fn escape_newlines_borrows_when_clean() {
        assert!(matches!(escape_newlines("abc"), Cow::Borrowed("abc")));
        assert_eq!(escape_newlines("a\nb\n"), "a\\nb\\n");
    }

    #[test]
    fn blank_text_detection() {
        assert!(is_blank_text(""));
        assert!(is_blank_text(" \n\t  "));
        assert!(!is_blank_text(" x "));
        assert!(!is_blank_text("\r"));
    }

    #[test]
    fn parts_rebuild_template() {
        let parts = split_mustaches("Hi {{name}}, you have {{count}} items");
        assert_eq!(
            parts_to_template(&parts),
            "Hi {{name}}, you have {{count}} items"
        );
        assert!(TextPart::has_expressions(&parts));
    }
}
