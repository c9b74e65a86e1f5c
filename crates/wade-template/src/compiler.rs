#![forbid(unsafe_code)]

//! Attribute and text-node compilation into [`ValueDescriptor`]s.
//!
//! The external HTML parser hands over attributes already tokenized: a kind
//! tag, the raw value and, for string attributes, the mustache bodies it
//! found. Compilation picks exactly one descriptor variant per attribute;
//! evaluation happens later, once per checkpoint that touches the binding.
//!
//! | Kind | Expressions | Descriptor |
//! |------|-------------|------------|
//! | bool | - | [`ValueDescriptor::Bool`] |
//! | string | none | [`ValueDescriptor::Literal`] |
//! | string | one or more | [`ValueDescriptor::Interpolated`] |
//! | mustache | - | [`ValueDescriptor::SingleExpression`] |
//! | anything else | - | [`CompileError::UnknownAttributeKind`] |

use std::borrow::Cow;
use std::fmt;

use serde_json::Value;

use crate::error::CompileError;
use crate::format::FormatString;
use crate::splitter::{is_blank_text, split_mustaches};

/// Attribute kind as declared by the HTML parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    /// Present-or-absent flag (`<input disabled>`).
    Bool,
    /// Plain string value, possibly with embedded mustaches.
    String,
    /// The whole value is one pre-parsed expression.
    Expression,
    /// A tag this compiler does not know.
    Unknown(String),
}

impl AttributeKind {
    /// Map a parser tag to a kind. Unrecognised tags become [`Self::Unknown`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "bool" | "boolean" => Self::Bool,
            "string" | "str" => Self::String,
            "mustache" | "expression" => Self::Expression,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "string"),
            Self::Expression => write!(f, "mustache"),
            Self::Unknown(tag) => write!(f, "{tag}"),
        }
    }
}

/// One attribute as tokenized by the HTML parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub kind: AttributeKind,
    /// Raw value. For [`AttributeKind::Expression`] this is the body itself.
    pub value: String,
    /// Mustache bodies extracted from `value`, in source order.
    pub expressions: Vec<String>,
}

impl RawAttribute {
    /// Classify an attribute straight from source text.
    ///
    /// No value means a boolean flag; a value that is exactly one mustache
    /// becomes an expression attribute; anything else is a string attribute.
    #[must_use]
    pub fn from_source(name: impl Into<String>, raw: Option<&str>) -> Self {
        let name = name.into();
        let Some(raw) = raw else {
            return Self {
                name,
                kind: AttributeKind::Bool,
                value: String::new(),
                expressions: Vec::new(),
            };
        };

        let parts = split_mustaches(raw);
        if let [only] = parts.as_slice() {
            if only.is_expression {
                return Self {
                    name,
                    kind: AttributeKind::Expression,
                    value: only.content.clone(),
                    expressions: Vec::new(),
                };
            }
        }

        Self {
            name,
            kind: AttributeKind::String,
            value: raw.to_string(),
            expressions: parts
                .into_iter()
                .filter(|p| p.is_expression)
                .map(|p| p.content)
                .collect(),
        }
    }
}

/// Compiled, repeatedly evaluable attribute or text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueDescriptor {
    /// Constant `true`.
    Bool,
    /// Raw string, unescaped.
    Literal(String),
    /// Format plus the expressions filling its placeholders.
    Interpolated {
        format: FormatString,
        expressions: Vec<String>,
    },
    /// One expression whose value is used as-is.
    SingleExpression(String),
}

impl ValueDescriptor {
    /// Expression bodies this value depends on, in evaluation order.
    #[must_use]
    pub fn expressions(&self) -> Vec<&str> {
        match self {
            Self::Bool | Self::Literal(_) => Vec::new(),
            Self::Interpolated { expressions, .. } => {
                expressions.iter().map(String::as_str).collect()
            }
            Self::SingleExpression(body) => vec![body.as_str()],
        }
    }

    /// Whether evaluation depends on the model at all.
    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Bool | Self::Literal(_))
    }

    /// Evaluate with `eval` resolving each expression body.
    ///
    /// Interpolated values are stringified; a single expression keeps its
    /// type so non-string bindings (e.g. `disabled`) work.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `eval`.
    pub fn evaluate<E>(&self, mut eval: impl FnMut(&str) -> Result<Value, E>) -> Result<Value, E> {
        match self {
            Self::Bool => Ok(Value::Bool(true)),
            Self::Literal(text) => Ok(Value::String(text.clone())),
            Self::Interpolated {
                format,
                expressions,
            } => {
                let mut rendered = Vec::with_capacity(expressions.len());
                for body in expressions {
                    let value = eval(body)?;
                    rendered.push(display_value(&value).into_owned());
                }
                Ok(Value::String(format.render(&rendered)))
            }
            Self::SingleExpression(body) => eval(body),
        }
    }
}

/// String form of an evaluated value inside interpolated text.
///
/// Strings are inserted verbatim, `null` renders empty, everything else uses
/// its compact JSON form.
#[must_use]
pub fn display_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}

/// Compile one attribute.
///
/// # Errors
///
/// [`CompileError::UnknownAttributeKind`] for an unhandled kind, and
/// [`CompileError::PlaceholderMismatch`] when the value's mustaches do not
/// line up with the extracted expressions.
pub fn compile_attribute(attr: &RawAttribute) -> Result<ValueDescriptor, CompileError> {
    match &attr.kind {
        AttributeKind::Bool => Ok(ValueDescriptor::Bool),
        AttributeKind::String if attr.expressions.is_empty() => {
            Ok(ValueDescriptor::Literal(attr.value.clone()))
        }
        AttributeKind::String => {
            let (format, _) = FormatString::from_parts(&split_mustaches(&attr.value));
            if format.placeholder_count() != attr.expressions.len() {
                return Err(CompileError::PlaceholderMismatch {
                    attribute: attr.name.clone(),
                    placeholders: format.placeholder_count(),
                    expressions: attr.expressions.len(),
                });
            }
            Ok(ValueDescriptor::Interpolated {
                format,
                expressions: attr.expressions.clone(),
            })
        }
        AttributeKind::Expression => Ok(ValueDescriptor::SingleExpression(attr.value.clone())),
        AttributeKind::Unknown(kind) => Err(CompileError::UnknownAttributeKind {
            attribute: attr.name.clone(),
            kind: kind.clone(),
        }),
    }
}

/// A compiled attribute paired with its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledAttribute {
    pub name: String,
    pub value: ValueDescriptor,
}

/// Compile every attribute of an element, stopping at the first failure.
///
/// # Errors
///
/// The first [`CompileError`] encountered; nothing is returned for the
/// element in that case.
pub fn compile_attributes<'a>(
    attrs: impl IntoIterator<Item = &'a RawAttribute>,
) -> Result<Vec<CompiledAttribute>, CompileError> {
    attrs
        .into_iter()
        .map(|attr| {
            compile_attribute(attr).map(|value| CompiledAttribute {
                name: attr.name.clone(),
                value,
            })
        })
        .collect()
}

/// Compile a text node. Blank text yields `None`.
#[must_use]
pub fn compile_text(text: &str) -> Option<ValueDescriptor> {
    if is_blank_text(text) {
        return None;
    }
    let parts = split_mustaches(text);
    let (format, expressions) = FormatString::from_parts(&parts);
    if expressions.is_empty() {
        return Some(ValueDescriptor::Literal(text.to_string()));
    }
    Some(ValueDescriptor::Interpolated {
        format,
        expressions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn string_attr(name: &str, value: &str, exprs: &[&str]) -> RawAttribute {
        RawAttribute {
            name: name.into(),
            kind: AttributeKind::String,
            value: value.into(),
            expressions: exprs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn bool_attribute_is_constant_true() {
        let attr = RawAttribute::from_source("disabled", None);
        let desc = compile_attribute(&attr).unwrap();
        assert_eq!(desc, ValueDescriptor::Bool);
        assert_eq!(
            desc.evaluate(|_| Err::<Value, ()>(())).unwrap(),
            json!(true)
        );
    }

    #[test]
    fn string_without_expressions_is_raw_literal() {
        let attr = string_attr("title", "a < b & \"c\"", &[]);
        assert_eq!(
            compile_attribute(&attr).unwrap(),
            ValueDescriptor::Literal("a < b & \"c\"".into())
        );
    }

    #[test]
    fn interpolated_attribute_keeps_source_order() {
        let attr = string_attr("id", "{{a}}-{{b}}", &["a", "b"]);
        let desc = compile_attribute(&attr).unwrap();
        let ValueDescriptor::Interpolated {
            format,
            expressions,
        } = &desc
        else {
            panic!("expected interpolated, got {desc:?}");
        };
        assert_eq!(format.placeholder_count(), 2);
        assert_eq!(expressions, &["a", "b"]);

        let value = desc
            .evaluate(|body| {
                Ok::<_, ()>(match body {
                    "a" => json!("x"),
                    _ => json!(7),
                })
            })
            .unwrap();
        assert_eq!(value, json!("x-7"));
    }

    #[test]
    fn single_expression_keeps_value_type() {
        let attr = RawAttribute::from_source("disabled", Some("{{ form.locked }}"));
        assert_eq!(attr.kind, AttributeKind::Expression);
        let desc = compile_attribute(&attr).unwrap();
        assert_eq!(desc, ValueDescriptor::SingleExpression("form.locked".into()));
        let value = desc.evaluate(|_| Ok::<_, ()>(json!(false))).unwrap();
        assert_eq!(value, json!(false));
    }

    #[test]
    fn unknown_kind_is_rejected_with_attribution() {
        let attr = RawAttribute {
            name: "onclick".into(),
            kind: AttributeKind::from_tag("event"),
            value: "go()".into(),
            expressions: vec![],
        };
        let err = compile_attribute(&attr).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownAttributeKind {
                attribute: "onclick".into(),
                kind: "event".into(),
            }
        );
        assert!(err.to_string().contains("onclick"));
    }

    #[test]
    fn element_compilation_stops_on_first_error() {
        let good = RawAttribute::from_source("class", Some("btn {{kind}}"));
        let bad = RawAttribute {
            name: "x".into(),
            kind: AttributeKind::Unknown("??".into()),
            value: String::new(),
            expressions: vec![],
        };
        assert!(compile_attributes([&good, &bad]).is_err());
        let ok = compile_attributes([&good]).unwrap();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].name, "class");
    }

    #[test]
    fn placeholder_mismatch_is_an_error() {
        let attr = string_attr("href", "/u/{{id}}", &["id", "extra"]);
        assert!(matches!(
            compile_attribute(&attr),
            Err(CompileError::PlaceholderMismatch {
                placeholders: 1,
                expressions: 2,
                ..
            })
        ));
    }

    #[test]
    fn text_nodes_compile_or_skip() {
        assert_eq!(compile_text("\n   \t"), None);
        assert_eq!(
            compile_text("plain"),
            Some(ValueDescriptor::Literal("plain".into()))
        );
        let desc = compile_text("Total: {{ total }}").unwrap();
        assert_eq!(desc.expressions(), ["total"]);
        assert!(!desc.is_static());
    }

    #[test]
    fn display_value_forms() {
        assert_eq!(display_value(&json!("s")), "s");
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!(1.5)), "1.5");
        assert_eq!(display_value(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn kind_tags_round_trip_through_display() {
        for tag in ["bool", "string", "mustache"] {
            assert_eq!(AttributeKind::from_tag(tag).to_string(), tag);
        }
        assert_eq!(AttributeKind::from_tag("expression"), AttributeKind::Expression);
    }
}
