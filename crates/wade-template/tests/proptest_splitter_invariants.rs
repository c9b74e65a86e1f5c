//! Property tests for mustache splitting.

use proptest::prelude::*;
use wade_template::{TextPart, compile_text, parts_to_template, split_mustaches};

fn literal() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:;!?\n-]{1,12}"
}

fn body() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.]{0,10}"
}

#[derive(Debug, Clone)]
enum Piece {
    Lit(String),
    Expr(String),
}

fn pieces() -> impl Strategy<Value = Vec<Piece>> {
    prop::collection::vec(
        prop_oneof![literal().prop_map(Piece::Lit), body().prop_map(Piece::Expr)],
        0..8,
    )
}

fn expected(pieces: &[Piece]) -> Vec<TextPart> {
    let mut out: Vec<TextPart> = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Expr(b) => out.push(TextPart::expression(b.clone())),
            Piece::Lit(l) => match out.last_mut() {
                Some(last) if !last.is_expression => last.content.push_str(l),
                _ => out.push(TextPart::literal(l.clone())),
            },
        }
    }
    if out.is_empty() {
        out.push(TextPart::literal(""));
    }
    out
}

proptest! {
    #[test]
    fn round_trip_reconstructs_source(pieces in pieces()) {
        let source: String = pieces
            .iter()
            .map(|p| match p {
                Piece::Lit(l) => l.clone(),
                Piece::Expr(b) => format!("{{{{{b}}}}}"),
            })
            .collect();
        let parts = split_mustaches(&source);
        prop_assert_eq!(parts_to_template(&parts), source);
        prop_assert_eq!(parts, expected(&pieces));
    }

    #[test]
    fn whitespace_inside_mustache_is_trimmed(
        b in body(),
        pad_l in " {0,3}",
        pad_r in "[ \n]{0,3}"
    ) {
        let parts = split_mustaches(&format!("<{{{{{pad_l}{b}{pad_r}}}}}>"));
        prop_assert_eq!(parts.len(), 3);
        prop_assert_eq!(&parts[1], &TextPart::expression(b));
    }

    #[test]
    fn no_empty_literals(pieces in pieces()) {
        let source: String = pieces
            .iter()
            .map(|p| match p {
                Piece::Lit(l) => l.clone(),
                Piece::Expr(b) => format!("{{{{{b}}}}}"),
            })
            .collect();
        let parts = split_mustaches(&source);
        if parts.len() > 1 {
            prop_assert!(parts.iter().all(|p| p.is_expression || !p.content.is_empty()));
        }
    }

    #[test]
    fn text_without_braces_is_one_literal(text in "[^{}]{0,40}") {
        prop_assert_eq!(split_mustaches(&text), vec![TextPart::literal(text.clone())]);
    }

    #[test]
    fn compiled_text_lists_every_expression(pieces in pieces()) {
        let source: String = pieces
            .iter()
            .map(|p| match p {
                Piece::Lit(l) => l.clone(),
                Piece::Expr(b) => format!("{{{{ {b} }}}}"),
            })
            .collect();
        let bodies: Vec<&str> = pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Expr(b) => Some(b.as_str()),
                Piece::Lit(_) => None,
            })
            .collect();
        if let Some(desc) = compile_text(&source) {
            prop_assert_eq!(desc.expressions(), bodies);
        }
    }
}
