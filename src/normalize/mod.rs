//! Content normalization - deterministic whitespace reduction.
//!
//! Bodies are normalized before storage so the embedded payload stays
//! small. The rewrite is purely syntactic: literal content is never
//! touched, and at the strongest level a space survives exactly where
//! removing it would let two neighboring tokens fuse into a different
//! token. Normalization at any level is idempotent.

mod scan;

use serde::{Deserialize, Serialize};

use scan::{needs_separator, scan, Token, TokenKind};

/// How aggressively whitespace is reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizeLevel {
    /// Trim line ends and surrounding blank lines; keep everything else.
    Off,
    /// Drop comments, collapse runs of spaces, strip blank lines,
    /// keep line breaks.
    Default,
    /// Single line; only token-boundary-preserving spaces survive.
    Full,
}

impl Default for NormalizeLevel {
    fn default() -> Self {
        NormalizeLevel::Default
    }
}

/// Normalize program text at the given level.
pub fn normalize(text: &str, level: NormalizeLevel) -> String {
    match level {
        NormalizeLevel::Off => reindent(text),
        NormalizeLevel::Default => collapse(text),
        NormalizeLevel::Full => minify(text),
    }
}

/// `Off`: strip trailing per-line whitespace and surrounding blank
/// lines. Line breaks and everything inside lines stay as written.
/// Token-aware so trailing spaces inside multi-line literals survive.
fn reindent(text: &str) -> String {
    let tokens = scan(text);
    let mut out = String::new();

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Whitespace => {
                let before_newline =
                    matches!(tokens.get(i + 1), Some(t) if t.kind == TokenKind::Newline);
                let at_end = i + 1 == tokens.len();
                if !before_newline && !at_end {
                    out.push_str(token.text);
                }
            }
            TokenKind::Newline => {
                // Leading blank lines never start the output
                if !out.is_empty() {
                    out.push('\n');
                }
            }
            _ => out.push_str(token.text),
        }
    }

    while out.ends_with("\n\n") {
        out.pop();
    }

    out
}

/// Separator strength between semantic tokens; a line break outranks a
/// space so line structure survives `Default` normalization.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Sep {
    None,
    Space,
    Break,
}

/// `Default`: comments dropped, whitespace runs collapsed to one space,
/// blank lines stripped. Tokens that were adjacent stay adjacent.
fn collapse(text: &str) -> String {
    let mut out = String::new();
    let mut sep = Sep::None;

    for token in scan(text) {
        match token.kind {
            TokenKind::Whitespace | TokenKind::LineComment => {
                sep = sep.max(Sep::Space);
            }
            TokenKind::BlockComment => {
                if token.text.contains('\n') {
                    sep = sep.max(Sep::Break);
                } else {
                    sep = sep.max(Sep::Space);
                }
            }
            TokenKind::Newline => sep = Sep::Break,
            _ => {
                if !out.is_empty() {
                    match sep {
                        Sep::Break => out.push('\n'),
                        Sep::Space => out.push(' '),
                        Sep::None => {}
                    }
                }
                out.push_str(token.text);
                sep = Sep::None;
            }
        }
    }

    out
}

/// `Full`: drop separators entirely, except that a separator collapses
/// to a single space where removing it would let the neighboring tokens
/// combine. Tokens adjacent in the source stay adjacent; a space is
/// never invented between the halves of a composite operator.
fn minify(text: &str) -> String {
    let mut out = String::new();
    let mut separated = false;

    for token in scan(text) {
        if !token.kind.is_semantic() {
            separated = true;
            continue;
        }

        if separated && boundary_unsafe(&out, &token) {
            out.push(' ');
        }
        out.push_str(token.text);
        separated = false;
    }

    out
}

fn boundary_unsafe(out: &str, token: &Token<'_>) -> bool {
    match (out.chars().last(), token.text.chars().next()) {
        (Some(prev), Some(next)) => needs_separator(prev, next),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_off_trims_line_ends_and_blank_edges() {
        let text = "\n\nint x = 1;   \nint y = 2;\n\n\n";
        assert_eq!(
            normalize(text, NormalizeLevel::Off),
            "int x = 1;\nint y = 2;\n"
        );
    }

    #[test]
    fn test_off_keeps_interior_blank_lines_and_comments() {
        let text = "int x;\n\n// comment\nint y;\n";
        assert_eq!(normalize(text, NormalizeLevel::Off), text);
    }

    #[test]
    fn test_default_collapses_spaces_and_strips_comments() {
        let text = "int   x  =  1; // tail\n\n\nint y; /* mid */ int z;\n";
        assert_eq!(
            normalize(text, NormalizeLevel::Default),
            "int x = 1;\nint y; int z;"
        );
    }

    #[test]
    fn test_default_keeps_adjacent_tokens_adjacent() {
        assert_eq!(normalize("x=1;", NormalizeLevel::Default), "x=1;");
    }

    #[test]
    fn test_full_minifies_to_one_line() {
        let text = "class A\n{\n    public int X { get; set; }\n}\n";
        assert_eq!(
            normalize(text, NormalizeLevel::Full),
            "class A{public int X{get;set;}}"
        );
    }

    #[test]
    fn test_full_keeps_boundary_spaces() {
        assert_eq!(normalize("a + + b", NormalizeLevel::Full), "a+ +b");
        assert_eq!(normalize("a - -b", NormalizeLevel::Full), "a- -b");
        assert_eq!(normalize("x < = y", NormalizeLevel::Full), "x< =y");
        assert_eq!(normalize("int x", NormalizeLevel::Full), "int x");
        assert_eq!(normalize("a / /b", NormalizeLevel::Full), "a/ /b");
    }

    #[test]
    fn test_full_preserves_literals() {
        assert_eq!(
            normalize("var s = \"a  +  b\";", NormalizeLevel::Full),
            "var s=\"a  +  b\";"
        );
        assert_eq!(
            normalize("var c = ' ';", NormalizeLevel::Full),
            "var c=' ';"
        );
    }

    #[test]
    fn test_full_never_splits_composite_operators() {
        assert_eq!(normalize("x ??= y;", NormalizeLevel::Full), "x??=y;");
        assert_eq!(normalize("a <<= 2;", NormalizeLevel::Full), "a<<=2;");
        assert_eq!(normalize("i ++ ;", NormalizeLevel::Full), "i++;");
    }

    #[test]
    fn test_full_idempotent() {
        let samples = [
            "class A\n{\n    int x = 1 + +2;\n    string s = \"a  b\";\n}\n",
            "a + + b - - c << d",
            "if (x != null && y >= 2) { z ??= w; }",
            "",
        ];

        for text in samples {
            let once = normalize(text, NormalizeLevel::Full);
            let twice = normalize(&once, NormalizeLevel::Full);
            assert_eq!(once, twice, "input: {:?}", text);
        }
    }

    #[test]
    fn test_token_safety_battery() {
        // Each pair is boundary-sensitive: re-scanning the minified form
        // must reproduce the original token sequence.
        let pairs = [
            ("+", "+"),
            ("-", "-"),
            ("<", "="),
            (">", "="),
            ("=", "="),
            ("&", "&"),
            ("|", "|"),
            ("<", "<"),
            (">", ">"),
            ("?", "?"),
            (":", ":"),
            ("/", "/"),
            ("/", "*"),
            ("int", "x"),
            ("return", "value"),
        ];

        for (left, right) in pairs {
            let source = format!("{} {}", left, right);
            let minified = normalize(&source, NormalizeLevel::Full);
            assert_eq!(minified, source, "pair {:?} must keep its separator", (left, right));
        }
    }

    #[test]
    fn test_safe_adjacencies_lose_their_space() {
        for (left, right) in [("foo", "("), (")", ";"), ("x", "="), ("=", "1")] {
            let source = format!("{} {}", left, right);
            let minified = normalize(&source, NormalizeLevel::Full);
            assert_eq!(minified, format!("{}{}", left, right));
        }
    }

    #[test]
    fn test_default_idempotent() {
        let text = "int   x;\n\n// gone\nint y;\n";
        let once = normalize(text, NormalizeLevel::Default);
        assert_eq!(normalize(&once, NormalizeLevel::Default), once);
    }
}
