//! Token scanner for whitespace normalization.
//!
//! Splits C-family program text into coarse tokens: words, numbers,
//! string/char literals, comments, whitespace, and single punctuation
//! characters. The scanner never interprets the program; it exists so the
//! normalizer can collapse whitespace without touching literal content
//! and can tell which token adjacencies are unsafe to fuse.

/// Coarse lexical class of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Identifier or keyword (also `@`-prefixed verbatim identifiers).
    Word,
    /// Numeric literal, including suffixes and embedded digits separators.
    Number,
    /// String literal: plain, verbatim, or interpolated.
    Str,
    /// Character literal.
    Char,
    /// `//` comment up to (not including) the newline.
    LineComment,
    /// `/* ... */` comment, possibly spanning lines.
    BlockComment,
    /// Run of spaces, tabs, and carriage returns.
    Whitespace,
    /// A single `\n`.
    Newline,
    /// Any other single character.
    Punct,
}

impl TokenKind {
    /// Tokens that survive into normalized output.
    pub(crate) fn is_semantic(self) -> bool {
        !matches!(
            self,
            TokenKind::LineComment
                | TokenKind::BlockComment
                | TokenKind::Whitespace
                | TokenKind::Newline
        )
    }
}

/// One scanned token, borrowing its text from the source.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Scan the whole source into tokens. Concatenating the token texts
/// reproduces the source byte-for-byte.
pub(crate) fn scan(source: &str) -> Vec<Token<'_>> {
    let mut scanner = Scanner {
        source,
        bytes: source.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    while let Some(token) = scanner.next_token() {
        tokens.push(token);
    }
    tokens
}

struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> u8 {
        if self.pos < self.bytes.len() {
            self.bytes[self.pos]
        } else {
            0
        }
    }

    fn peek_at(&self, offset: usize) -> u8 {
        let idx = self.pos + offset;
        if idx < self.bytes.len() {
            self.bytes[idx]
        } else {
            0
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.source[start..self.pos],
        }
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.bytes.len() {
            return None;
        }

        let start = self.pos;
        let b = self.peek();

        if b == b'\n' {
            self.pos += 1;
            return Some(self.token(TokenKind::Newline, start));
        }

        if b == b' ' || b == b'\t' || b == b'\r' {
            while matches!(self.peek(), b' ' | b'\t' | b'\r') && self.pos < self.bytes.len() {
                self.pos += 1;
            }
            return Some(self.token(TokenKind::Whitespace, start));
        }

        if b == b'/' && self.peek_at(1) == b'/' {
            self.pos += 2;
            while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                self.pos += 1;
            }
            return Some(self.token(TokenKind::LineComment, start));
        }

        if b == b'/' && self.peek_at(1) == b'*' {
            self.pos += 2;
            loop {
                if self.pos >= self.bytes.len() {
                    break;
                }
                if self.bytes[self.pos] == b'*' && self.peek_at(1) == b'/' {
                    self.pos += 2;
                    break;
                }
                self.pos += 1;
            }
            return Some(self.token(TokenKind::BlockComment, start));
        }

        // String prefixes: any order of `@` and `$` directly before a quote
        if b == b'@' || b == b'$' {
            let mut offset = 1;
            let mut verbatim = b == b'@';
            if (self.peek_at(1) == b'@' || self.peek_at(1) == b'$') && self.peek_at(1) != b {
                verbatim = true;
                offset = 2;
            }
            if self.peek_at(offset) == b'"' {
                self.pos += offset;
                return Some(self.lex_string(start, verbatim));
            }
            if b == b'@' && is_word_start(self.peek_at(1)) {
                self.pos += 1;
                return Some(self.lex_word(start));
            }
            self.pos += 1;
            return Some(self.token(TokenKind::Punct, start));
        }

        if b == b'"' {
            return Some(self.lex_string(start, false));
        }

        if b == b'\'' {
            return Some(self.lex_char(start));
        }

        if b.is_ascii_digit() || (b == b'.' && self.peek_at(1).is_ascii_digit()) {
            return Some(self.lex_number(start));
        }

        if is_word_start(b) {
            return Some(self.lex_word(start));
        }

        self.pos += 1;
        Some(self.token(TokenKind::Punct, start))
    }

    fn lex_string(&mut self, start: usize, verbatim: bool) -> Token<'a> {
        // self.pos is at the opening quote
        self.pos += 1;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if verbatim {
                if b == b'"' {
                    if self.peek_at(1) == b'"' {
                        // doubled quote stays inside the literal
                        self.pos += 2;
                        continue;
                    }
                    self.pos += 1;
                    break;
                }
                self.pos += 1;
            } else {
                if b == b'\\' {
                    self.pos = (self.pos + 2).min(self.bytes.len());
                    continue;
                }
                self.pos += 1;
                if b == b'"' {
                    break;
                }
            }
        }
        self.token(TokenKind::Str, start)
    }

    fn lex_char(&mut self, start: usize) -> Token<'a> {
        self.pos += 1;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b == b'\\' {
                self.pos = (self.pos + 2).min(self.bytes.len());
                continue;
            }
            self.pos += 1;
            if b == b'\'' {
                break;
            }
        }
        self.token(TokenKind::Char, start)
    }

    fn lex_number(&mut self, start: usize) -> Token<'a> {
        self.pos += 1;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else if b == b'.' && self.peek_at(1).is_ascii_digit() {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.token(TokenKind::Number, start)
    }

    fn lex_word(&mut self, start: usize) -> Token<'a> {
        self.pos += 1;
        while self.pos < self.bytes.len() && is_word_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        self.token(TokenKind::Word, start)
    }
}

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_word_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// Character pairs that must not become adjacent: the right character
/// would extend the left one into a different token. The table covers
/// composite operators, comment openers/closers, and literal prefixes.
const COMBINING_PAIRS: &[(char, char)] = &[
    ('+', '+'),
    ('-', '-'),
    ('&', '&'),
    ('|', '|'),
    ('<', '<'),
    ('>', '>'),
    ('=', '='),
    ('<', '='),
    ('>', '='),
    ('!', '='),
    ('+', '='),
    ('-', '='),
    ('*', '='),
    ('/', '='),
    ('%', '='),
    ('&', '='),
    ('|', '='),
    ('^', '='),
    ('=', '>'),
    ('-', '>'),
    ('?', '?'),
    ('?', '.'),
    ('?', '['),
    (':', ':'),
    ('.', '.'),
    ('/', '/'),
    ('/', '*'),
    ('*', '/'),
    ('"', '"'),
    ('\'', '\''),
    ('$', '"'),
    ('@', '"'),
];

/// Whether omitting the space between a token ending in `prev` and one
/// starting in `next` would let the two combine into a different token.
pub(crate) fn needs_separator(prev: char, next: char) -> bool {
    let word = |c: char| c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii();
    if word(prev) && word(next) {
        return true;
    }
    COMBINING_PAIRS.contains(&(prev, next))
}
