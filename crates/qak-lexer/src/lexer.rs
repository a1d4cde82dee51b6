//! Core Qak tokenizer.
//!
//! Features:
//! - Numbers: decimal, `0x` hex, one optional fraction, and the type
//!   suffixes `b`, `s`, `l`, `f`, `d`
//! - Character literals (`'a'`, `'\n'`) and single-line string literals.
//!   Escapes are kept verbatim; they are resolved later.
//! - Identifiers with `true`/`false` and `nothing` as literals
//! - `#` comments to end of line
//! - Stops at the first error, leaving the tokens scanned so far

use qak_types::{SourceRange, TokenKind};

use crate::token::{SyntaxError, Token};

/// Result of tokenizing: tokens plus the error that stopped the scan, if
/// any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<SyntaxError>,
}

impl LexResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Tokenize `source` in one call.
pub fn tokenize(source: &str) -> LexResult {
    Lexer::new(source).lex()
}

/// The Qak tokenizer.
pub struct Lexer<'src> {
    source: &'src str,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Where the token being scanned started.
    span_start: usize,
    span_line: u32,
    tokens: Vec<Token>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            span_start: 0,
            span_line: 1,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole source.
    pub fn lex(mut self) -> LexResult {
        let mut errors = Vec::new();
        while self.has_more() {
            self.skip_white_space();
            if !self.has_more() {
                break;
            }
            self.start_span();
            if let Err(message) = self.scan_token() {
                errors.push(SyntaxError::new(message, self.end_span()));
                break;
            }
        }
        LexResult {
            tokens: self.tokens,
            errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn has_more(&self) -> bool {
        self.pos < self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_byte(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn consume(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    /// Consume `needle` if the input continues with it.
    fn match_str(&mut self, needle: &str) -> bool {
        if self.source[self.pos..].starts_with(needle) {
            self.pos += needle.len();
            true
        } else {
            false
        }
    }

    fn match_byte_if(&mut self, pred: impl Fn(u8) -> bool) -> bool {
        match self.peek_byte() {
            Some(b) if pred(b) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn match_identifier_start(&mut self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' || c as u32 >= 0xc0 => {
                self.pos += c.len_utf8();
                true
            }
            _ => false,
        }
    }

    fn match_identifier_part(&mut self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_alphanumeric() || c == '_' || c as u32 >= 0x80 => {
                self.pos += c.len_utf8();
                true
            }
            _ => false,
        }
    }

    /// Skip spaces, tabs, line breaks and `#` comments.
    fn skip_white_space(&mut self) {
        while let Some(b) = self.peek_byte() {
            match b {
                b'#' => {
                    while let Some(c) = self.peek_byte() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                b' ' | b'\r' | b'\t' => self.pos += 1,
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                }
                _ => return,
            }
        }
    }

    fn start_span(&mut self) {
        self.span_start = self.pos;
        self.span_line = self.line;
    }

    fn end_span(&self) -> SourceRange {
        SourceRange::new(self.span_start as u32, self.pos as u32, self.span_line, self.line)
    }

    fn push(&mut self, kind: TokenKind) {
        let range = self.end_span();
        self.tokens.push(Token::new(kind, range));
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    fn scan_token(&mut self) -> Result<(), &'static str> {
        match self.peek() {
            Some('0'..='9') => return self.scan_number(),
            Some('\'') => return self.scan_character(),
            Some('"') => return self.scan_string(),
            _ => {}
        }
        if self.match_identifier_start() {
            self.scan_identifier();
            return Ok(());
        }
        self.scan_simple()
    }

    fn scan_number(&mut self) -> Result<(), &'static str> {
        let mut kind = TokenKind::IntegerLiteral;
        if self.match_str("0x") {
            while self.match_byte_if(|b| b.is_ascii_hexdigit()) {}
        } else {
            while self.match_byte_if(|b| b.is_ascii_digit()) {}
            if self.match_str(".") {
                kind = TokenKind::FloatLiteral;
                while self.match_byte_if(|b| b.is_ascii_digit()) {}
            }
        }

        let fractional = kind == TokenKind::FloatLiteral;
        if self.match_str("b") {
            if fractional {
                return Err("Byte literal can not have a decimal point.");
            }
            kind = TokenKind::ByteLiteral;
        } else if self.match_str("s") {
            if fractional {
                return Err("Short literal can not have a decimal point.");
            }
            kind = TokenKind::ShortLiteral;
        } else if self.match_str("l") {
            if fractional {
                return Err("Long literal can not have a decimal point.");
            }
            kind = TokenKind::LongLiteral;
        } else if self.match_str("f") {
            kind = TokenKind::FloatLiteral;
        } else if self.match_str("d") {
            kind = TokenKind::DoubleLiteral;
        }
        self.push(kind);
        Ok(())
    }

    fn scan_character(&mut self) -> Result<(), &'static str> {
        self.consume(); // '
        self.match_str("\\");
        self.consume();
        if !self.match_str("'") {
            return Err("Expected closing ' for character literal.");
        }
        self.push(TokenKind::CharacterLiteral);
        Ok(())
    }

    fn scan_string(&mut self) -> Result<(), &'static str> {
        self.consume(); // "
        while self.has_more() {
            if self.match_str("\\") {
                self.consume();
            }
            if self.match_str("\"") {
                self.push(TokenKind::StringLiteral);
                return Ok(());
            }
            if self.peek() == Some('\n') {
                break;
            }
            self.consume();
        }
        Err("String literal is not closed by double quote")
    }

    fn scan_identifier(&mut self) {
        while self.match_identifier_part() {}
        let kind = match &self.source[self.span_start..self.pos] {
            "true" | "false" => TokenKind::BooleanLiteral,
            "nothing" => TokenKind::NothingLiteral,
            _ => TokenKind::Identifier,
        };
        self.push(kind);
    }

    /// One-character tokens, and the two-character ones ending in `=`.
    fn scan_simple(&mut self) -> Result<(), &'static str> {
        let kind = self.consume().and_then(simple_token).ok_or("Unknown token")?;
        if self.peek() != Some('=') {
            self.push(kind);
            return Ok(());
        }
        self.consume();
        let combined = match kind {
            TokenKind::Less => TokenKind::LessEqual,
            TokenKind::Greater => TokenKind::GreaterEqual,
            TokenKind::Not => TokenKind::NotEqual,
            TokenKind::Assignment => TokenKind::Equal,
            _ => return Err("Found unknown two character token"),
        };
        self.push(combined);
        Ok(())
    }
}

/// The kind of a single-character token.
fn simple_token(c: char) -> Option<TokenKind> {
    let kind = match c {
        '.' => TokenKind::Period,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semicolon,
        ':' => TokenKind::Colon,
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Asterisk,
        '/' => TokenKind::ForwardSlash,
        '%' => TokenKind::Percentage,
        '(' => TokenKind::LeftParenthesis,
        ')' => TokenKind::RightParenthesis,
        '[' => TokenKind::LeftBracket,
        ']' => TokenKind::RightBracket,
        '{' => TokenKind::LeftCurly,
        '}' => TokenKind::RightCurly,
        '<' => TokenKind::Less,
        '>' => TokenKind::Greater,
        '=' => TokenKind::Assignment,
        '&' => TokenKind::And,
        '|' => TokenKind::Or,
        '^' => TokenKind::Xor,
        '!' => TokenKind::Not,
        '?' => TokenKind::QuestionMark,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_token_table_matches_literals() {
        for kind in TokenKind::ALL {
            if let Some(literal) = kind.literal() {
                if literal.len() == 1 {
                    let c = literal.chars().next().unwrap();
                    assert_eq!(simple_token(c), Some(kind), "{literal}");
                }
            }
        }
    }

    #[test]
    fn test_span_tracks_lines() {
        let result = tokenize("a\n\nb");
        assert_eq!(result.tokens[1].range, SourceRange::new(3, 4, 3, 3));
    }
}
