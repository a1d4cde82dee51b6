//! Tokens and errors as the engine keeps them internally.
//!
//! Unlike [`qak_types::Token`], an engine token does not own its text. It
//! carries a [`SourceRange`] into the source it was cut from.

use std::fmt;

use qak_types::{SourceRange, TokenKind};
use thiserror::Error;

/// A single token produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: SourceRange,
}

impl Token {
    pub fn new(kind: TokenKind, range: SourceRange) -> Self {
        Self { kind, range }
    }

    /// The slice of `source` this token covers.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source
            .get(self.range.start as usize..self.range.end as usize)
            .unwrap_or("")
    }

    /// Returns `true` if the token's text is exactly `text`.
    pub fn matches(&self, source: &str, text: &str) -> bool {
        self.text(source) == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.range)
    }
}

/// A tokenizer or parser error: a message anchored to a source range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{range}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub range: SourceRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}
