//! Token values crossing the engine boundary.
//!
//! The engine reports a token's kind as a raw `u32`. [`Token`] keeps that raw
//! value as-is; [`TokenKind`] is the symbol table for ABI version 1 and is
//! only consulted when a caller asks for it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Span;

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A lexical token decoded from a token record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Engine-defined kind, kept opaque.
    pub kind: u32,
    pub span: Span,
}

impl Token {
    pub fn new(kind: u32, span: Span) -> Self {
        Self { kind, span }
    }

    /// Look the raw kind up in the ABI v1 symbol table.
    pub fn known_kind(&self) -> Option<TokenKind> {
        TokenKind::from_raw(self.kind)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.known_kind() {
            Some(kind) => write!(f, "{kind} {}", self.span),
            None => write!(f, "#{} {}", self.kind, self.span),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Token kinds as numbered by the engine.
///
/// Kinds before [`TokenKind::Unknown`] are "simple" tokens with a single
/// literal spelling. The ones after it have many spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum TokenKind {
    Period = 0,
    Comma,
    Semicolon,
    Colon,
    Plus,
    Minus,
    Asterisk,
    ForwardSlash,
    Percentage,
    LeftParenthesis,
    RightParenthesis,
    LeftBracket,
    RightBracket,
    LeftCurly,
    RightCurly,
    LessEqual,
    GreaterEqual,
    NotEqual,
    Equal,
    Less,
    Greater,
    Assignment,
    And,
    Or,
    Xor,
    Not,
    QuestionMark,
    Unknown,

    BooleanLiteral,
    DoubleLiteral,
    FloatLiteral,
    LongLiteral,
    IntegerLiteral,
    ShortLiteral,
    ByteLiteral,
    CharacterLiteral,
    StringLiteral,
    NothingLiteral,
    Identifier,
}

impl TokenKind {
    /// Every kind, indexed by its raw value.
    pub const ALL: [TokenKind; 39] = [
        Self::Period,
        Self::Comma,
        Self::Semicolon,
        Self::Colon,
        Self::Plus,
        Self::Minus,
        Self::Asterisk,
        Self::ForwardSlash,
        Self::Percentage,
        Self::LeftParenthesis,
        Self::RightParenthesis,
        Self::LeftBracket,
        Self::RightBracket,
        Self::LeftCurly,
        Self::RightCurly,
        Self::LessEqual,
        Self::GreaterEqual,
        Self::NotEqual,
        Self::Equal,
        Self::Less,
        Self::Greater,
        Self::Assignment,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Not,
        Self::QuestionMark,
        Self::Unknown,
        Self::BooleanLiteral,
        Self::DoubleLiteral,
        Self::FloatLiteral,
        Self::LongLiteral,
        Self::IntegerLiteral,
        Self::ShortLiteral,
        Self::ByteLiteral,
        Self::CharacterLiteral,
        Self::StringLiteral,
        Self::NothingLiteral,
        Self::Identifier,
    ];

    /// Map a raw engine value to a kind, `None` if it is not in the table.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// The single spelling of a simple token, `None` for the others.
    pub fn literal(self) -> Option<&'static str> {
        let s = match self {
            Self::Period => ".",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Asterisk => "*",
            Self::ForwardSlash => "/",
            Self::Percentage => "%",
            Self::LeftParenthesis => "(",
            Self::RightParenthesis => ")",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            Self::LeftCurly => "{",
            Self::RightCurly => "}",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::NotEqual => "!=",
            Self::Equal => "==",
            Self::Less => "<",
            Self::Greater => ">",
            Self::Assignment => "=",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Not => "!",
            Self::QuestionMark => "?",
            _ => return None,
        };
        Some(s)
    }

    /// Returns `true` for the literal kinds (numbers, strings, booleans, ...).
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::BooleanLiteral
                | Self::DoubleLiteral
                | Self::FloatLiteral
                | Self::LongLiteral
                | Self::IntegerLiteral
                | Self::ShortLiteral
                | Self::ByteLiteral
                | Self::CharacterLiteral
                | Self::StringLiteral
                | Self::NothingLiteral
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(literal) = self.literal() {
            return f.write_str(literal);
        }
        let name = match self {
            Self::Unknown => "Unknown",
            Self::BooleanLiteral => "Boolean literal",
            Self::DoubleLiteral => "Double literal",
            Self::FloatLiteral => "Float literal",
            Self::LongLiteral => "Long literal",
            Self::IntegerLiteral => "Integer literal",
            Self::ShortLiteral => "Short literal",
            Self::ByteLiteral => "Byte literal",
            Self::CharacterLiteral => "Character literal",
            Self::StringLiteral => "String literal",
            Self::NothingLiteral => "Nothing literal",
            Self::Identifier => "Identifier",
            _ => "?",
        };
        f.write_str(name)
    }
}
