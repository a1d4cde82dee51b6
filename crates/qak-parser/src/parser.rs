//! Core parser infrastructure: token cursor, error reporting, helpers.

use qak_lexer::{SyntaxError, Token};
use qak_types::ast::{Ident, Module};
use qak_types::{SourceRange, TokenKind};

/// The Qak parser.
///
/// Consumes the tokens of one source and builds a [`Module`]. Parsing stops
/// at the first error.
pub struct Parser<'src> {
    source: &'src str,
    tokens: &'src [Token],
    /// Current index into `tokens`.
    pos: usize,
    errors: Vec<SyntaxError>,
    /// Current expression nesting depth.
    pub(crate) expr_depth: u32,
    pub(crate) block_depth: u32,
}

/// Result of parsing. `module` is `None` when there are errors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseResult {
    pub module: Option<Module>,
    pub errors: Vec<SyntaxError>,
}

/// Parse `tokens`, which were cut from `source`.
pub fn parse(source: &str, tokens: &[Token]) -> ParseResult {
    Parser::new(source, tokens).parse()
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: &'src [Token]) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            errors: Vec::new(),
            expr_depth: 0,
            block_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    pub(crate) fn has_more(&self) -> bool {
        self.pos < self.tokens.len()
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).copied()?;
        self.pos += 1;
        Some(token)
    }

    /// Range of the most recently consumed token.
    pub(crate) fn previous_range(&self) -> SourceRange {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(|| self.end_of_source(), |t| t.range)
    }

    pub(crate) fn text(&self, token: &Token) -> &'src str {
        token.text(self.source)
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    /// Returns `true` if the current token is the word `word`.
    pub(crate) fn check_word(&self, word: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Identifier && t.matches(self.source, word))
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a token of `kind`. Reports an error if it is missing.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            return self.advance();
        }
        self.error_expected(&kind.to_string());
        None
    }

    /// Expect the word `word`, e.g. `end`.
    pub(crate) fn expect_word(&mut self, word: &str) -> Option<Token> {
        if self.check_word(word) {
            return self.advance();
        }
        self.error_expected(word);
        None
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        let token = self.expect(TokenKind::Identifier)?;
        Some(Ident::new(self.text(&token), token.range))
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report that `what` was expected at the current position.
    pub(crate) fn error_expected(&mut self, what: &str) {
        match self.peek().copied() {
            Some(token) => {
                let got = self.text(&token);
                self.error_at(format!("Expected '{what}', but got '{got}'"), token.range);
            }
            None => self.error_at(
                format!("Expected '{what}', but reached the end of the source."),
                self.end_of_source(),
            ),
        }
    }

    pub(crate) fn error_at(&mut self, message: impl Into<String>, range: SourceRange) {
        self.errors.push(SyntaxError::new(message, range));
    }

    /// Empty range at the very end of the source, on its last line.
    pub(crate) fn end_of_source(&self) -> SourceRange {
        let len = self.source.len() as u32;
        let last_line = self.source.matches('\n').count() as u32 + 1;
        SourceRange::point(len, last_line)
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a [`Module`].
    pub fn parse(mut self) -> ParseResult {
        let module = self.parse_module();
        ParseResult {
            module: if self.errors.is_empty() { module } else { None },
            errors: self.errors,
        }
    }

    /// `(function | statement)*`
    fn parse_module(&mut self) -> Option<Module> {
        let mut module = Module::default();
        while self.has_more() {
            if self.check_word("function") {
                module.functions.push(self.parse_function()?);
            } else {
                module.statements.push(self.parse_statement()?);
            }
        }
        module.range = match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => first.range.merge(last.range),
            _ => SourceRange::point(0, 1),
        };
        Some(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qak_lexer::tokenize;

    #[test]
    fn test_end_of_source_range() {
        let source = "x =\n";
        let tokens = tokenize(source).tokens;
        let parser = Parser::new(source, &tokens);
        assert_eq!(parser.end_of_source(), SourceRange::new(4, 4, 2, 2));
    }

    #[test]
    fn test_check_word_only_matches_identifiers() {
        let source = "end \"end\"";
        let tokens = tokenize(source).tokens;
        let mut parser = Parser::new(source, &tokens);
        assert!(parser.check_word("end"));
        parser.advance();
        assert!(!parser.check_word("end"));
    }
}
