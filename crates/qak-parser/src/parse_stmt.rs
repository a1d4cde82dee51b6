//! Statement parsing.

use crate::parser::Parser;
use qak_types::ast::*;
use qak_types::TokenKind;

/// Words that close a block. `return` stops before them.
const BLOCK_END: [&str; 2] = ["end", "else"];

/// Maximum nesting depth of statement blocks.
const MAX_BLOCK_DEPTH: u32 = 128;

impl<'src> Parser<'src> {
    /// Statements up to (not including) one of `terminators` or the end of
    /// input.
    pub(crate) fn parse_block(&mut self, terminators: &[&str]) -> Option<Vec<Stmt>> {
        if self.block_depth >= MAX_BLOCK_DEPTH {
            let range = self.peek().map_or_else(|| self.end_of_source(), |t| t.range);
            self.error_at("Block is nested too deeply.", range);
            return None;
        }
        self.block_depth += 1;
        let stmts = self.parse_block_statements(terminators);
        self.block_depth -= 1;
        stmts
    }

    fn parse_block_statements(&mut self, terminators: &[&str]) -> Option<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while self.has_more() && !terminators.iter().any(|w| self.check_word(w)) {
            stmts.push(self.parse_statement()?);
        }
        Some(stmts)
    }

    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        if self.check_word("var") {
            self.parse_variable().map(Stmt::Variable)
        } else if self.check_word("while") {
            self.parse_while().map(Stmt::While)
        } else if self.check_word("if") {
            self.parse_if().map(Stmt::If)
        } else if self.check_word("return") {
            self.parse_return().map(Stmt::Return)
        } else {
            self.parse_expression_statement()
        }
    }

    /// `var name (: Type)? (= expr)?`
    fn parse_variable(&mut self) -> Option<VariableDecl> {
        let start = self.expect_word("var")?.range;
        let name = self.expect_identifier()?;

        let type_name = if self.eat(TokenKind::Colon) {
            Some(self.expect_identifier()?)
        } else {
            None
        };

        let initializer = if self.eat(TokenKind::Assignment) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let end = self.previous_range();
        Some(VariableDecl {
            name,
            type_name,
            initializer,
            range: start.merge(end),
        })
    }

    /// `while cond statements end`
    fn parse_while(&mut self) -> Option<WhileStmt> {
        let start = self.expect_word("while")?.range;
        let condition = self.parse_expression()?;
        let body = self.parse_block(&["end"])?;
        let end = self.expect_word("end")?.range;
        Some(WhileStmt {
            condition,
            body,
            range: start.merge(end),
        })
    }

    /// `if cond statements (else statements)? end`
    fn parse_if(&mut self) -> Option<IfStmt> {
        let start = self.expect_word("if")?.range;
        let condition = self.parse_expression()?;
        let then_block = self.parse_block(&BLOCK_END)?;
        let else_block = if self.eat_word("else") {
            self.parse_block(&["end"])?
        } else {
            Vec::new()
        };
        let end = self.expect_word("end")?.range;
        Some(IfStmt {
            condition,
            then_block,
            else_block,
            range: start.merge(end),
        })
    }

    /// `return expr?`. The value is absent at the end of input or right
    /// before `end`/`else`.
    fn parse_return(&mut self) -> Option<ReturnStmt> {
        let start = self.expect_word("return")?.range;
        let at_block_end = !self.has_more() || BLOCK_END.iter().any(|w| self.check_word(w));
        let value = if at_block_end {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let end = self.previous_range();
        Some(ReturnStmt {
            value,
            range: start.merge(end),
        })
    }

    /// `expr` or `target = expr`
    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let target = self.parse_expression()?;
        if !self.eat(TokenKind::Assignment) {
            return Some(Stmt::Expr(target));
        }
        if !matches!(target.kind, ExprKind::Variable(_)) {
            self.error_at("Can only assign to a variable.", target.range);
            return None;
        }
        let value = self.parse_expression()?;
        let range = target.range.merge(value.range);
        Some(Stmt::Assignment(Assignment {
            target,
            value,
            range,
        }))
    }
}
