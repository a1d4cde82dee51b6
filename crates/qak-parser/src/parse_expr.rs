//! Expression parsing with precedence climbing.
//!
//! Precedence (lowest to highest):
//! 1. `?:` (ternary, right-associative)
//! 2. `|` `^`
//! 3. `&`
//! 4. `==` `!=`
//! 5. `<` `<=` `>` `>=`
//! 6. `+` `-`
//! 7. `*` `/` `%`
//! 8. unary `-` `!`
//! 9. call `f(...)`
//! 10. primary: literals, identifiers, `( expr )`

use crate::parser::Parser;
use qak_types::ast::*;
use qak_types::TokenKind;

/// Maximum expression nesting depth. Parentheses, calls, ternary branches,
/// unary operators and chained binary operators each count as one level.
const MAX_EXPR_DEPTH: u32 = 256;

impl<'src> Parser<'src> {
    /// Enter one level of expression nesting. Reports an error at the
    /// current token once the limit is reached.
    fn enter_expr(&mut self) -> Option<()> {
        if self.expr_depth >= MAX_EXPR_DEPTH {
            let range = self.peek().map_or_else(|| self.end_of_source(), |t| t.range);
            self.error_at("Expression is nested too deeply.", range);
            return None;
        }
        self.expr_depth += 1;
        Some(())
    }

    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.enter_expr()?;
        let expr = self.parse_ternary();
        self.expr_depth -= 1;
        expr
    }

    /// `binary (? expr : expr)?`
    fn parse_ternary(&mut self) -> Option<Expr> {
        let condition = self.parse_binary(1)?;
        if !self.eat(TokenKind::QuestionMark) {
            return Some(condition);
        }
        let then_value = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let else_value = self.parse_expression()?;
        let range = condition.range.merge(else_value.range);
        Some(Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            },
            range,
        ))
    }

    /// Left-associative binary operators binding at least as tight as
    /// `min_precedence`.
    fn parse_binary(&mut self, min_precedence: u8) -> Option<Expr> {
        let depth = self.expr_depth;
        let expr = self.parse_binary_chain(min_precedence);
        self.expr_depth = depth;
        expr
    }

    /// Each operator in the chain nests the tree built so far one level
    /// deeper.
    fn parse_binary_chain(&mut self, min_precedence: u8) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek_kind().and_then(BinOp::from_token) {
            if op.precedence() < min_precedence {
                break;
            }
            self.enter_expr()?;
            self.advance();
            let right = self.parse_binary(op.precedence() + 1)?;
            let range = left.range.merge(right.range);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                range,
            );
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Not) => UnaryOp::Not,
            _ => return self.parse_call(),
        };
        self.enter_expr()?;
        let expr = self.parse_unary_operand(op);
        self.expr_depth -= 1;
        expr
    }

    /// The operator token and its operand.
    fn parse_unary_operand(&mut self, op: UnaryOp) -> Option<Expr> {
        let start = self.advance()?.range;
        let operand = self.parse_unary()?;
        let range = start.merge(operand.range);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            range,
        ))
    }

    fn parse_call(&mut self) -> Option<Expr> {
        let depth = self.expr_depth;
        let expr = self.parse_call_chain();
        self.expr_depth = depth;
        expr
    }

    /// `primary ( (args) )*`
    fn parse_call_chain(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        while self.check(TokenKind::LeftParenthesis) {
            self.enter_expr()?;
            self.advance();
            let mut args = Vec::new();
            if !self.check(TokenKind::RightParenthesis) {
                loop {
                    args.push(self.parse_expression()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            let end = self.expect(TokenKind::RightParenthesis)?.range;
            let range = expr.range.merge(end);
            expr = Expr::new(
                ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                },
                range,
            );
        }
        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let Some(token) = self.peek().copied() else {
            self.error_at(
                "Expected an expression, but reached the end of the source.",
                self.end_of_source(),
            );
            return None;
        };

        match token.kind {
            kind if kind.is_literal() => {
                self.advance();
                let text = self.text(&token).to_string();
                Some(Expr::new(ExprKind::Literal { kind, text }, token.range))
            }
            TokenKind::Identifier => {
                let ident = self.expect_identifier()?;
                let range = ident.range;
                Some(Expr::new(ExprKind::Variable(ident), range))
            }
            TokenKind::LeftParenthesis => {
                self.advance();
                let inner = self.parse_expression()?;
                let end = self.expect(TokenKind::RightParenthesis)?.range;
                Some(Expr::new(inner.kind, token.range.merge(end)))
            }
            _ => {
                let got = self.text(&token);
                self.error_at(
                    format!("Expected an expression, but got '{got}'"),
                    token.range,
                );
                None
            }
        }
    }
}
