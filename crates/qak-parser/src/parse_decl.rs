//! Function declarations.

use crate::parser::Parser;
use qak_types::ast::*;
use qak_types::TokenKind;

impl<'src> Parser<'src> {
    /// `function name(a: T, b: U): R statements end`
    pub(crate) fn parse_function(&mut self) -> Option<Function> {
        let start = self.expect_word("function")?.range;
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;

        let return_type = if self.eat(TokenKind::Colon) {
            Some(self.expect_identifier()?)
        } else {
            None
        };

        let body = self.parse_block(&["end"])?;
        let end = self.expect_word("end")?.range;
        Some(Function {
            name,
            params,
            return_type,
            body,
            range: start.merge(end),
        })
    }

    /// `( (name: Type (, name: Type)*)? )`
    fn parse_params(&mut self) -> Option<Vec<Param>> {
        self.expect(TokenKind::LeftParenthesis)?;
        let mut params = Vec::new();
        while self.check(TokenKind::Identifier) {
            params.push(self.parse_param()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParenthesis)?;
        Some(params)
    }

    fn parse_param(&mut self) -> Option<Param> {
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let type_name = self.expect_identifier()?;
        let range = name.range.merge(type_name.range);
        Some(Param {
            name,
            type_name,
            range,
        })
    }
}
