//! Qak parser: converts a token stream into an AST.

mod parse_decl;
mod parse_expr;
mod parse_stmt;
mod parser;
pub mod printer;

pub use parser::{parse, ParseResult, Parser};
pub use printer::print_module;
