//! Shared host-side types for Qak.
//!
//! Values in this crate are what the boundary layer hands to its callers
//! after decoding engine records: they own all their data and never point
//! back into engine memory. The AST types are used by the reference engine.

mod diagnostic;
mod source;
mod span;
mod token;
pub mod ast;

pub use diagnostic::Diagnostic;
pub use source::{Source, SourceFile};
pub use span::{SourceRange, Span};
pub use token::{Token, TokenKind};
