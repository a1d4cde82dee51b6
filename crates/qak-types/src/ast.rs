//! AST node types for Qak modules.
//!
//! Every node carries a [`SourceRange`]. The AST never crosses the engine
//! boundary as records; the engine only prints it.

use crate::{SourceRange, TokenKind};

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed module: top-level functions and statements in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub functions: Vec<Function>,
    pub statements: Vec<Stmt>,
    pub range: SourceRange,
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub range: SourceRange,
}

impl Ident {
    pub fn new(name: impl Into<String>, range: SourceRange) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }
}

/// `function name(params): ReturnType ... end`
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_type: Option<Ident>,
    pub body: Vec<Stmt>,
    pub range: SourceRange,
}

/// `name: Type`
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub type_name: Ident,
    pub range: SourceRange,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var name: Type = expr`
    Variable(VariableDecl),
    /// `target = value`
    Assignment(Assignment),
    /// `while cond ... end`
    While(WhileStmt),
    /// `if cond ... else ... end`
    If(IfStmt),
    /// `return expr`
    Return(ReturnStmt),
    /// A bare expression, usually a call.
    Expr(Expr),
}

impl Stmt {
    pub fn range(&self) -> SourceRange {
        match self {
            Stmt::Variable(s) => s.range,
            Stmt::Assignment(s) => s.range,
            Stmt::While(s) => s.range,
            Stmt::If(s) => s.range,
            Stmt::Return(s) => s.range,
            Stmt::Expr(e) => e.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: Ident,
    pub type_name: Option<Ident>,
    pub initializer: Option<Expr>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Expr,
    pub value: Expr,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Vec<Stmt>,
    pub else_block: Vec<Stmt>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub range: SourceRange,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: SourceRange,
}

impl Expr {
    pub fn new(kind: ExprKind, range: SourceRange) -> Self {
        Self { kind, range }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Any literal token; `kind` says which.
    Literal { kind: TokenKind, text: String },
    /// A variable reference.
    Variable(Ident),
    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `-x`, `!x`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `a + b` etc.
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `cond ? a : b`
    Ternary {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
    Xor,
}

impl BinOp {
    /// Map an operator token to a binary operator.
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        let op = match kind {
            TokenKind::Plus => Self::Add,
            TokenKind::Minus => Self::Sub,
            TokenKind::Asterisk => Self::Mul,
            TokenKind::ForwardSlash => Self::Div,
            TokenKind::Percentage => Self::Mod,
            TokenKind::Equal => Self::Eq,
            TokenKind::NotEqual => Self::NotEq,
            TokenKind::Less => Self::Less,
            TokenKind::LessEqual => Self::LessEq,
            TokenKind::Greater => Self::Greater,
            TokenKind::GreaterEqual => Self::GreaterEq,
            TokenKind::And => Self::And,
            TokenKind::Or => Self::Or,
            TokenKind::Xor => Self::Xor,
            _ => return None,
        };
        Some(op)
    }

    /// Binding power, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or | Self::Xor => 1,
            Self::And => 2,
            Self::Eq | Self::NotEq => 3,
            Self::Less | Self::LessEq | Self::Greater | Self::GreaterEq => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Mod => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
        }
    }
}
