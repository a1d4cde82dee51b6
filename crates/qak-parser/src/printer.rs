//! Indented text dump of a module's syntax tree.

use std::fmt::{self, Write};

use qak_types::ast::*;

const INDENT: usize = 2;

/// Render `module` as an indented tree, one node per line.
pub fn print_module(module: &Module) -> String {
    SyntaxTree(module).to_string()
}

/// [`Display`](fmt::Display) adapter behind [`print_module`].
pub struct SyntaxTree<'a>(pub &'a Module);

impl fmt::Display for SyntaxTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Module")?;
        for function in &self.0.functions {
            write_function(f, function, INDENT)?;
        }
        for stmt in &self.0.statements {
            write_stmt(f, stmt, INDENT)?;
        }
        Ok(())
    }
}

fn line(f: &mut impl Write, indent: usize, text: fmt::Arguments<'_>) -> fmt::Result {
    writeln!(f, "{:indent$}{text}", "")
}

fn write_function(f: &mut impl Write, function: &Function, indent: usize) -> fmt::Result {
    line(f, indent, format_args!("Function: {}", function.name.name))?;
    if !function.params.is_empty() {
        line(f, indent + INDENT, format_args!("Parameters:"))?;
        for param in &function.params {
            line(f, indent + INDENT * 2, format_args!("Parameter: {}", param.name.name))?;
            line(f, indent + INDENT * 3, format_args!("Type: {}", param.type_name.name))?;
        }
    }
    if let Some(return_type) = &function.return_type {
        line(f, indent + INDENT, format_args!("Return type:"))?;
        line(f, indent + INDENT * 2, format_args!("Type: {}", return_type.name))?;
    }
    write_block(f, "Statements:", &function.body, indent + INDENT)
}

fn write_block(f: &mut impl Write, label: &str, stmts: &[Stmt], indent: usize) -> fmt::Result {
    if stmts.is_empty() {
        return Ok(());
    }
    line(f, indent, format_args!("{label}"))?;
    for stmt in stmts {
        write_stmt(f, stmt, indent + INDENT)?;
    }
    Ok(())
}

fn write_stmt(f: &mut impl Write, stmt: &Stmt, indent: usize) -> fmt::Result {
    match stmt {
        Stmt::Variable(var) => {
            line(f, indent, format_args!("Variable: {}", var.name.name))?;
            if let Some(type_name) = &var.type_name {
                line(f, indent + INDENT, format_args!("Type: {}", type_name.name))?;
            }
            if let Some(init) = &var.initializer {
                write_expr(f, init, indent + INDENT)?;
            }
            Ok(())
        }
        Stmt::Assignment(assign) => {
            line(f, indent, format_args!("Assignment:"))?;
            write_expr(f, &assign.target, indent + INDENT)?;
            write_expr(f, &assign.value, indent + INDENT)
        }
        Stmt::While(w) => {
            line(f, indent, format_args!("While:"))?;
            write_expr(f, &w.condition, indent + INDENT)?;
            write_block(f, "Statements:", &w.body, indent + INDENT)
        }
        Stmt::If(i) => {
            line(f, indent, format_args!("If:"))?;
            write_expr(f, &i.condition, indent + INDENT)?;
            write_block(f, "Then:", &i.then_block, indent + INDENT)?;
            write_block(f, "Else:", &i.else_block, indent + INDENT)
        }
        Stmt::Return(r) => {
            line(f, indent, format_args!("Return:"))?;
            match &r.value {
                Some(value) => write_expr(f, value, indent + INDENT),
                None => Ok(()),
            }
        }
        Stmt::Expr(e) => write_expr(f, e, indent),
    }
}

fn write_expr(f: &mut impl Write, expr: &Expr, indent: usize) -> fmt::Result {
    match &expr.kind {
        ExprKind::Literal { kind, text } => line(f, indent, format_args!("{kind}: {text}")),
        ExprKind::Variable(ident) => line(f, indent, format_args!("Variable access: {}", ident.name)),
        ExprKind::Call { callee, args } => {
            line(f, indent, format_args!("Call:"))?;
            write_expr(f, callee, indent + INDENT)?;
            if !args.is_empty() {
                line(f, indent + INDENT, format_args!("Arguments:"))?;
                for arg in args {
                    write_expr(f, arg, indent + INDENT * 2)?;
                }
            }
            Ok(())
        }
        ExprKind::Unary { op, operand } => {
            let symbol = match op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "!",
            };
            line(f, indent, format_args!("Unary operator: {symbol}"))?;
            write_expr(f, operand, indent + INDENT)
        }
        ExprKind::Binary { left, op, right } => {
            line(f, indent, format_args!("Binary operator: {}", op.symbol()))?;
            write_expr(f, left, indent + INDENT)?;
            write_expr(f, right, indent + INDENT)
        }
        ExprKind::Ternary {
            condition,
            then_value,
            else_value,
        } => {
            line(f, indent, format_args!("Ternary operator:"))?;
            write_expr(f, condition, indent + INDENT)?;
            write_expr(f, then_value, indent + INDENT)?;
            write_expr(f, else_value, indent + INDENT)
        }
    }
}
