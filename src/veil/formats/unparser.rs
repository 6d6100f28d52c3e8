//! AST to source text
//!
//!     The unparser walks a [`Chunk`] and feeds tokens to an [`Emitter`]. Parentheses are
//!     inserted only where priorities require them, so re-parsing the output yields the same
//!     tree. Every variable name is read from the scope tree at emission time, which is how
//!     renaming reaches the output.

use super::emitter::{Emitter, Mode};
use crate::veil::ast::{
    BinaryOp, Block, Chunk, Expr, ExprKind, FunctionBody, FunctionName, ScopeTree, Stmt, StmtKind,
    TableField, UnaryOp, VarId, UNARY_PRIORITY,
};
use crate::veil::dialect::Dialect;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnparseError {
    #[error("'{name}' is not a valid identifier in {dialect}")]
    InvalidIdentifier { name: String, dialect: Dialect },
    #[error("{construct} is not supported in {dialect}")]
    Unsupported {
        construct: &'static str,
        dialect: Dialect,
    },
    #[error("goto '{0}' has no target label")]
    UnresolvedGoto(String),
}

/// Render `chunk` as `dialect` source.
pub fn unparse(chunk: &Chunk, dialect: Dialect, mode: Mode) -> Result<String> {
    let mut unparser = Unparser {
        scopes: &chunk.scopes,
        dialect,
        out: Emitter::new(mode),
    };
    unparser.statements(&chunk.body)?;
    Ok(unparser.out.finish())
}

/// Shortest source spelling of a non-negative number.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "(0/0)".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "(1/0)" } else { "(-1/0)" }.to_string();
    }
    let plain = if value.fract() == 0.0 && value.abs() < 9.2e18 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    };
    let exponent = format!("{:e}", value);
    if exponent.len() < plain.len() {
        exponent
    } else {
        plain
    }
}

/// Quote a byte string with double quotes.
pub fn quote_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &byte in bytes {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\{:03}", byte)),
        }
    }
    out.push('"');
    out
}

/// A negative literal is written as unary minus and binds like one.
fn is_negative_literal(expr: &Expr) -> bool {
    match expr.kind {
        ExprKind::Number(value) => {
            value.is_finite() && (value < 0.0 || (value == 0.0 && value.is_sign_negative()))
        }
        _ => false,
    }
}

fn left_needs_parens(op: BinaryOp, child: &Expr) -> bool {
    match &child.kind {
        ExprKind::Binary { op: inner, .. } => op.priority().0 > inner.priority().1,
        ExprKind::Unary { .. } => op.priority().0 > UNARY_PRIORITY,
        _ => is_negative_literal(child) && op.priority().0 > UNARY_PRIORITY,
    }
}

fn right_needs_parens(op: BinaryOp, child: &Expr) -> bool {
    match &child.kind {
        ExprKind::Binary { op: inner, .. } => inner.priority().0 <= op.priority().1,
        _ => false,
    }
}

fn operand_needs_parens(child: &Expr) -> bool {
    match &child.kind {
        ExprKind::Binary { op, .. } => op.priority().0 <= UNARY_PRIORITY,
        _ => false,
    }
}

/// Field and method names follow identifier shape without clashing with a reserved word.
fn is_field_name(name: &str) -> bool {
    Dialect::is_identifier_shaped(name) && !Dialect::Lua51.is_keyword(name)
}

/// Whether the first token of `expr`, as emitted, is `(`.
fn starts_with_paren(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Paren(_) => true,
        ExprKind::Call { callee: target, .. }
        | ExprKind::MethodCall {
            receiver: target, ..
        }
        | ExprKind::Index { object: target, .. }
        | ExprKind::Member { object: target, .. } => {
            !target.is_prefix() || starts_with_paren(target)
        }
        _ => false,
    }
}

fn statement_starts_with_paren(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Call(expr) => starts_with_paren(expr),
        StmtKind::Assignment { targets, .. } => targets.first().is_some_and(starts_with_paren),
        StmtKind::CompoundAssignment { target, .. } => starts_with_paren(target),
        _ => false,
    }
}

struct Unparser<'c> {
    scopes: &'c ScopeTree,
    dialect: Dialect,
    out: Emitter,
}

type Result<T> = std::result::Result<T, UnparseError>;

impl<'c> Unparser<'c> {
    fn unsupported(&self, construct: &'static str) -> UnparseError {
        UnparseError::Unsupported {
            construct,
            dialect: self.dialect,
        }
    }

    fn name(&mut self, id: VarId) -> Result<()> {
        let name = &self.scopes.variable(id).name;
        if !self.dialect.is_valid_identifier(name) {
            return Err(UnparseError::InvalidIdentifier {
                name: name.clone(),
                dialect: self.dialect,
            });
        }
        self.out.token(name);
        Ok(())
    }

    fn field_name(&mut self, name: &str) -> Result<()> {
        if !is_field_name(name) {
            return Err(UnparseError::InvalidIdentifier {
                name: name.to_string(),
                dialect: self.dialect,
            });
        }
        self.out.token(name);
        Ok(())
    }

    /// `=` and binary operators get surrounding spaces in pretty mode.
    fn operator(&mut self, symbol: &str) {
        self.out.space();
        self.out.token(symbol);
        self.out.space();
    }

    fn comma(&mut self) {
        self.out.token(",");
        self.out.space();
    }

    fn names(&mut self, ids: &[VarId]) -> Result<()> {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                self.comma();
            }
            self.name(*id)?;
        }
        Ok(())
    }

    fn expressions(&mut self, exprs: &[Expr]) -> Result<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.comma();
            }
            self.expr(expr)?;
        }
        Ok(())
    }

    fn statements(&mut self, block: &Block) -> Result<()> {
        for (i, stmt) in block.statements.iter().enumerate() {
            self.out.line();
            if i > 0 && statement_starts_with_paren(stmt) {
                self.out.token(";");
            }
            self.stmt(stmt)?;
        }
        Ok(())
    }

    /// An indented block followed by its closing keyword on its own line.
    fn body(&mut self, block: &Block, close: &str) -> Result<()> {
        self.out.indent();
        self.statements(block)?;
        self.out.dedent();
        self.out.line();
        self.out.keyword(close);
        Ok(())
    }

    fn function_tail(&mut self, parameters: &[VarId], function: &FunctionBody) -> Result<()> {
        self.out.token("(");
        self.names(parameters)?;
        if function.is_vararg {
            if !parameters.is_empty() {
                self.comma();
            }
            self.out.token("...");
        }
        self.out.token(")");
        self.body(&function.body, "end")
    }

    fn function_statement(&mut self, target: &FunctionName, function: &FunctionBody) -> Result<()> {
        self.out.keyword("function");
        self.name(target.base)?;
        for field in &target.fields {
            self.out.token(".");
            self.field_name(field)?;
        }
        let implicit_self = function
            .parameters
            .first()
            .is_some_and(|id| self.scopes.variable(*id).name == "self");
        match &target.method {
            Some(method) if implicit_self => {
                self.out.token(":");
                self.field_name(method)?;
                self.function_tail(&function.parameters[1..], function)
            }
            Some(method) => {
                self.out.token(".");
                self.field_name(method)?;
                self.function_tail(&function.parameters, function)
            }
            None => self.function_tail(&function.parameters, function),
        }
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Do(block) => {
                self.out.keyword("do");
                self.body(block, "end")?;
            }
            StmtKind::Local { variables, values } => {
                self.out.keyword("local");
                self.names(variables)?;
                if !values.is_empty() {
                    self.operator("=");
                    self.expressions(values)?;
                }
            }
            StmtKind::LocalFunction { variable, function } => {
                self.out.keyword("local");
                self.out.keyword("function");
                self.name(*variable)?;
                self.function_tail(&function.parameters, function)?;
            }
            StmtKind::Assignment { targets, values } => {
                self.expressions(targets)?;
                self.operator("=");
                self.expressions(values)?;
            }
            StmtKind::CompoundAssignment { op, target, value } => {
                if !self.dialect.supports_compound_assignment() {
                    return Err(self.unsupported("compound assignment"));
                }
                self.expr(target)?;
                self.operator(op.symbol());
                self.expr(value)?;
            }
            StmtKind::If {
                clauses,
                else_block,
            } => {
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        self.out.line();
                    }
                    self.out.keyword(if i == 0 { "if" } else { "elseif" });
                    self.expr(&clause.condition)?;
                    self.out.keyword("then");
                    self.out.indent();
                    self.statements(&clause.body)?;
                    self.out.dedent();
                }
                if let Some(block) = else_block {
                    self.out.line();
                    self.out.keyword("else");
                    self.out.indent();
                    self.statements(block)?;
                    self.out.dedent();
                }
                self.out.line();
                self.out.keyword("end");
            }
            StmtKind::While { condition, body } => {
                self.out.keyword("while");
                self.expr(condition)?;
                self.out.keyword("do");
                self.body(body, "end")?;
            }
            StmtKind::Repeat { body, condition } => {
                self.out.keyword("repeat");
                self.body(body, "until")?;
                self.expr(condition)?;
            }
            StmtKind::NumericFor {
                variable,
                start,
                limit,
                step,
                body,
            } => {
                self.out.keyword("for");
                self.name(*variable)?;
                self.operator("=");
                self.expr(start)?;
                self.comma();
                self.expr(limit)?;
                if let Some(step) = step {
                    self.comma();
                    self.expr(step)?;
                }
                self.out.keyword("do");
                self.body(body, "end")?;
            }
            StmtKind::GenericFor {
                variables,
                iterators,
                body,
            } => {
                self.out.keyword("for");
                self.names(variables)?;
                self.out.keyword("in");
                self.expressions(iterators)?;
                self.out.keyword("do");
                self.body(body, "end")?;
            }
            StmtKind::Function { target, function } => self.function_statement(target, function)?,
            StmtKind::Return(values) => {
                self.out.keyword("return");
                self.expressions(values)?;
            }
            StmtKind::Break => self.out.keyword("break"),
            StmtKind::Continue => {
                if !self.dialect.supports_continue() {
                    return Err(self.unsupported("continue"));
                }
                self.out.keyword("continue");
            }
            StmtKind::Call(expr) => self.expr(expr)?,
            StmtKind::Goto { name, label } => {
                if !self.dialect.supports_goto() {
                    return Err(self.unsupported("goto"));
                }
                let label = label.ok_or_else(|| UnparseError::UnresolvedGoto(name.clone()))?;
                self.out.keyword("goto");
                self.name(label)?;
            }
            StmtKind::Label(label) => {
                if !self.dialect.supports_goto() {
                    return Err(self.unsupported("labels"));
                }
                self.out.token("::");
                self.name(*label)?;
                self.out.token("::");
            }
        }
        Ok(())
    }

    fn parenthesized(&mut self, expr: &Expr, parens: bool) -> Result<()> {
        if parens {
            self.out.token("(");
            self.expr(expr)?;
            self.out.token(")");
            Ok(())
        } else {
            self.expr(expr)
        }
    }

    /// Calls and indexing need a prefix expression on the left.
    fn prefix(&mut self, expr: &Expr) -> Result<()> {
        self.parenthesized(expr, !expr.is_prefix())
    }

    fn arguments(&mut self, arguments: &[Expr]) -> Result<()> {
        self.out.token("(");
        self.expressions(arguments)?;
        self.out.token(")");
        Ok(())
    }

    fn bracketed_key(&mut self, key: &Expr) -> Result<()> {
        self.out.token("[");
        self.expr(key)?;
        self.out.token("]");
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Nil => self.out.token("nil"),
            ExprKind::True => self.out.token("true"),
            ExprKind::False => self.out.token("false"),
            ExprKind::Number(value) => {
                if is_negative_literal(expr) {
                    self.out.token("-");
                    self.out.number(&format_number(-value));
                } else if value.is_finite() {
                    self.out.number(&format_number(*value));
                } else {
                    self.out.token(&format_number(*value));
                }
            }
            ExprKind::String(bytes) => self.out.token(&quote_string(bytes)),
            ExprKind::Vararg => self.out.token("..."),
            ExprKind::Variable(id) => self.name(*id)?,
            ExprKind::Binary { op, left, right } => {
                self.parenthesized(left, left_needs_parens(*op, left))?;
                self.operator(op.symbol());
                self.parenthesized(right, right_needs_parens(*op, right))?;
            }
            ExprKind::Unary { op, operand } => {
                if *op == UnaryOp::Not {
                    self.out.keyword(op.symbol());
                } else {
                    self.out.token(op.symbol());
                }
                self.parenthesized(operand, operand_needs_parens(operand))?;
            }
            ExprKind::Call { callee, arguments } => {
                self.prefix(callee)?;
                self.arguments(arguments)?;
            }
            ExprKind::MethodCall {
                receiver,
                method,
                arguments,
            } => {
                self.prefix(receiver)?;
                self.out.token(":");
                self.field_name(method)?;
                self.arguments(arguments)?;
            }
            ExprKind::Index { object, key } => {
                self.prefix(object)?;
                self.bracketed_key(key)?;
            }
            ExprKind::Member { object, name } => {
                self.prefix(object)?;
                if is_field_name(name) {
                    self.out.token(".");
                    self.out.token(name);
                } else {
                    self.bracketed_key(&Expr::string(name.as_bytes()))?;
                }
            }
            ExprKind::Table(fields) => {
                self.out.token("{");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        self.comma();
                    }
                    match field {
                        TableField::Positional(value) => self.expr(value)?,
                        TableField::Named(name, value) => {
                            if is_field_name(name) {
                                self.out.token(name);
                            } else {
                                self.bracketed_key(&Expr::string(name.as_bytes()))?;
                            }
                            self.operator("=");
                            self.expr(value)?;
                        }
                        TableField::Keyed(key, value) => {
                            self.bracketed_key(key)?;
                            self.operator("=");
                            self.expr(value)?;
                        }
                    }
                }
                self.out.token("}");
            }
            ExprKind::Function(function) => {
                self.out.token("function");
                self.function_tail(&function.parameters, function)?;
            }
            ExprKind::Paren(inner) => {
                self.out.token("(");
                self.expr(inner)?;
                self.out.token(")");
            }
        }
        Ok(())
    }
}
