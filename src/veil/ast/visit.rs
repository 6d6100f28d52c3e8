//! Tree traversal
//!
//!     [`Visitor`] walks a tree read-only with empty default hooks, so implementors only
//!     override what they need. [`for_each_expr_mut`] is the rewriting walk used by transform
//!     steps: it visits expressions bottom-up and hands each one to a closure together with the
//!     scope the expression is evaluated in. Replacing a node inside the closure does not cause
//!     the replacement to be visited again.

use super::nodes::{Block, Chunk, Expr, ExprKind, FunctionBody, Stmt, StmtKind, TableField};
use super::scope::{Scope, ScopeId, Variable};
use std::collections::HashSet;
use std::mem::size_of;

pub trait Visitor {
    fn visit_block(&mut self, _block: &Block) {}
    fn leave_block(&mut self, _block: &Block) {}
    fn visit_stmt(&mut self, _stmt: &Stmt) {}
    fn visit_expr(&mut self, _expr: &Expr) {}
    fn visit_function(&mut self, _function: &FunctionBody) {}
}

pub fn walk_block(visitor: &mut dyn Visitor, block: &Block) {
    visitor.visit_block(block);
    for stmt in &block.statements {
        walk_stmt(visitor, stmt);
    }
    visitor.leave_block(block);
}

pub fn walk_stmt(visitor: &mut dyn Visitor, stmt: &Stmt) {
    visitor.visit_stmt(stmt);
    match &stmt.kind {
        StmtKind::Do(body) => walk_block(visitor, body),
        StmtKind::Local { values, .. } => walk_exprs(visitor, values),
        StmtKind::LocalFunction { function, .. } | StmtKind::Function { function, .. } => {
            walk_function(visitor, function)
        }
        StmtKind::Assignment { targets, values } => {
            walk_exprs(visitor, targets);
            walk_exprs(visitor, values);
        }
        StmtKind::CompoundAssignment { target, value, .. } => {
            walk_expr(visitor, target);
            walk_expr(visitor, value);
        }
        StmtKind::If {
            clauses,
            else_block,
        } => {
            for clause in clauses {
                walk_expr(visitor, &clause.condition);
                walk_block(visitor, &clause.body);
            }
            if let Some(block) = else_block {
                walk_block(visitor, block);
            }
        }
        StmtKind::While { condition, body } => {
            walk_expr(visitor, condition);
            walk_block(visitor, body);
        }
        StmtKind::Repeat { body, condition } => {
            walk_block(visitor, body);
            walk_expr(visitor, condition);
        }
        StmtKind::NumericFor {
            start,
            limit,
            step,
            body,
            ..
        } => {
            walk_expr(visitor, start);
            walk_expr(visitor, limit);
            if let Some(step) = step {
                walk_expr(visitor, step);
            }
            walk_block(visitor, body);
        }
        StmtKind::GenericFor {
            iterators, body, ..
        } => {
            walk_exprs(visitor, iterators);
            walk_block(visitor, body);
        }
        StmtKind::Return(values) => walk_exprs(visitor, values),
        StmtKind::Call(call) => walk_expr(visitor, call),
        StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Goto { .. }
        | StmtKind::Label(_) => {}
    }
}

fn walk_exprs(visitor: &mut dyn Visitor, exprs: &[Expr]) {
    for expr in exprs {
        walk_expr(visitor, expr);
    }
}

fn walk_function(visitor: &mut dyn Visitor, function: &FunctionBody) {
    visitor.visit_function(function);
    walk_block(visitor, &function.body);
}

pub fn walk_expr(visitor: &mut dyn Visitor, expr: &Expr) {
    visitor.visit_expr(expr);
    match &expr.kind {
        ExprKind::Binary { left, right, .. } => {
            walk_expr(visitor, left);
            walk_expr(visitor, right);
        }
        ExprKind::Unary { operand, .. } => walk_expr(visitor, operand),
        ExprKind::Call { callee, arguments } => {
            walk_expr(visitor, callee);
            walk_exprs(visitor, arguments);
        }
        ExprKind::MethodCall {
            receiver,
            arguments,
            ..
        } => {
            walk_expr(visitor, receiver);
            walk_exprs(visitor, arguments);
        }
        ExprKind::Index { object, key } => {
            walk_expr(visitor, object);
            walk_expr(visitor, key);
        }
        ExprKind::Member { object, .. } => walk_expr(visitor, object),
        ExprKind::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Positional(value) | TableField::Named(_, value) => {
                        walk_expr(visitor, value)
                    }
                    TableField::Keyed(key, value) => {
                        walk_expr(visitor, key);
                        walk_expr(visitor, value);
                    }
                }
            }
        }
        ExprKind::Function(function) => walk_function(visitor, function),
        ExprKind::Paren(inner) => walk_expr(visitor, inner),
        ExprKind::Nil
        | ExprKind::True
        | ExprKind::False
        | ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Vararg
        | ExprKind::Variable(_) => {}
    }
}

/// Visit every expression in `block` bottom-up with the scope it is evaluated in.
pub fn for_each_expr_mut<F>(block: &mut Block, f: &mut F)
where
    F: FnMut(&mut Expr, ScopeId),
{
    let scope = block.scope;
    for stmt in &mut block.statements {
        stmt_exprs_mut(stmt, scope, f);
    }
}

fn stmt_exprs_mut<F>(stmt: &mut Stmt, scope: ScopeId, f: &mut F)
where
    F: FnMut(&mut Expr, ScopeId),
{
    match &mut stmt.kind {
        StmtKind::Do(body) => for_each_expr_mut(body, f),
        StmtKind::Local { values, .. } => exprs_mut(values, scope, f),
        StmtKind::LocalFunction { function, .. } | StmtKind::Function { function, .. } => {
            for_each_expr_mut(&mut function.body, f)
        }
        StmtKind::Assignment { targets, values } => {
            exprs_mut(targets, scope, f);
            exprs_mut(values, scope, f);
        }
        StmtKind::CompoundAssignment { target, value, .. } => {
            expr_mut(target, scope, f);
            expr_mut(value, scope, f);
        }
        StmtKind::If {
            clauses,
            else_block,
        } => {
            for clause in clauses {
                expr_mut(&mut clause.condition, scope, f);
                for_each_expr_mut(&mut clause.body, f);
            }
            if let Some(block) = else_block {
                for_each_expr_mut(block, f);
            }
        }
        StmtKind::While { condition, body } => {
            expr_mut(condition, scope, f);
            for_each_expr_mut(body, f);
        }
        StmtKind::Repeat { body, condition } => {
            let inner = body.scope;
            for_each_expr_mut(body, f);
            expr_mut(condition, inner, f);
        }
        StmtKind::NumericFor {
            start,
            limit,
            step,
            body,
            ..
        } => {
            expr_mut(start, scope, f);
            expr_mut(limit, scope, f);
            if let Some(step) = step {
                expr_mut(step, scope, f);
            }
            for_each_expr_mut(body, f);
        }
        StmtKind::GenericFor {
            iterators, body, ..
        } => {
            exprs_mut(iterators, scope, f);
            for_each_expr_mut(body, f);
        }
        StmtKind::Return(values) => exprs_mut(values, scope, f),
        StmtKind::Call(call) => expr_mut(call, scope, f),
        StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Goto { .. }
        | StmtKind::Label(_) => {}
    }
}

fn exprs_mut<F>(exprs: &mut [Expr], scope: ScopeId, f: &mut F)
where
    F: FnMut(&mut Expr, ScopeId),
{
    for expr in exprs {
        expr_mut(expr, scope, f);
    }
}

fn expr_mut<F>(expr: &mut Expr, scope: ScopeId, f: &mut F)
where
    F: FnMut(&mut Expr, ScopeId),
{
    match &mut expr.kind {
        ExprKind::Binary { left, right, .. } => {
            expr_mut(left, scope, f);
            expr_mut(right, scope, f);
        }
        ExprKind::Unary { operand, .. } => expr_mut(operand, scope, f),
        ExprKind::Call { callee, arguments } => {
            expr_mut(callee, scope, f);
            exprs_mut(arguments, scope, f);
        }
        ExprKind::MethodCall {
            receiver,
            arguments,
            ..
        } => {
            expr_mut(receiver, scope, f);
            exprs_mut(arguments, scope, f);
        }
        ExprKind::Index { object, key } => {
            expr_mut(object, scope, f);
            expr_mut(key, scope, f);
        }
        ExprKind::Member { object, .. } => expr_mut(object, scope, f),
        ExprKind::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Positional(value) | TableField::Named(_, value) => {
                        expr_mut(value, scope, f)
                    }
                    TableField::Keyed(key, value) => {
                        expr_mut(key, scope, f);
                        expr_mut(value, scope, f);
                    }
                }
            }
        }
        ExprKind::Function(function) => for_each_expr_mut(&mut function.body, f),
        ExprKind::Paren(inner) => expr_mut(inner, scope, f),
        ExprKind::Nil
        | ExprKind::True
        | ExprKind::False
        | ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Vararg
        | ExprKind::Variable(_) => {}
    }
    f(expr, scope);
}

#[derive(Default)]
struct NodeCounter {
    statements: usize,
    expressions: usize,
    literal_bytes: usize,
}

impl Visitor for NodeCounter {
    fn visit_stmt(&mut self, _stmt: &Stmt) {
        self.statements += 1;
    }

    fn visit_expr(&mut self, expr: &Expr) {
        self.expressions += 1;
        match &expr.kind {
            ExprKind::String(bytes) => self.literal_bytes += bytes.len(),
            ExprKind::Member { name, .. } | ExprKind::MethodCall { method: name, .. } => {
                self.literal_bytes += name.len()
            }
            _ => {}
        }
    }
}

/// Approximate heap footprint of a chunk in bytes.
pub fn estimate_footprint(chunk: &Chunk) -> usize {
    let mut counter = NodeCounter::default();
    walk_block(&mut counter, &chunk.body);
    let names: usize = chunk
        .scopes
        .variables()
        .iter()
        .map(|var| var.name.len() + var.declared_name.len())
        .sum();

    counter.statements * size_of::<Stmt>()
        + counter.expressions * size_of::<Expr>()
        + counter.literal_bytes
        + chunk.scopes.variables().len() * size_of::<Variable>()
        + chunk.scopes.scopes().len() * size_of::<Scope>()
        + names
}

struct IntegrityCheck<'a> {
    chunk: &'a Chunk,
    seen_scopes: HashSet<ScopeId>,
    problems: Vec<String>,
}

impl IntegrityCheck<'_> {
    fn check_var(&mut self, id: super::scope::VarId, what: &str) {
        if self.chunk.scopes.get_variable(id).is_none() {
            self.problems
                .push(format!("{} refers to missing variable {}", what, id.0));
        }
    }
}

impl Visitor for IntegrityCheck<'_> {
    fn visit_block(&mut self, block: &Block) {
        let chunk = self.chunk;
        if chunk.scopes.get_scope(block.scope).is_none() {
            self.problems
                .push(format!("block refers to missing scope {}", block.scope.0));
        } else if !self.seen_scopes.insert(block.scope) {
            self.problems
                .push(format!("scope {} is shared by two blocks", block.scope.0));
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Local { variables, .. } | StmtKind::GenericFor { variables, .. } => {
                for id in variables {
                    self.check_var(*id, "declaration");
                }
            }
            StmtKind::LocalFunction { variable, .. } | StmtKind::NumericFor { variable, .. } => {
                self.check_var(*variable, "declaration")
            }
            StmtKind::Function { target, .. } => self.check_var(target.base, "function name"),
            StmtKind::Goto { name, label } => match label {
                Some(id) => self.check_var(*id, "goto"),
                None => self.problems.push(format!("goto '{}' has no label", name)),
            },
            StmtKind::Label(id) => self.check_var(*id, "label"),
            _ => {}
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        let chunk = self.chunk;
        if let ExprKind::Variable(id) = expr.kind {
            match chunk.scopes.get_variable(id) {
                Some(var) if var.is_label() => self
                    .problems
                    .push(format!("label '{}' used as a value", var.name)),
                Some(_) => {}
                None => self.check_var(id, "expression"),
            }
        }
    }

    fn visit_function(&mut self, function: &FunctionBody) {
        for id in &function.parameters {
            self.check_var(*id, "parameter");
        }
    }
}

/// Structural checks run on the output of every transform step.
pub fn check_integrity(chunk: &Chunk) -> Result<(), String> {
    if chunk.global_scope != chunk.scopes.global() {
        return Err("chunk global scope handle is not the tree root".to_string());
    }
    match chunk.scopes.get_scope(chunk.body.scope) {
        Some(scope) if scope.parent == Some(chunk.global_scope) => {}
        _ => return Err("chunk body scope is not a child of the global scope".to_string()),
    }

    let mut check = IntegrityCheck {
        chunk,
        seen_scopes: HashSet::new(),
        problems: Vec::new(),
    };
    walk_block(&mut check, &chunk.body);
    match check.problems.into_iter().next() {
        Some(problem) => Err(problem),
        None => Ok(()),
    }
}
