//! Statement parsing
//!
//!     One function per statement form, dispatched on the first token. Blocks end at `end`,
//!     `else`, `elseif`, `until` or end of input; `return`, `break` and `continue` must be the
//!     last statement of their block.

use super::{FunctionState, ParseError, Parser};
use crate::veil::ast::{
    Block, CompoundOp, FunctionBody, FunctionName, IfClause, Range, ScopeId, ScopeKind, Stmt,
    StmtKind, VarId, VariableKind,
};
use crate::veil::token::Token;

fn compound_op(token: &Token) -> Option<CompoundOp> {
    match token {
        Token::PlusAssign => Some(CompoundOp::Add),
        Token::MinusAssign => Some(CompoundOp::Sub),
        Token::StarAssign => Some(CompoundOp::Mul),
        Token::SlashAssign => Some(CompoundOp::Div),
        Token::PercentAssign => Some(CompoundOp::Mod),
        Token::CaretAssign => Some(CompoundOp::Pow),
        Token::ConcatAssign => Some(CompoundOp::Concat),
        _ => None,
    }
}

/// Blocks directly nested in a statement, not entering function bodies.
fn nested_blocks_mut(kind: &mut StmtKind) -> Vec<&mut Block> {
    match kind {
        StmtKind::Do(body)
        | StmtKind::While { body, .. }
        | StmtKind::Repeat { body, .. }
        | StmtKind::NumericFor { body, .. }
        | StmtKind::GenericFor { body, .. } => vec![body],
        StmtKind::If {
            clauses,
            else_block,
        } => clauses
            .iter_mut()
            .map(|clause| &mut clause.body)
            .chain(else_block.iter_mut())
            .collect(),
        _ => Vec::new(),
    }
}

fn nested_blocks(kind: &StmtKind) -> Vec<&Block> {
    match kind {
        StmtKind::Do(body)
        | StmtKind::While { body, .. }
        | StmtKind::Repeat { body, .. }
        | StmtKind::NumericFor { body, .. }
        | StmtKind::GenericFor { body, .. } => vec![body],
        StmtKind::If {
            clauses,
            else_block,
        } => clauses
            .iter()
            .map(|clause| &clause.body)
            .chain(else_block.iter())
            .collect(),
        _ => Vec::new(),
    }
}

fn for_each_goto(statements: &mut [Stmt], f: &mut dyn FnMut(&mut Stmt)) {
    for stmt in statements {
        if matches!(stmt.kind, StmtKind::Goto { .. }) {
            f(stmt);
            continue;
        }
        for block in nested_blocks_mut(&mut stmt.kind) {
            for_each_goto(&mut block.statements, f);
        }
    }
}

fn find_unresolved_goto(statements: &[Stmt]) -> Option<(&str, &Range)> {
    for stmt in statements {
        if let StmtKind::Goto { name, label: None } = &stmt.kind {
            return Some((name, &stmt.location));
        }
        for block in nested_blocks(&stmt.kind) {
            if let Some(found) = find_unresolved_goto(&block.statements) {
                return Some(found);
            }
        }
    }
    None
}

impl Parser<'_> {
    /// Parse statements up to a block closer, with `scope` as the block scope.
    pub(super) fn block_in(&mut self, scope: ScopeId) -> Result<Block, ParseError> {
        self.nested(|p| p.within(scope, |p| {
            let start = p.current_range();
            let mut statements = Vec::new();
            while !p.peek().ends_block() {
                if p.test_next(&Token::Semicolon) {
                    continue;
                }
                let stmt = p.statement()?;
                let last = matches!(
                    stmt.kind,
                    StmtKind::Return(_) | StmtKind::Break | StmtKind::Continue
                );
                statements.push(stmt);
                if last {
                    p.test_next(&Token::Semicolon);
                    break;
                }
            }
            p.patch_gotos(&mut statements, scope);
            let location = if statements.is_empty() {
                start
            } else {
                p.span_from(&start)
            };
            Ok(Block {
                scope,
                statements,
                location,
            })
        }))
    }

    fn block(&mut self, kind: ScopeKind) -> Result<Block, ParseError> {
        let scope = self.new_scope(kind);
        self.block_in(scope)
    }

    fn loop_body(&mut self, scope: ScopeId) -> Result<Block, ParseError> {
        self.function_mut().loop_depth += 1;
        let body = self.block_in(scope);
        self.function_mut().loop_depth -= 1;
        body
    }

    /// Point pending gotos at the labels declared directly in `scope`.
    fn patch_gotos(&mut self, statements: &mut [Stmt], scope: ScopeId) {
        let labels: Vec<(String, VarId)> = self
            .scopes
            .scope(scope)
            .variables
            .iter()
            .map(|id| self.scopes.variable(*id))
            .filter(|var| var.is_label())
            .map(|var| (var.declared_name.clone(), var.id))
            .collect();
        if labels.is_empty() {
            return;
        }

        let mut resolved = Vec::new();
        for_each_goto(statements, &mut |stmt| {
            if let StmtKind::Goto { name, label } = &mut stmt.kind {
                if label.is_none() {
                    if let Some((_, id)) = labels.iter().find(|(label_name, _)| label_name == name)
                    {
                        *label = Some(*id);
                        resolved.push((*id, stmt.location.clone()));
                    }
                }
            }
        });
        for (id, location) in resolved {
            self.scopes.reference(id, scope, location);
        }
    }

    /// Checks run when a function body (or the chunk) is complete.
    pub(super) fn close_function(&self, body: &Block) -> Result<(), ParseError> {
        match find_unresolved_goto(&body.statements) {
            Some((name, location)) => {
                Err(self.error_at(location, format!("no visible label '{}' for goto", name)))
            }
            None => Ok(()),
        }
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_range();
        let token = self.peek().clone();
        let kind = match &token {
            Token::If => self.if_statement(&start)?,
            Token::While => self.while_statement(&start)?,
            Token::Do => {
                self.advance();
                let body = self.block(ScopeKind::Block)?;
                self.expect_match(&Token::End, &Token::Do, &start)?;
                StmtKind::Do(body)
            }
            Token::For => self.for_statement(&start)?,
            Token::Repeat => self.repeat_statement(&start)?,
            Token::Function => self.function_statement(&start)?,
            Token::Local => self.local_statement(&start)?,
            Token::DoubleColon => self.label_statement(&start)?,
            Token::Return => self.return_statement()?,
            Token::Break => {
                self.advance();
                if self.function().loop_depth == 0 {
                    return Err(self.error_at(&start, "'break' outside a loop"));
                }
                StmtKind::Break
            }
            // Contextual: only `goto <name>` under a goto dialect is a statement.
            Token::Name(name)
                if name == "goto"
                    && self.dialect.supports_goto()
                    && matches!(self.peek_at(1), Token::Name(_)) =>
            {
                self.advance();
                let (label, _) = self.expect_name()?;
                StmtKind::Goto { name: label, label: None }
            }
            Token::Name(name) if name == "continue" => {
                if self.dialect.supports_continue() {
                    self.advance();
                    if self.function().loop_depth == 0 {
                        return Err(self.error_at(&start, "'continue' outside a loop"));
                    }
                    StmtKind::Continue
                } else if self.peek_at(1).ends_block() || self.peek_at(1) == &Token::Semicolon {
                    return Err(self.error(format!(
                        "'continue' is not supported in {}",
                        self.dialect
                    )));
                } else {
                    self.expression_statement()?
                }
            }
            _ => self.expression_statement()?,
        };
        Ok(Stmt::at(kind, self.span_from(&start)))
    }

    fn if_statement(&mut self, start: &Range) -> Result<StmtKind, ParseError> {
        self.advance();
        let mut clauses = Vec::new();
        loop {
            let condition = self.expression()?;
            self.expect(&Token::Then)?;
            let body = self.block(ScopeKind::Block)?;
            clauses.push(IfClause { condition, body });
            if !self.test_next(&Token::Elseif) {
                break;
            }
        }
        let else_block = if self.test_next(&Token::Else) {
            Some(self.block(ScopeKind::Block)?)
        } else {
            None
        };
        self.expect_match(&Token::End, &Token::If, start)?;
        Ok(StmtKind::If {
            clauses,
            else_block,
        })
    }

    fn while_statement(&mut self, start: &Range) -> Result<StmtKind, ParseError> {
        self.advance();
        let condition = self.expression()?;
        self.expect(&Token::Do)?;
        let scope = self.new_scope(ScopeKind::Loop);
        let body = self.loop_body(scope)?;
        self.expect_match(&Token::End, &Token::While, start)?;
        Ok(StmtKind::While { condition, body })
    }

    fn repeat_statement(&mut self, start: &Range) -> Result<StmtKind, ParseError> {
        self.advance();
        let scope = self.new_scope(ScopeKind::Loop);
        let body = self.loop_body(scope)?;
        self.expect_match(&Token::Until, &Token::Repeat, start)?;
        let condition = self.within(scope, |p| p.expression())?;
        Ok(StmtKind::Repeat { body, condition })
    }

    fn for_statement(&mut self, start: &Range) -> Result<StmtKind, ParseError> {
        self.advance();
        let (first, first_range) = self.expect_name()?;

        if self.test_next(&Token::Assign) {
            let from = self.expression()?;
            self.expect(&Token::Comma)?;
            let limit = self.expression()?;
            let step = if self.test_next(&Token::Comma) {
                Some(self.expression()?)
            } else {
                None
            };
            self.expect(&Token::Do)?;
            let scope = self.new_scope(ScopeKind::Loop);
            let variable = self
                .scopes
                .declare(scope, &first, VariableKind::Local, first_range);
            let body = self.loop_body(scope)?;
            self.expect_match(&Token::End, &Token::For, start)?;
            return Ok(StmtKind::NumericFor {
                variable,
                start: from,
                limit,
                step,
                body,
            });
        }

        let mut names = vec![(first, first_range)];
        while self.test_next(&Token::Comma) {
            names.push(self.expect_name()?);
        }
        if !self.check(&Token::In) {
            let expected = if names.len() == 1 {
                vec!["'='".to_string(), "'in'".to_string()]
            } else {
                vec!["'in'".to_string()]
            };
            return Err(self.expected(&expected));
        }
        self.advance();
        let iterators = self.expression_list()?;
        self.expect(&Token::Do)?;

        let scope = self.new_scope(ScopeKind::Loop);
        let mut variables = Vec::with_capacity(names.len());
        for (name, range) in names {
            variables.push(self.scopes.declare(scope, &name, VariableKind::Local, range));
        }
        let body = self.loop_body(scope)?;
        self.expect_match(&Token::End, &Token::For, start)?;
        Ok(StmtKind::GenericFor {
            variables,
            iterators,
            body,
        })
    }

    fn function_statement(&mut self, start: &Range) -> Result<StmtKind, ParseError> {
        self.advance();
        let (name, range) = self.expect_name()?;
        let base = self.reference_name(&name, range);

        let mut fields = Vec::new();
        while self.test_next(&Token::Dot) {
            fields.push(self.expect_field_name()?);
        }
        let method = if self.test_next(&Token::Colon) {
            Some(self.expect_field_name()?)
        } else {
            None
        };

        let function = self.function_body(method.is_some(), start)?;
        Ok(StmtKind::Function {
            target: FunctionName {
                base,
                fields,
                method,
            },
            function,
        })
    }

    fn local_statement(&mut self, start: &Range) -> Result<StmtKind, ParseError> {
        self.advance();
        if self.test_next(&Token::Function) {
            let (name, range) = self.expect_name()?;
            let variable = self
                .scopes
                .declare(self.scope, &name, VariableKind::Local, range);
            let function = self.function_body(false, start)?;
            return Ok(StmtKind::LocalFunction { variable, function });
        }

        let mut names = vec![self.expect_name()?];
        while self.test_next(&Token::Comma) {
            names.push(self.expect_name()?);
        }
        let values = if self.test_next(&Token::Assign) {
            self.expression_list()?
        } else {
            Vec::new()
        };

        let mut variables = Vec::with_capacity(names.len());
        for (name, range) in names {
            variables.push(
                self.scopes
                    .declare(self.scope, &name, VariableKind::Local, range),
            );
        }
        Ok(StmtKind::Local { variables, values })
    }

    fn label_statement(&mut self, start: &Range) -> Result<StmtKind, ParseError> {
        if !self.dialect.supports_goto() {
            return Err(self.error(format!("labels are not supported in {}", self.dialect)));
        }
        self.advance();
        let (name, range) = self.expect_name()?;
        self.expect_match(&Token::DoubleColon, &Token::DoubleColon, start)?;
        if self.scopes.resolve_label(self.scope, &name).is_some() {
            return Err(self.error_at(&range, format!("label '{}' already defined", name)));
        }
        let id = self
            .scopes
            .declare(self.scope, &name, VariableKind::Label, range);
        Ok(StmtKind::Label(id))
    }

    fn return_statement(&mut self) -> Result<StmtKind, ParseError> {
        self.advance();
        if self.peek().ends_block() || self.check(&Token::Semicolon) {
            return Ok(StmtKind::Return(Vec::new()));
        }
        Ok(StmtKind::Return(self.expression_list()?))
    }

    /// Assignment, compound assignment or call.
    fn expression_statement(&mut self) -> Result<StmtKind, ParseError> {
        let expr = self.suffixed_expression()?;

        if self.check(&Token::Assign) || self.check(&Token::Comma) {
            let mut targets = vec![expr];
            while self.test_next(&Token::Comma) {
                targets.push(self.suffixed_expression()?);
            }
            if let Some(target) = targets.iter().find(|t| !t.is_assignable()) {
                return Err(self.error_at(&target.location, "syntax error: cannot assign to this expression"));
            }
            self.expect(&Token::Assign)?;
            let values = self.expression_list()?;
            return Ok(StmtKind::Assignment { targets, values });
        }

        if let Some(op) = compound_op(self.peek()) {
            if !self.dialect.supports_compound_assignment() {
                return Err(self.error(format!(
                    "compound assignment is not supported in {}",
                    self.dialect
                )));
            }
            if !expr.is_assignable() {
                return Err(self.error_at(&expr.location, "syntax error: cannot assign to this expression"));
            }
            self.advance();
            let value = self.expression()?;
            return Ok(StmtKind::CompoundAssignment {
                op,
                target: expr,
                value,
            });
        }

        if expr.is_call() {
            Ok(StmtKind::Call(expr))
        } else {
            Err(self.error(format!("syntax error near {}", self.peek())))
        }
    }

    /// Parameter list and body. `start` is where the function syntax began.
    pub(super) fn function_body(
        &mut self,
        is_method: bool,
        start: &Range,
    ) -> Result<FunctionBody, ParseError> {
        let scope = self.new_scope(ScopeKind::Function);
        self.within(scope, |p| {
            let mut parameters = Vec::new();
            if is_method {
                parameters.push(p.scopes.declare(
                    scope,
                    "self",
                    VariableKind::Parameter,
                    Range::default(),
                ));
            }

            let open = p.expect(&Token::LParen)?;
            let mut is_vararg = false;
            if !p.check(&Token::RParen) {
                loop {
                    if p.test_next(&Token::Ellipsis) {
                        is_vararg = true;
                        break;
                    }
                    let (name, range) = p.expect_name()?;
                    parameters.push(p.scopes.declare(scope, &name, VariableKind::Parameter, range));
                    if !p.test_next(&Token::Comma) {
                        break;
                    }
                }
            }
            p.expect_match(&Token::RParen, &Token::LParen, &open)?;

            p.functions.push(FunctionState {
                is_vararg,
                loop_depth: 0,
            });
            let body = p.block_in(scope);
            p.functions.pop();
            let body = body?;
            p.expect_match(&Token::End, &Token::Function, start)?;
            p.close_function(&body)?;

            Ok(FunctionBody {
                parameters,
                is_vararg,
                body,
            })
        })
    }
}
