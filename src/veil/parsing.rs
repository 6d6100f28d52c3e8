//! Parsing module for Lua source
//!
//!     This module turns the token stream from [lexing](crate::veil::lexing) into a
//!     [`Chunk`]: the AST plus its scope tree.
//!
//! Parsing End To End
//!
//!     Statements are parsed by recursive descent (see [statements]) and expressions by
//!     priority climbing over Lua's operator table (see [expressions]).
//!
//!     Scope construction is interleaved with parsing rather than run as a second pass. Each
//!     block pushes a child scope, declarations register variables the moment the grammar
//!     makes them visible, and every name is resolved as soon as it is read. This is what makes
//!     Lua's scoping rules fall out naturally:
//!
//!         - `local x = x` resolves the right-hand `x` before the new `x` exists.
//!         - `local function f` declares `f` before its body, so the body can recurse.
//!         - the `until` condition of `repeat` is parsed inside the loop body scope.
//!         - names that are nowhere declared become globals on first reference.
//!
//!     Gotos (Lua51 only) cannot be resolved when read since labels may come later. They are
//!     patched each time a block closes, and any goto still unresolved when its function ends
//!     is an error.
//!
//! Snippets
//!
//!     [`parse_snippet`] parses a fragment of Lua into an existing scope tree. Transform
//!     steps use it to inject helper code at the top of a program: the fragment declares into
//!     the given scope and its free names resolve against the program's real scopes, except
//!     for variables the target scope already holds, which are declared after the insertion
//!     point and stay invisible.

pub mod error;
pub mod expressions;
pub mod statements;

pub use error::ParseError;

use crate::veil::ast::{Chunk, Range, ScopeId, ScopeKind, ScopeTree, Stmt, VarId};
use crate::veil::dialect::Dialect;
use crate::veil::error::Error;
use crate::veil::lexing::tokenize;
use crate::veil::token::{SpannedToken, Token};

/// Nesting limit for blocks and subexpressions, the same bound Lua 5.1 compiles with
/// (`LUAI_MAXCCALLS`).
pub const MAX_SYNTAX_LEVELS: usize = 200;

/// Per-function parser state.
struct FunctionState {
    is_vararg: bool,
    loop_depth: usize,
}

pub struct Parser<'t> {
    tokens: &'t [SpannedToken],
    pos: usize,
    eof: SpannedToken,
    dialect: Dialect,
    scopes: ScopeTree,
    scope: ScopeId,
    functions: Vec<FunctionState>,
    hidden: Option<(ScopeId, usize)>,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [SpannedToken], dialect: Dialect, scopes: ScopeTree) -> Self {
        let end = tokens.last().map(|t| t.range.clone()).unwrap_or_default();
        let scope = scopes.global();
        Self {
            tokens,
            pos: 0,
            eof: SpannedToken::new(Token::Eof, end),
            dialect,
            scopes,
            scope,
            functions: Vec::new(),
            hidden: None,
            depth: 0,
        }
    }

    // ---- Token helpers ----

    fn current(&self) -> &SpannedToken {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.token)
            .unwrap_or(&self.eof.token)
    }

    fn current_range(&self) -> Range {
        self.current().range.clone()
    }

    /// Range of the last consumed token.
    fn previous_range(&self) -> Range {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.range.clone(),
            None => self.current_range(),
        }
    }

    /// Range from `start` up to the last consumed token.
    fn span_from(&self, start: &Range) -> Range {
        start.to(&self.previous_range())
    }

    fn advance(&mut self) -> SpannedToken {
        let token = self.current().clone();
        if self.pos < self.tokens.len() && token.token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == expected
    }

    fn test_next(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Range, ParseError> {
        if self.check(expected) {
            Ok(self.advance().range)
        } else {
            Err(self.expected(&[expected.to_string()]))
        }
    }

    /// `expect` for the closing token of a construct opened at `opener`.
    fn expect_match(
        &mut self,
        expected: &Token,
        what: &Token,
        opener: &Range,
    ) -> Result<Range, ParseError> {
        if self.check(expected) {
            return Ok(self.advance().range);
        }
        let mut error = self.expected(&[expected.to_string()]);
        if opener.start.line != self.current_range().start.line {
            error.message = format!(
                "{} (to close {} at line {})",
                error.message, what, opener.start.line
            );
        }
        Err(error)
    }

    fn expect_name(&mut self) -> Result<(String, Range), ParseError> {
        match self.peek().clone() {
            Token::Name(name) if !self.dialect.is_keyword(&name) => {
                let range = self.advance().range;
                Ok((name, range))
            }
            _ => Err(self.expected(&["<name>".to_string()])),
        }
    }

    // ---- Errors ----

    fn error(&self, message: impl Into<String>) -> ParseError {
        let current = self.current();
        ParseError {
            position: current.range.start,
            offset: current.range.span.start,
            expected: Vec::new(),
            found: current.token.to_string(),
            message: message.into(),
        }
    }

    fn error_at(&self, range: &Range, message: impl Into<String>) -> ParseError {
        ParseError {
            position: range.start,
            offset: range.span.start,
            expected: Vec::new(),
            found: self.current().token.to_string(),
            message: message.into(),
        }
    }

    fn expected(&self, expected: &[String]) -> ParseError {
        let found = self.current().token.to_string();
        let mut error = self.error(format!("{} expected near {}", expected.join(" or "), found));
        error.expected = expected.to_vec();
        error
    }

    // ---- Scope helpers ----

    fn function(&self) -> &FunctionState {
        // The parser always runs inside at least one function (the chunk itself).
        &self.functions[self.functions.len() - 1]
    }

    fn function_mut(&mut self) -> &mut FunctionState {
        let last = self.functions.len() - 1;
        &mut self.functions[last]
    }

    /// Resolve `name` from the current scope and record the reference.
    fn reference_name(&mut self, name: &str, location: Range) -> VarId {
        let id = match self
            .scopes
            .resolve_with_cutoff(self.scope, name, self.hidden)
        {
            Some(id) => id,
            None => self.scopes.global_variable(name),
        };
        self.scopes.reference(id, self.scope, location);
        id
    }

    /// Run `f` with `scope` as the current scope.
    fn within<T>(
        &mut self,
        scope: ScopeId,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = saved;
        result
    }

    /// Run `f` one syntax level deeper, failing past [`MAX_SYNTAX_LEVELS`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_SYNTAX_LEVELS {
            return Err(self.error("chunk has too many syntax levels"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn new_scope(&mut self, kind: ScopeKind) -> ScopeId {
        self.scopes.add_scope(self.scope, kind)
    }
}

/// Parse a token stream (as produced by [`tokenize`]) into a chunk.
pub fn parse(tokens: &[SpannedToken], dialect: Dialect) -> Result<Chunk, ParseError> {
    let mut parser = Parser::new(tokens, dialect, ScopeTree::new());
    let global = parser.scopes.global();
    let top = parser.new_scope(ScopeKind::Function);

    parser.functions.push(FunctionState {
        is_vararg: true,
        loop_depth: 0,
    });
    let body = parser.block_in(top)?;
    parser.expect(&Token::Eof)?;
    parser.close_function(&body)?;

    Ok(Chunk {
        body,
        scopes: parser.scopes,
        global_scope: global,
    })
}

/// Tokenize and parse `source`.
pub fn parse_source(source: &str, dialect: Dialect) -> Result<Chunk, Error> {
    let tokens = tokenize(source, dialect)?;
    Ok(parse(&tokens, dialect)?)
}

/// Statements parsed by [`parse_snippet`] and the variables they declared in the target scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub statements: Vec<Stmt>,
    pub declared: Vec<VarId>,
}

impl Snippet {
    /// The snippet variable originally called `name`.
    pub fn variable(&self, scopes: &ScopeTree, name: &str) -> Option<VarId> {
        self.declared
            .iter()
            .rev()
            .find(|id| scopes.variable(**id).declared_name == name)
            .copied()
    }
}

/// Parse `source` as statements living in `parent`, a scope of `scopes`.
pub fn parse_snippet(
    source: &str,
    dialect: Dialect,
    scopes: &mut ScopeTree,
    parent: ScopeId,
) -> Result<Snippet, Error> {
    let tokens = tokenize(source, dialect)?;
    let existing = scopes.scope(parent).variables.len();

    let mut parser = Parser::new(&tokens, dialect, std::mem::take(scopes));
    parser.hidden = Some((parent, existing));
    parser.functions.push(FunctionState {
        is_vararg: false,
        loop_depth: 0,
    });
    let result = parser
        .block_in(parent)
        .and_then(|block| {
            parser.expect(&Token::Eof)?;
            parser.close_function(&block)?;
            Ok(block)
        });
    *scopes = parser.scopes;

    let block = result?;
    Ok(Snippet {
        statements: block.statements,
        declared: scopes.scope(parent).variables[existing..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::veil::ast::{ExprKind, ScopeKind, StmtKind, VariableKind};

    fn parse_ok(source: &str, dialect: Dialect) -> Chunk {
        parse_source(source, dialect).unwrap()
    }

    fn parse_err(source: &str, dialect: Dialect) -> ParseError {
        let tokens = tokenize(source, dialect).unwrap();
        parse(&tokens, dialect).unwrap_err()
    }

    #[test]
    fn test_deep_nesting_is_a_parse_error() {
        let parens = format!("return {}1{}", "(".repeat(300), ")".repeat(300));
        let err = parse_err(&parens, Dialect::Lua51);
        assert_eq!(err.message, "chunk has too many syntax levels");

        let blocks = format!("{}{}", "if x then ".repeat(300), "end ".repeat(300));
        let err = parse_err(&blocks, Dialect::LuaU);
        assert_eq!(err.message, "chunk has too many syntax levels");

        let chain = vec!["a"; 400].join(" .. ");
        assert!(parse_source(&format!("return {}", chain), Dialect::Lua51).is_err());
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let parens = format!("return {}1{}", "(".repeat(100), ")".repeat(100));
        parse_ok(&parens, Dialect::Lua51);
        let blocks = format!("{}{}", "do ".repeat(100), "end ".repeat(100));
        parse_ok(&blocks, Dialect::Lua51);
    }

    #[test]
    fn test_top_level_scope_shape() {
        let chunk = parse_ok("local x = 1", Dialect::Lua51);
        let top = chunk.scopes.scope(chunk.body.scope);
        assert_eq!(top.kind, ScopeKind::Function);
        assert_eq!(top.parent, Some(chunk.global_scope));
        assert_eq!(chunk.global_scope, chunk.scopes.global());
    }

    #[test]
    fn test_local_initializer_sees_outer_binding() {
        let chunk = parse_ok("local x = 1\nlocal x = x", Dialect::Lua51);
        let StmtKind::Local { variables: first, .. } = &chunk.body.statements[0].kind else {
            panic!("expected local");
        };
        let StmtKind::Local { values, .. } = &chunk.body.statements[1].kind else {
            panic!("expected local");
        };
        assert_eq!(values[0].kind, ExprKind::Variable(first[0]));
    }

    #[test]
    fn test_unresolved_names_are_globals() {
        let chunk = parse_ok("print(x)", Dialect::Lua51);
        let globals: Vec<_> = chunk
            .scopes
            .variables()
            .iter()
            .filter(|v| v.kind() == VariableKind::Global)
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(globals, vec!["print", "x"]);
    }

    #[test]
    fn test_upvalue_detection() {
        let chunk = parse_ok("local n = 0\nlocal function inc() n = n + 1 end", Dialect::Lua51);
        let n = chunk.scopes.resolve(chunk.body.scope, "n").unwrap();
        assert_eq!(chunk.scopes.variable(n).kind(), VariableKind::Upvalue);
        assert_eq!(chunk.scopes.variable(n).references.len(), 3);
    }

    #[test]
    fn test_continue_depends_on_dialect() {
        let source = "for i = 1, 3 do if i == 2 then continue end print(i) end";
        assert!(parse_source(source, Dialect::LuaU).is_ok());
        let err = parse_err(source, Dialect::Lua51);
        assert!(err.message.contains("continue"), "{}", err.message);
    }

    #[test]
    fn test_break_outside_loop() {
        let err = parse_err("break", Dialect::Lua51);
        assert!(err.message.contains("outside a loop"));
        assert!(parse_source("while true do break end", Dialect::Lua51).is_ok());
        assert!(parse_err("while true do local f = function() break end end", Dialect::Lua51)
            .message
            .contains("outside a loop"));
    }

    #[test]
    fn test_compound_assignment_dialect() {
        assert!(parse_source("local a = 1 a += 2", Dialect::LuaU).is_ok());
        assert!(parse_err("local a = 1 a += 2", Dialect::Lua51)
            .message
            .contains("compound assignment"));
    }

    #[test]
    fn test_goto_resolves_forward_label() {
        let chunk = parse_ok(
            "for i = 1, 3 do\n  if i == 2 then goto skip end\n  print(i)\n  ::skip::\nend",
            Dialect::Lua51,
        );
        assert!(crate::veil::ast::check_integrity(&chunk).is_ok());
        assert!(parse_err("goto nowhere", Dialect::Lua51)
            .message
            .contains("no visible label"));
        assert!(parse_source("::a:: goto a", Dialect::LuaU).is_err());
    }

    #[test]
    fn test_goto_statement_follows_the_dialect() {
        let chunk = parse_ok("goto done ::done::", Dialect::Lua51);
        assert!(matches!(chunk.body.statements[0].kind, StmtKind::Goto { label: Some(_), .. }));
        assert!(parse_err("::done::", Dialect::LuaU)
            .message
            .contains("labels are not supported"));
        // Without a goto dialect `goto done` is two names, not a statement.
        assert!(parse_source("goto done", Dialect::LuaU).is_err());
        assert!(parse_source("local goto = print goto(1)", Dialect::Lua51).is_ok());
    }

    #[test]
    fn test_goto_is_a_name_elsewhere() {
        assert!(parse_source("local goto = 1 print(goto)", Dialect::Lua51).is_ok());
        assert!(parse_source("local goto = 1 print(goto)", Dialect::LuaU).is_ok());
    }

    #[test]
    fn test_vararg_outside_vararg_function() {
        assert!(parse_source("print(...)", Dialect::Lua51).is_ok());
        assert!(parse_err("local f = function() return ... end", Dialect::Lua51)
            .message
            .contains("'...'"));
    }

    #[test]
    fn test_error_reports_expected_and_found() {
        let err = parse_err("if x then\n  y()\n", Dialect::Lua51);
        assert_eq!(err.expected, vec!["'end'".to_string()]);
        assert_eq!(err.found, "<eof>");
        assert_eq!(err.position.line, 3);
    }

    #[test]
    fn test_return_must_be_last() {
        assert!(parse_source("return 1; ", Dialect::Lua51).is_ok());
        assert!(parse_source("do return end print(1)", Dialect::Lua51).is_ok());
        assert!(parse_source("return 1 print(2)", Dialect::Lua51).is_err());
    }

    #[test]
    fn test_snippet_declares_into_parent_and_skips_existing() {
        let mut chunk = parse_ok("local string = {}", Dialect::Lua51);
        let top = chunk.body.scope;
        let snippet = parse_snippet(
            "local sub = string.sub",
            Dialect::Lua51,
            &mut chunk.scopes,
            top,
        )
        .unwrap();

        let sub = snippet.variable(&chunk.scopes, "sub").unwrap();
        assert_eq!(chunk.scopes.variable(sub).scope, top);
        let StmtKind::Local { values, .. } = &snippet.statements[0].kind else {
            panic!("expected local");
        };
        let ExprKind::Member { object, .. } = &values[0].kind else {
            panic!("expected member access");
        };
        let ExprKind::Variable(string) = object.kind else {
            panic!("expected variable");
        };
        assert!(chunk.scopes.variable(string).is_global());
    }
}
