//! Wrap the program in an immediately called vararg function
//!
//! `<body>` becomes `return (function(...) <body> end)(...)`. The old top-level scope turns into
//! the function's scope and a fresh top-level scope takes its place under the global scope.

use crate::veil::ast::{Block, Chunk, Expr, ExprKind, FunctionBody, ScopeKind, Stmt, StmtKind};
use crate::veil::pipeline::{ConfigError, PipelineContext};
use crate::veil::transforms::{Step, StepSettings, TransformError};

#[derive(Debug, Clone, PartialEq)]
pub struct WrapInFunction {
    pub iterations: usize,
}

impl Default for WrapInFunction {
    fn default() -> Self {
        Self { iterations: 1 }
    }
}

impl WrapInFunction {
    pub fn from_settings(settings: &StepSettings) -> Result<Self, ConfigError> {
        settings.allow_only(&["Iterations"])?;
        Ok(Self {
            iterations: settings.usize("Iterations", 1)?,
        })
    }
}

fn wrap(mut chunk: Chunk) -> Chunk {
    let old = chunk.body;
    let top = chunk.scopes.add_scope(chunk.global_scope, ScopeKind::Function);
    chunk.scopes.reparent(old.scope, top);

    let function = Expr::new(ExprKind::Function(Box::new(FunctionBody {
        parameters: Vec::new(),
        is_vararg: true,
        body: old,
    })));
    let call = Expr::call(Expr::paren(function), vec![Expr::new(ExprKind::Vararg)]);
    chunk.body = Block::new(top, vec![Stmt::new(StmtKind::Return(vec![call]))]);
    chunk
}

impl Step for WrapInFunction {
    fn name(&self) -> &str {
        "WrapInFunction"
    }

    fn apply(&self, chunk: Chunk, context: &mut PipelineContext) -> Result<Chunk, TransformError> {
        let iterations = context.iterations(self.iterations, self.name());
        Ok((0..iterations).fold(chunk, |chunk, _| wrap(chunk)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::veil::ast::check_integrity;
    use crate::veil::dialect::Dialect;
    use crate::veil::formats::{unparse, Mode};
    use crate::veil::parsing::parse_source;

    fn run(source: &str, iterations: usize, max: Option<usize>) -> String {
        let chunk = parse_source(source, Dialect::Lua51).unwrap();
        let mut context = PipelineContext::new(Dialect::Lua51, 1, max, "test");
        let chunk = WrapInFunction { iterations }
            .apply(chunk, &mut context)
            .unwrap();
        check_integrity(&chunk).unwrap();
        unparse(&chunk, Dialect::Lua51, Mode::Compact).unwrap()
    }

    #[test]
    fn test_wraps_once() {
        assert_eq!(
            run("print(...)", 1, None),
            "return(function(...)print(...)end)(...)"
        );
    }

    #[test]
    fn test_iterations_nest() {
        assert_eq!(
            run("x()", 2, None),
            "return(function(...)return(function(...)x()end)(...)end)(...)"
        );
    }

    #[test]
    fn test_iterations_are_clamped() {
        assert_eq!(run("x()", 5, Some(1)), "return(function(...)x()end)(...)");
    }

    #[test]
    fn test_old_top_scope_becomes_nested() {
        let chunk = parse_source("local a = 1", Dialect::Lua51).unwrap();
        let old = chunk.body.scope;
        let mut context = PipelineContext::new(Dialect::Lua51, 1, None, "test");
        let chunk = WrapInFunction::default().apply(chunk, &mut context).unwrap();
        assert_eq!(chunk.scopes.scope(old).parent, Some(chunk.body.scope));
        assert_eq!(chunk.scopes.scope(chunk.body.scope).parent, Some(chunk.global_scope));
    }

    #[test]
    fn test_rejects_unknown_setting() {
        let map = serde_json::json!({"Iteration": 2});
        let settings = StepSettings::new("WrapInFunction", map.as_object().unwrap().clone());
        assert!(WrapInFunction::from_settings(&settings).is_err());
    }
}
