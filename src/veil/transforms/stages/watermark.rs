//! Assign a watermark string to a global at program start

use crate::veil::ast::{Chunk, Expr, Range, Stmt, StmtKind};
use crate::veil::dialect::Dialect;
use crate::veil::pipeline::{ConfigError, PipelineContext};
use crate::veil::transforms::{Step, StepSettings, TransformError};

pub const DEFAULT_CONTENT: &str = "This script is protected by veil";
pub const DEFAULT_VARIABLE: &str = "_WATERMARK";

#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub content: String,
    pub custom_variable: String,
}

impl Default for Watermark {
    fn default() -> Self {
        Self {
            content: DEFAULT_CONTENT.to_string(),
            custom_variable: DEFAULT_VARIABLE.to_string(),
        }
    }
}

impl Watermark {
    pub fn from_settings(settings: &StepSettings) -> Result<Self, ConfigError> {
        settings.allow_only(&["Content", "CustomVariable"])?;
        let custom_variable = settings.string("CustomVariable", DEFAULT_VARIABLE)?;
        if Dialect::ALL
            .iter()
            .any(|dialect| !dialect.is_valid_identifier(&custom_variable))
        {
            return Err(settings.invalid("CustomVariable", "must be a valid identifier"));
        }
        Ok(Self {
            content: settings.string("Content", DEFAULT_CONTENT)?,
            custom_variable,
        })
    }
}

impl Step for Watermark {
    fn name(&self) -> &str {
        "Watermark"
    }

    fn apply(&self, mut chunk: Chunk, _context: &mut PipelineContext) -> Result<Chunk, TransformError> {
        let variable = chunk.scopes.global_variable(&self.custom_variable);
        chunk
            .scopes
            .reference(variable, chunk.body.scope, Range::default());
        let assignment = Stmt::new(StmtKind::Assignment {
            targets: vec![Expr::variable(variable)],
            values: vec![Expr::string(self.content.as_bytes())],
        });
        chunk.body.statements.insert(0, assignment);
        Ok(chunk)
    }
}
