//! Pool string literals into one table
//!
//! Distinct string literals are collected into `local CONSTANTS = {"a", "b", ...}` placed at
//! the top of the program, and every pooled occurrence becomes `CONSTANTS[i]`.

use crate::veil::ast::{
    for_each_expr_mut, Chunk, Expr, ExprKind, Range, Stmt, StmtKind, TableField, VariableKind,
};
use crate::veil::pipeline::{ConfigError, PipelineContext};
use crate::veil::transforms::{Step, StepSettings, TransformError};
use std::collections::HashMap;

/// Declared name of the pool before renaming
const POOL_NAME: &str = "CONSTANTS";

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantArray {
    pub threshold: f64,
    pub shuffle: bool,
    pub min_length: usize,
}

impl Default for ConstantArray {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            shuffle: true,
            min_length: 1,
        }
    }
}

impl ConstantArray {
    pub fn from_settings(settings: &StepSettings) -> Result<Self, ConfigError> {
        settings.allow_only(&["Threshold", "Shuffle", "MinLength"])?;
        Ok(Self {
            threshold: settings.threshold("Threshold", 1.0)?,
            shuffle: settings.bool("Shuffle", true)?,
            min_length: settings.usize("MinLength", 1)?,
        })
    }

    /// Distinct pooled strings in first-occurrence order.
    fn collect(&self, chunk: &mut Chunk, rng: &mut fastrand::Rng) -> Vec<Vec<u8>> {
        let mut seen: HashMap<Vec<u8>, bool> = HashMap::new();
        let mut pooled = Vec::new();
        for_each_expr_mut(&mut chunk.body, &mut |expr: &mut Expr, _| {
            let ExprKind::String(bytes) = &expr.kind else {
                return;
            };
            if bytes.len() < self.min_length || seen.contains_key(bytes) {
                return;
            }
            let keep = rng.f64() < self.threshold;
            seen.insert(bytes.clone(), keep);
            if keep {
                pooled.push(bytes.clone());
            }
        });
        pooled
    }
}

impl Step for ConstantArray {
    fn name(&self) -> &str {
        "ConstantArray"
    }

    fn apply(&self, mut chunk: Chunk, context: &mut PipelineContext) -> Result<Chunk, TransformError> {
        let rng = context.rng();
        let mut pooled = self.collect(&mut chunk, rng);
        if pooled.is_empty() {
            return Ok(chunk);
        }
        if self.shuffle {
            rng.shuffle(&mut pooled);
        }
        let slots: HashMap<Vec<u8>, usize> = pooled
            .iter()
            .enumerate()
            .map(|(i, bytes)| (bytes.clone(), i + 1))
            .collect();

        let top = chunk.body.scope;
        let pool =
            chunk
                .scopes
                .declare(top, POOL_NAME, VariableKind::Local, Range::default());
        let mut uses = Vec::new();
        for_each_expr_mut(&mut chunk.body, &mut |expr: &mut Expr, scope| {
            let ExprKind::String(bytes) = &expr.kind else {
                return;
            };
            if let Some(slot) = slots.get(bytes) {
                *expr = Expr::index(Expr::variable(pool), Expr::number(*slot as f64));
                uses.push(scope);
            }
        });
        for scope in uses {
            chunk.scopes.reference(pool, scope, Range::default());
        }

        let table = Expr::new(ExprKind::Table(
            pooled
                .into_iter()
                .map(|bytes| TableField::Positional(Expr::string(bytes)))
                .collect(),
        ));
        chunk.body.statements.insert(
            0,
            Stmt::new(StmtKind::Local {
                variables: vec![pool],
                values: vec![table],
            }),
        );
        Ok(chunk)
    }
}
