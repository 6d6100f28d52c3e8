//! Split string literals into concatenations
//!
//! A literal longer than `MinLength` becomes `"ab" .. ("cde" .. "f")`, the pieces being
//! between `MinLength` and `MaxLength` bytes (the last one may be shorter).
//!
//! The concatenation is a balanced tree, so nesting grows with the logarithm of the piece
//! count and long literals stay under Lua's limit of 200 syntax levels.

use crate::veil::ast::{for_each_expr_mut, BinaryOp, Chunk, Expr, ExprKind};
use crate::veil::pipeline::{ConfigError, PipelineContext};
use crate::veil::transforms::{Step, StepSettings, TransformError};

#[derive(Debug, Clone, PartialEq)]
pub struct SplitStrings {
    pub min_length: usize,
    pub max_length: usize,
    pub threshold: f64,
}

impl Default for SplitStrings {
    fn default() -> Self {
        Self {
            min_length: 5,
            max_length: 10,
            threshold: 1.0,
        }
    }
}

impl SplitStrings {
    pub fn from_settings(settings: &StepSettings) -> Result<Self, ConfigError> {
        settings.allow_only(&["MinLength", "MaxLength", "Threshold"])?;
        let min_length = settings.usize("MinLength", 5)?;
        let max_length = settings.usize("MaxLength", 10)?;
        if min_length == 0 {
            return Err(settings.invalid("MinLength", "must be at least 1"));
        }
        if max_length < min_length {
            return Err(settings.invalid("MaxLength", "must not be less than MinLength"));
        }
        Ok(Self {
            min_length,
            max_length,
            threshold: settings.threshold("Threshold", 1.0)?,
        })
    }

    fn pieces<'b>(&self, bytes: &'b [u8], rng: &mut fastrand::Rng) -> Vec<&'b [u8]> {
        let mut pieces = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let len = rng.usize(self.min_length..=self.max_length).min(rest.len());
            let (piece, tail) = rest.split_at(len);
            pieces.push(piece);
            rest = tail;
        }
        pieces
    }
}

/// Balanced concatenation of `pieces`; the left half is never the larger one.
fn concat_tree(pieces: &[&[u8]]) -> Expr {
    match pieces {
        [] => Expr::string(Vec::new()),
        [only] => Expr::string(only.to_vec()),
        _ => {
            let (left, right) = pieces.split_at(pieces.len() / 2);
            Expr::binary(BinaryOp::Concat, concat_tree(left), concat_tree(right))
        }
    }
}

impl Step for SplitStrings {
    fn name(&self) -> &str {
        "SplitStrings"
    }

    fn apply(&self, mut chunk: Chunk, context: &mut PipelineContext) -> Result<Chunk, TransformError> {
        let rng = context.rng();
        for_each_expr_mut(&mut chunk.body, &mut |expr: &mut Expr, _| {
            let ExprKind::String(bytes) = &expr.kind else {
                return;
            };
            if bytes.len() <= self.min_length || rng.f64() >= self.threshold {
                return;
            }
            let pieces = self.pieces(bytes, rng);
            if pieces.len() > 1 {
                let tree = concat_tree(&pieces);
                *expr = tree;
            }
        });
        Ok(chunk)
    }
}
