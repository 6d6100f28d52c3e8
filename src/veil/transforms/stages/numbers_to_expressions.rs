//! Rewrite integer literals as arithmetic
//!
//! An integer `n` becomes `(n - r) + r` or `(n + r) - r` for a random offset `r`. Each operand
//! is rewritten again with probability `InternalThreshold`, up to a fixed depth. Only integers
//! within 2^31 are touched so every intermediate value stays exact.

use crate::veil::ast::{for_each_expr_mut, BinaryOp, Chunk, Expr, ExprKind};
use crate::veil::pipeline::{ConfigError, PipelineContext};
use crate::veil::transforms::{Step, StepSettings, TransformError};

const SAFE_LIMIT: f64 = 2_147_483_648.0;
const OFFSET_RANGE: i64 = 1 << 20;
const MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct NumbersToExpressions {
    pub threshold: f64,
    pub internal_threshold: f64,
}

impl Default for NumbersToExpressions {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            internal_threshold: 0.2,
        }
    }
}

fn is_candidate(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() <= SAFE_LIMIT
}

impl NumbersToExpressions {
    pub fn from_settings(settings: &StepSettings) -> Result<Self, ConfigError> {
        settings.allow_only(&["Threshold", "InternalThreshold"])?;
        Ok(Self {
            threshold: settings.threshold("Threshold", 1.0)?,
            internal_threshold: settings.threshold("InternalThreshold", 0.2)?,
        })
    }

    fn operand(&self, value: f64, depth: usize, rng: &mut fastrand::Rng) -> Expr {
        if depth < MAX_DEPTH && is_candidate(value) && rng.f64() < self.internal_threshold {
            self.expression(value, depth + 1, rng)
        } else {
            Expr::number(value)
        }
    }

    fn expression(&self, value: f64, depth: usize, rng: &mut fastrand::Rng) -> Expr {
        let offset = rng.i64(-OFFSET_RANGE..=OFFSET_RANGE) as f64;
        if rng.bool() {
            let left = self.operand(value - offset, depth, rng);
            let right = self.operand(offset, depth, rng);
            Expr::binary(BinaryOp::Add, left, right)
        } else {
            let left = self.operand(value + offset, depth, rng);
            let right = self.operand(offset, depth, rng);
            Expr::binary(BinaryOp::Sub, left, right)
        }
    }
}

impl Step for NumbersToExpressions {
    fn name(&self) -> &str {
        "NumbersToExpressions"
    }

    fn apply(&self, mut chunk: Chunk, context: &mut PipelineContext) -> Result<Chunk, TransformError> {
        let rng = context.rng();
        for_each_expr_mut(&mut chunk.body, &mut |expr: &mut Expr, _| {
            if let ExprKind::Number(value) = expr.kind {
                if is_candidate(value) && rng.f64() < self.threshold {
                    *expr = self.expression(value, 0, rng);
                }
            }
        });
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::veil::dialect::Dialect;
    use crate::veil::parsing::parse_source;
    use proptest::prelude::*;

    fn evaluate(expr: &Expr) -> f64 {
        match &expr.kind {
            ExprKind::Number(value) => *value,
            ExprKind::Binary {
                op: BinaryOp::Add,
                left,
                right,
            } => evaluate(left) + evaluate(right),
            ExprKind::Binary {
                op: BinaryOp::Sub,
                left,
                right,
            } => evaluate(left) - evaluate(right),
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_fractions_are_left_alone() {
        let chunk = parse_source("return 0.5", Dialect::Lua51).unwrap();
        let mut context = PipelineContext::new(Dialect::Lua51, 3, None, "test");
        let chunk = NumbersToExpressions::default()
            .apply(chunk, &mut context)
            .unwrap();
        let crate::veil::ast::StmtKind::Return(values) = &chunk.body.statements[0].kind else {
            panic!("expected return");
        };
        assert_eq!(values[0].kind, ExprKind::Number(0.5));
    }

    proptest! {
        #[test]
        fn rewritten_integers_keep_their_value(n in -2_147_483_648i64..=2_147_483_648i64, seed in 1u64..1000) {
            let step = NumbersToExpressions { threshold: 1.0, internal_threshold: 0.7 };
            let mut rng = fastrand::Rng::with_seed(seed);
            let expr = step.expression(n as f64, 0, &mut rng);
            prop_assert_eq!(evaluate(&expr), n as f64);
        }
    }
}
