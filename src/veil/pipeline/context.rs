//! Per-run state handed to every step

use crate::veil::dialect::Dialect;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Created once per `apply()`. Holds the only random number generator of the run.
pub struct PipelineContext {
    dialect: Dialect,
    rng: fastrand::Rng,
    max_iterations: Option<usize>,
    label: String,
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

impl PipelineContext {
    /// `seed <= 0` seeds from the system clock.
    pub fn new(
        dialect: Dialect,
        seed: i64,
        max_iterations: Option<usize>,
        label: impl Into<String>,
    ) -> Self {
        let seed = if seed > 0 { seed as u64 } else { clock_seed() };
        Self {
            dialect,
            rng: fastrand::Rng::with_seed(seed),
            max_iterations,
            label: label.into(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn rng(&mut self) -> &mut fastrand::Rng {
        &mut self.rng
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }

    /// `requested` clamped to the configured maximum.
    pub fn iterations(&self, requested: usize, step: &str) -> usize {
        match self.max_iterations {
            Some(max) if requested > max => {
                warn!(
                    label = %self.label,
                    step,
                    requested,
                    max,
                    "iteration count clamped to MaxIterations"
                );
                max
            }
            _ => requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = PipelineContext::new(Dialect::Lua51, 42, None, "a");
        let mut b = PipelineContext::new(Dialect::Lua51, 42, None, "b");
        let xs: Vec<u64> = (0..4).map(|_| a.rng().u64(..)).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.rng().u64(..)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_iterations_clamp() {
        let context = PipelineContext::new(Dialect::Lua51, 1, Some(3), "x");
        assert_eq!(context.iterations(10, "Step"), 3);
        assert_eq!(context.iterations(2, "Step"), 2);
        let unbounded = PipelineContext::new(Dialect::Lua51, 1, None, "x");
        assert_eq!(unbounded.iterations(10, "Step"), 10);
    }
}
