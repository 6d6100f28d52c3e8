//! Pipeline orchestration
//!
//!     One `apply()` runs the whole chain for a single source text:
//!
//!         tokenize -> parse -> step 1 .. step n -> rename -> unparse
//!
//!     Each arrow can fail, and the first failure ends the run with one [`Error`]. Nothing is
//!     returned on failure, so callers never see partially transformed output.
//!
//!     Before every step the memory gauge is sampled against `MemoryLimitBytes`. Errors a step
//!     returns and panics it raises are both reported as [`StepError`] carrying the step name.
//!     The tree a step hands back must pass `check_integrity` before the next step sees it.

pub mod config;
pub mod context;
pub mod memory;
pub mod stats;

pub use config::{preset, ConfigError, PipelineConfig, StepConfig, PRESET_NAMES};
pub use context::PipelineContext;
pub use memory::{AstFootprint, MemoryGauge, ProcessMemory};
pub use stats::PipelineStats;

use crate::veil::ast::{check_integrity, Chunk};
use crate::veil::error::Error;
use crate::veil::formats::{unparse, Mode};
use crate::veil::lexing::tokenize;
use crate::veil::naming::{generator_by_name, rename, NameGenerator, DEFAULT_MAX_ATTEMPTS};
use crate::veil::parsing::parse;
use crate::veil::transforms::{Step, StepRegistry, StepSettings, STEPS};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step '{step}' failed: {message}")]
pub struct StepError {
    pub step: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("memory footprint of {used} bytes exceeds the limit of {limit} bytes before step '{step}'")]
pub struct ResourceError {
    pub step: String,
    pub used: u64,
    pub limit: u64,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => format!("panicked: {}", message),
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => format!("panicked: {}", message),
            Err(_) => "panicked".to_string(),
        },
    }
}

thread_local! {
    static IN_STEP: Cell<bool> = const { Cell::new(false) };
}

static STEP_HOOK: Once = Once::new();

/// Chains a panic hook that logs panics raised inside a step through `tracing` instead of
/// printing them. Panics anywhere else still reach the previous hook.
fn install_step_hook() {
    STEP_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if IN_STEP.with(Cell::get) {
                error!(location = ?info.location(), "step panicked");
            } else {
                previous(info);
            }
        }));
    });
}

/// Runs `f` with step panics routed to the logging hook on this thread.
fn isolated<T>(f: impl FnOnce() -> T) -> std::thread::Result<T> {
    install_step_hook();
    let outer = IN_STEP.with(|flag| flag.replace(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    IN_STEP.with(|flag| flag.set(outer));
    outcome
}

pub struct Pipeline {
    config: PipelineConfig,
    steps: Vec<Box<dyn Step>>,
    generator: Box<dyn NameGenerator>,
    gauge: Box<dyn MemoryGauge>,
    stats: PipelineStats,
}

impl Pipeline {
    /// Build every configured step from the built-in registry.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ConfigError> {
        Self::from_config_in(config, &STEPS)
    }

    pub fn from_config_in(
        config: PipelineConfig,
        registry: &StepRegistry,
    ) -> Result<Self, ConfigError> {
        let generator = generator_by_name(&config.name_generator)
            .ok_or_else(|| ConfigError::UnknownGenerator(config.name_generator.clone()))?;
        let steps = config
            .steps
            .iter()
            .map(|step| {
                let settings = StepSettings::new(step.name.clone(), step.settings.clone());
                registry.build(&step.name, &settings)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(steps = steps.len(), generator = %config.name_generator, "pipeline built");

        Ok(Self {
            config,
            steps,
            generator,
            gauge: Box::new(ProcessMemory),
            stats: PipelineStats::default(),
        })
    }

    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        Self::from_config(preset(name)?)
    }

    /// Replace the configured name generator.
    pub fn with_name_generator(mut self, generator: Box<dyn NameGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_memory_gauge(mut self, gauge: Box<dyn MemoryGauge>) -> Self {
        self.gauge = gauge;
        self
    }

    /// Append a step after the configured ones.
    pub fn with_step(mut self, step: Box<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = PipelineStats::default();
    }

    /// Obfuscate `source`. `label` names the input in diagnostics.
    pub fn apply(&mut self, source: &str, label: &str) -> Result<String, Error> {
        let started = Instant::now();
        let result = self.run(source, label);
        let output_bytes = result.as_ref().ok().map(String::len);
        self.stats
            .record_run(source.len(), output_bytes, started.elapsed());

        match &result {
            Ok(output) => info!(
                label,
                input_bytes = source.len(),
                output_bytes = output.len(),
                "obfuscation finished"
            ),
            Err(err) => debug!(label, kind = err.kind(), "obfuscation failed"),
        }
        result
    }

    fn run(&mut self, source: &str, label: &str) -> Result<String, Error> {
        let dialect = self.config.lua_version;
        info!(label, dialect = %dialect, steps = self.steps.len(), "starting pipeline");

        let tokens = tokenize(source, dialect)?;
        debug!(label, tokens = tokens.len(), "tokenized");
        let mut chunk = parse(&tokens, dialect)?;
        debug!(label, variables = chunk.scopes.variables().len(), "parsed");

        let mut context =
            PipelineContext::new(dialect, self.config.seed, self.config.max_iterations, label);
        for index in 0..self.steps.len() {
            let started = Instant::now();
            chunk = self.run_step(self.steps[index].as_ref(), chunk, &mut context)?;
            let elapsed = started.elapsed();
            let name = self.steps[index].name().to_string();
            self.stats.record_step(&name, elapsed);
        }

        rename(
            &mut chunk,
            self.generator.as_mut(),
            &self.config.var_name_prefix,
            dialect,
            context.rng(),
            DEFAULT_MAX_ATTEMPTS,
        )?;

        let mode = if self.config.pretty_print {
            Mode::Pretty
        } else {
            Mode::Compact
        };
        Ok(unparse(&chunk, dialect, mode)?)
    }

    fn run_step(
        &self,
        step: &dyn Step,
        chunk: Chunk,
        context: &mut PipelineContext,
    ) -> Result<Chunk, Error> {
        let name = step.name().to_string();
        if let Some(limit) = self.config.memory_limit_bytes {
            let used = self.gauge.sample(&chunk);
            if used > limit {
                return Err(ResourceError {
                    step: name,
                    used,
                    limit,
                }
                .into());
            }
        }

        debug!(label = context.label(), step = %name, "applying step");
        let outcome = isolated(|| step.apply(chunk, context));
        let chunk = match outcome {
            Ok(Ok(chunk)) => chunk,
            Ok(Err(err)) => {
                return Err(StepError {
                    step: name,
                    message: err.to_string(),
                }
                .into())
            }
            Err(payload) => {
                return Err(StepError {
                    step: name,
                    message: panic_message(payload),
                }
                .into())
            }
        };
        check_integrity(&chunk).map_err(|problem| StepError {
            step: name.clone(),
            message: format!("produced an invalid tree: {}", problem),
        })?;
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_catches_and_clears_the_step_flag() {
        let outcome = isolated(|| -> u32 { panic!("inside") });
        assert_eq!(panic_message(outcome.unwrap_err()), "panicked: inside");
        assert!(!IN_STEP.with(Cell::get));
    }

    #[test]
    fn test_nested_isolation_restores_the_outer_flag() {
        let outer = isolated(|| {
            let inner = isolated(|| -> u32 { panic!("nested") });
            assert!(inner.is_err());
            IN_STEP.with(Cell::get)
        });
        assert_eq!(outer.ok(), Some(true));
        assert!(!IN_STEP.with(Cell::get));
    }

    #[test]
    fn test_panics_outside_steps_still_unwind() {
        install_step_hook();
        let outcome = std::panic::catch_unwind(|| -> u32 { panic!("plain") });
        assert!(outcome.is_err());
        assert!(!IN_STEP.with(Cell::get));
    }
}
