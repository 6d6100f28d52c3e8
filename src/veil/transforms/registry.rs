//! Step registry
//!
//! Maps configuration names to step constructors. Each constructor validates its settings and
//! fails with a `ConfigError` before any source is processed.

use super::settings::StepSettings;
use super::stages::{
    ConstantArray, EncryptStrings, NumbersToExpressions, SplitStrings, Watermark, WrapInFunction,
};
use super::Step;
use crate::veil::pipeline::ConfigError;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

pub type StepConstructor = fn(&StepSettings) -> Result<Box<dyn Step>, ConfigError>;

/// Registry of step constructors
#[derive(Clone, Default)]
pub struct StepRegistry {
    constructors: BTreeMap<String, StepConstructor>,
}

impl StepRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor, replacing any previous one of the same name
    pub fn register(&mut self, name: impl Into<String>, constructor: StepConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build the step called `name`.
    pub fn build(&self, name: &str, settings: &StepSettings) -> Result<Box<dyn Step>, ConfigError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| ConfigError::UnknownStep(name.to_string()))?;
        constructor(settings)
    }

    /// Create registry with the canonical steps
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("WrapInFunction", |s| Ok(Box::new(WrapInFunction::from_settings(s)?)));
        registry.register("SplitStrings", |s| Ok(Box::new(SplitStrings::from_settings(s)?)));
        registry.register("NumbersToExpressions", |s| {
            Ok(Box::new(NumbersToExpressions::from_settings(s)?))
        });
        registry.register("ConstantArray", |s| Ok(Box::new(ConstantArray::from_settings(s)?)));
        registry.register("EncryptStrings", |s| Ok(Box::new(EncryptStrings::from_settings(s)?)));
        registry.register("Watermark", |s| Ok(Box::new(Watermark::from_settings(s)?)));
        registry
    }
}

pub static STEPS: Lazy<StepRegistry> = Lazy::new(StepRegistry::with_defaults);

/// Names of the built-in steps, sorted
pub fn step_names() -> Vec<&'static str> {
    STEPS.names()
}
