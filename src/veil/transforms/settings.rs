//! Typed access to a step's settings map

use crate::veil::pipeline::ConfigError;
use serde_json::{Map, Value};

/// The `Settings` object of one configured step.
///
/// Getters fall back to a default when the key is absent and fail with
/// [`ConfigError::InvalidSetting`] when it holds the wrong type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepSettings {
    step: String,
    values: Map<String, Value>,
}

impl StepSettings {
    pub fn new(step: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            step: step.into(),
            values,
        }
    }

    pub fn empty(step: impl Into<String>) -> Self {
        Self::new(step, Map::new())
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn invalid(&self, key: &str, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidSetting {
            step: self.step.clone(),
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Reject keys the step does not know about.
    pub fn allow_only(&self, keys: &[&str]) -> Result<(), ConfigError> {
        match self.values.keys().find(|key| !keys.contains(&key.as_str())) {
            Some(key) => Err(self.invalid(key, "unknown setting")),
            None => Ok(()),
        }
    }

    pub fn f64(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| self.invalid(key, format!("expected a number, got {}", value))),
        }
    }

    /// A probability in `[0, 1]`.
    pub fn threshold(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        let value = self.f64(key, default)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(self.invalid(key, format!("must be between 0 and 1, got {}", value)));
        }
        Ok(value)
    }

    pub fn usize(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| {
                    self.invalid(key, format!("expected a non-negative integer, got {}", value))
                }),
        }
    }

    pub fn bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| self.invalid(key, format!("expected a boolean, got {}", value))),
        }
    }

    pub fn string(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        match self.values.get(key) {
            None => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(value) => Err(self.invalid(key, format!("expected a string, got {}", value))),
        }
    }
}
