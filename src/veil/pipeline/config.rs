//! Pipeline configuration
//!
//!     A [`PipelineConfig`] is plain data, read from JSON or YAML. Keys are PascalCase
//!     (`LuaVersion`, `PrettyPrint`, `Steps`, ...) and the camelCase spellings are accepted as
//!     aliases. Step settings stay an opaque map until the step's constructor validates them.
//!
//!     Built-in presets are named configurations in the same shape, see [`preset`].

use crate::veil::dialect::Dialect;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_NAME_GENERATOR: &str = "MangledShuffled";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown step '{0}'")]
    UnknownStep(String),
    #[error("invalid setting '{key}' for step '{step}': {message}")]
    InvalidSetting {
        step: String,
        key: String,
        message: String,
    },
    #[error("unknown name generator '{0}'")]
    UnknownGenerator(String),
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("malformed configuration: {0}")]
    Malformed(String),
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("unsupported configuration format '{0}' (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),
}

fn default_name_generator() -> String {
    DEFAULT_NAME_GENERATOR.to_string()
}

/// One entry of `Steps`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct StepConfig {
    #[serde(alias = "name")]
    pub name: String,
    #[serde(alias = "settings", default)]
    pub settings: Map<String, Value>,
}

impl StepConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: Map::new(),
        }
    }

    /// Build from a `json!` object literal. Anything but an object leaves the settings empty.
    pub fn with_settings(name: impl Into<String>, settings: Value) -> Self {
        Self {
            name: name.into(),
            settings: match settings {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(alias = "luaVersion", alias = "dialect", alias = "Dialect", default)]
    pub lua_version: Dialect,
    #[serde(alias = "prettyPrint", default)]
    pub pretty_print: bool,
    /// `<= 0` seeds from the clock
    #[serde(alias = "seed", default)]
    pub seed: i64,
    #[serde(alias = "varNamePrefix", default)]
    pub var_name_prefix: String,
    #[serde(alias = "maxIterations", default)]
    pub max_iterations: Option<usize>,
    #[serde(alias = "memoryLimitBytes", default)]
    pub memory_limit_bytes: Option<u64>,
    #[serde(alias = "nameGenerator", default = "default_name_generator")]
    pub name_generator: String,
    #[serde(alias = "steps", default)]
    pub steps: Vec<StepConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lua_version: Dialect::default(),
            pretty_print: false,
            seed: 0,
            var_name_prefix: String::new(),
            max_iterations: None,
            memory_limit_bytes: None,
            name_generator: default_name_generator(),
            steps: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|err| ConfigError::Malformed(err.to_string()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|err| ConfigError::Malformed(err.to_string()))
    }

    /// Load a file, picking the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        match extension.as_str() {
            "json" => Self::from_json_str(&text),
            "yaml" | "yml" => Self::from_yaml_str(&text),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Names accepted by [`preset`], weakest first.
pub const PRESET_NAMES: &[&str] = &["Minify", "Weak", "Medium", "Strong"];

/// A built-in configuration. Names are matched case-insensitively.
pub fn preset(name: &str) -> Result<PipelineConfig, ConfigError> {
    let steps = match name.to_ascii_lowercase().as_str() {
        "minify" => Vec::new(),
        "weak" => vec![
            StepConfig::new("ConstantArray"),
            StepConfig::new("WrapInFunction"),
        ],
        "medium" => vec![
            StepConfig::new("EncryptStrings"),
            StepConfig::with_settings("SplitStrings", json!({"Threshold": 0.5})),
            StepConfig::new("ConstantArray"),
            StepConfig::with_settings("NumbersToExpressions", json!({"Threshold": 0.5})),
            StepConfig::new("WrapInFunction"),
        ],
        "strong" => vec![
            StepConfig::new("EncryptStrings"),
            StepConfig::new("SplitStrings"),
            StepConfig::new("ConstantArray"),
            StepConfig::with_settings(
                "NumbersToExpressions",
                json!({"Threshold": 1.0, "InternalThreshold": 0.4}),
            ),
            StepConfig::with_settings("WrapInFunction", json!({"Iterations": 2})),
        ],
        _ => return Err(ConfigError::UnknownPreset(name.to_string())),
    };
    Ok(PipelineConfig {
        steps,
        ..PipelineConfig::default()
    })
}
