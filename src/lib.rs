//! # veil
//!
//! A source-to-source obfuscator for Lua 5.1 and LuaU.
//!
//! File Layout
//!
//! The library follows the processing order of a single run:
//!
//! src/veil
//!   ├── dialect      Keyword tables and literal-syntax switches per dialect
//!   ├── token        The logos token set
//!   ├── lexing       Source text to tokens
//!   ├── ast          Nodes, ranges and the scope arena
//!   ├── parsing      Tokens to a scope-resolved AST
//!   ├── transforms   The Step contract and the built-in steps
//!   ├── naming       Identifier generators and the renaming pass
//!   ├── formats      The unparser
//!   └── pipeline     Configuration, presets and the orchestrator
//!
//! Most callers only need [`Pipeline`]:
//!
//! ```rust,ignore
//! use veil::{Pipeline, PipelineConfig};
//!
//! let mut pipeline = Pipeline::from_config(PipelineConfig::default())?;
//! let output = pipeline.apply("local x = 1\nprint(x)", "example.lua")?;
//! ```

pub mod veil;

pub use veil::dialect::Dialect;
pub use veil::error::Error;
pub use veil::formats::{unparse, Mode};
pub use veil::lexing::tokenize;
pub use veil::parsing::{parse, parse_source};
pub use veil::naming::NameGenerator;
pub use veil::pipeline::{
    MemoryGauge, Pipeline, PipelineConfig, PipelineContext, PipelineStats, StepConfig,
};
pub use veil::transforms::{Step, TransformError};
