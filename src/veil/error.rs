//! Crate-level error type
//!
//!     Each stage has its own error. [`Error`] wraps all of them so a whole `apply()` can use `?`
//!     and still report exactly one failure.

use crate::veil::formats::UnparseError;
use crate::veil::lexing::LexError;
use crate::veil::naming::RenameError;
use crate::veil::parsing::ParseError;
use crate::veil::pipeline::{ConfigError, ResourceError, StepError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("rename error: {0}")]
    Rename(#[from] RenameError),
    #[error("step error: {0}")]
    Step(#[from] StepError),
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),
    #[error("unparse error: {0}")]
    Unparse(#[from] UnparseError),
}

impl Error {
    /// Stable category name
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Lex(_) => "LexError",
            Error::Parse(_) => "ParseError",
            Error::Config(_) => "ConfigError",
            Error::Rename(_) => "RenameError",
            Error::Step(_) => "StepError",
            Error::Resource(_) => "ResourceError",
            Error::Unparse(_) => "UnparseError",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
