//! Transform steps
//!
//!     A step takes ownership of a [`Chunk`] and returns the transformed chunk. Steps touch
//!     nothing but the chunk, its scope tree and the [`PipelineContext`] they are handed, so the
//!     pipeline can run any sequence of them and check the result between each pair.
//!
//!     Steps are built by name from configuration through the [`StepRegistry`]. The canonical
//!     steps live in [`stages`].
//!
//!     A step reports problems by returning [`TransformError`]. The pipeline wraps that (or a
//!     panic) into a `StepError` naming the step.

pub mod registry;
pub mod settings;
pub mod stages;

pub use registry::{step_names, StepConstructor, StepRegistry, STEPS};
pub use settings::StepSettings;

use crate::veil::ast::Chunk;
use crate::veil::pipeline::PipelineContext;
use thiserror::Error;

/// Error that can occur during transformation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Generic error with message
    #[error("{0}")]
    Error(String),
    /// A sub-stage of the step failed
    #[error("stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },
}

impl From<String> for TransformError {
    fn from(s: String) -> Self {
        TransformError::Error(s)
    }
}

impl From<&str> for TransformError {
    fn from(s: &str) -> Self {
        TransformError::Error(s.to_string())
    }
}

/// One AST to AST transformation
pub trait Step {
    /// Name used in configuration and diagnostics
    fn name(&self) -> &str;

    fn apply(&self, chunk: Chunk, context: &mut PipelineContext) -> Result<Chunk, TransformError>;
}
