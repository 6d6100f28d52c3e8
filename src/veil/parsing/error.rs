//! Parser errors

use crate::veil::ast::Position;
use thiserror::Error;

/// The first syntax or scoping error found in a token stream.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{position}: {message}")]
pub struct ParseError {
    pub position: Position,
    pub offset: usize,
    /// Token descriptions that would have been accepted here. Empty when the error is not
    /// about a missing token.
    pub expected: Vec<String>,
    pub found: String,
    pub message: String,
}
