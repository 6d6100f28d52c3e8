//! Lexer errors

use crate::veil::ast::Position;
use thiserror::Error;

/// What went wrong inside a single token. Produced by logos and by the literal callbacks.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexErrorKind {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
    UnterminatedLongString,
    UnterminatedComment,
    InvalidEscape(String),
    MalformedNumber(String),
}

impl LexErrorKind {
    pub fn message(&self, slice: &str) -> String {
        match self {
            LexErrorKind::UnexpectedCharacter => {
                format!("unexpected character '{}'", slice.chars().next().unwrap_or(' '))
            }
            LexErrorKind::UnterminatedString => "unterminated string".to_string(),
            LexErrorKind::UnterminatedLongString => "unterminated long string".to_string(),
            LexErrorKind::UnterminatedComment => "unterminated long comment".to_string(),
            LexErrorKind::InvalidEscape(detail) => format!("invalid escape sequence {}", detail),
            LexErrorKind::MalformedNumber(text) => format!("malformed number near '{}'", text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{position}: {message}")]
pub struct LexError {
    pub position: Position,
    pub offset: usize,
    pub message: String,
}
