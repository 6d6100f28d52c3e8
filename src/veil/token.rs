//! Core token types shared by the lexer, parser and tooling.

pub mod core;
pub mod formatting;

pub use self::core::Token;
pub use formatting::{ToLuaString, TokenKind};

use crate::veil::ast::Range;
use serde::Serialize;

/// A token together with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub range: Range,
}

impl SpannedToken {
    pub fn new(token: Token, range: Range) -> Self {
        Self { token, range }
    }

    /// Flat, serializable view used by `veil tokenize`.
    pub fn record(&self) -> TokenRecord {
        TokenRecord {
            kind: self.token.kind(),
            text: self.token.to_lua_string(),
            line: self.range.start.line,
            column: self.range.start.column,
            offset: self.range.span.start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenRecord {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}
