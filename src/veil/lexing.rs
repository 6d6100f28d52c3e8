//! Lexer
//!
//!     Tokenization is a single logos pass over the source, see [`Token`]. Literal values are
//!     decoded by the logos callbacks in [`literals`], so the stream handed to the parser holds
//!     finished numbers and byte strings.
//!
//! The Lexing Pipeline
//!
//!     1. A leading `#` line (shebang) is skipped.
//!     2. logos produces raw tokens, comments included. The dialect rides along in the lexer
//!        extras so callbacks can accept or reject LuaU-only literal forms.
//!     3. Byte spans are converted to [`Range`](crate::veil::ast::Range) values once.
//!     4. Comments are dropped and an explicit `Eof` token closes the stream.
//!
//!     The first invalid token aborts tokenization with a [`LexError`] pointing at it.

pub mod error;
pub mod literals;

pub use error::{LexError, LexErrorKind};

use crate::veil::ast::SourceLocation;
use crate::veil::dialect::Dialect;
use crate::veil::token::{SpannedToken, Token};
use logos::Logos;

/// Tokenize `source`, keeping comment tokens.
pub fn tokenize_with_comments(
    source: &str,
    dialect: Dialect,
) -> Result<Vec<SpannedToken>, LexError> {
    let locations = SourceLocation::new(source);
    let mut lexer = Token::lexer_with_extras(source, dialect);
    if source.starts_with('#') {
        lexer.bump(source.find('\n').unwrap_or(source.len()));
    }

    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(SpannedToken::new(
                token,
                locations.byte_range_to_range(&span),
            )),
            Err(kind) => {
                return Err(LexError {
                    position: locations.byte_to_position(span.start),
                    offset: span.start,
                    message: kind.message(lexer.slice()),
                })
            }
        }
    }

    let end = source.len();
    tokens.push(SpannedToken::new(
        Token::Eof,
        locations.byte_range_to_range(&(end..end)),
    ));
    Ok(tokens)
}

/// Tokenize `source` into the stream the parser reads: no comments, `Eof` last.
pub fn tokenize(source: &str, dialect: Dialect) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = tokenize_with_comments(source, dialect)?;
    tokens.retain(|t| !t.token.is_comment());
    Ok(tokens)
}
