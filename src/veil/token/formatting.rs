//! Token display and classification
//!
//! Converts tokens back to their source text (used in parser diagnostics) and groups them
//! into broad kinds for the `tokenize` JSON output.

use super::core::Token;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    String,
    Operator,
    Punctuation,
    Comment,
    Eof,
}

/// Trait for converting a token to its Lua source representation
pub trait ToLuaString {
    fn to_lua_string(&self) -> String;
}

impl ToLuaString for Token {
    fn to_lua_string(&self) -> String {
        match self {
            Token::Name(name) => name.clone(),
            Token::Number(value) => value.to_string(),
            Token::String(bytes) => format!("\"{}\"", bytes.escape_ascii()),
            Token::Comment => "--".to_string(),
            Token::Eof => String::new(),
            other => other.symbol().to_string(),
        }
    }
}

impl Token {
    /// Source text of fixed tokens. Empty for tokens carrying a value.
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::And => "and",
            Token::Break => "break",
            Token::Do => "do",
            Token::Else => "else",
            Token::Elseif => "elseif",
            Token::End => "end",
            Token::False => "false",
            Token::For => "for",
            Token::Function => "function",
            Token::If => "if",
            Token::In => "in",
            Token::Local => "local",
            Token::Nil => "nil",
            Token::Not => "not",
            Token::Or => "or",
            Token::Repeat => "repeat",
            Token::Return => "return",
            Token::Then => "then",
            Token::True => "true",
            Token::Until => "until",
            Token::While => "while",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Caret => "^",
            Token::Hash => "#",
            Token::Eq => "==",
            Token::Ne => "~=",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Assign => "=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::StarAssign => "*=",
            Token::SlashAssign => "/=",
            Token::PercentAssign => "%=",
            Token::CaretAssign => "^=",
            Token::ConcatAssign => "..=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::DoubleColon => "::",
            Token::Semicolon => ";",
            Token::Colon => ":",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Concat => "..",
            Token::Ellipsis => "...",
            Token::Name(_) | Token::Number(_) | Token::String(_) | Token::Comment | Token::Eof => {
                ""
            }
        }
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            t if t.is_keyword() => TokenKind::Keyword,
            Token::Name(_) => TokenKind::Identifier,
            Token::Number(_) => TokenKind::Number,
            Token::String(_) => TokenKind::String,
            Token::Comment => TokenKind::Comment,
            Token::Eof => TokenKind::Eof,
            Token::LParen
            | Token::RParen
            | Token::LBrace
            | Token::RBrace
            | Token::LBracket
            | Token::RBracket
            | Token::DoubleColon
            | Token::Semicolon
            | Token::Colon
            | Token::Comma
            | Token::Dot => TokenKind::Punctuation,
            _ => TokenKind::Operator,
        }
    }
}

/// Diagnostic form: quoted source text, or a description for value tokens.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "'{}'", name),
            Token::Number(_) => write!(f, "number '{}'", self.to_lua_string()),
            Token::String(_) => write!(f, "string"),
            Token::Comment => write!(f, "comment"),
            Token::Eof => write!(f, "<eof>"),
            other => write!(f, "'{}'", other.symbol()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_for_diagnostics() {
        assert_eq!(Token::End.to_string(), "'end'");
        assert_eq!(Token::Name("x".into()).to_string(), "'x'");
        assert_eq!(Token::Eof.to_string(), "<eof>");
        assert_eq!(Token::ConcatAssign.to_string(), "'..='");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Token::While.kind(), TokenKind::Keyword);
        assert_eq!(Token::Name("goto".into()).kind(), TokenKind::Identifier);
        assert_eq!(Token::Concat.kind(), TokenKind::Operator);
        assert_eq!(Token::Comma.kind(), TokenKind::Punctuation);
        assert_eq!(Token::String(vec![]).kind(), TokenKind::String);
    }
}
