//! Token definitions for Lua source
//!
//! This module defines all the tokens that can be produced by the lexer. The tokens are
//! defined using the logos derive macro. Literal decoding happens in logos callbacks (see
//! [`literals`](crate::veil::lexing::literals)), so a `Number` or `String` token already
//! carries its value.
//!
//! Keyword handling: the 21 words reserved in both dialects are tokens of their own. `goto`
//! and `continue` lex as [`Token::Name`]; the parser treats them as statement keywords where
//! the dialect has them.
use crate::veil::dialect::Dialect;
use crate::veil::lexing::error::LexErrorKind;
use crate::veil::lexing::literals::{comment, long_string, number, quoted_string};
use logos::Logos;

/// All possible tokens in Lua source
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(extras = Dialect)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\r\n\f\x0B]+")]
pub enum Token {
    // Keywords
    #[token("and")]
    And,
    #[token("break")]
    Break,
    #[token("do")]
    Do,
    #[token("else")]
    Else,
    #[token("elseif")]
    Elseif,
    #[token("end")]
    End,
    #[token("false")]
    False,
    #[token("for")]
    For,
    #[token("function")]
    Function,
    #[token("if")]
    If,
    #[token("in")]
    In,
    #[token("local")]
    Local,
    #[token("nil")]
    Nil,
    #[token("not")]
    Not,
    #[token("or")]
    Or,
    #[token("repeat")]
    Repeat,
    #[token("return")]
    Return,
    #[token("then")]
    Then,
    #[token("true")]
    True,
    #[token("until")]
    Until,
    #[token("while")]
    While,

    // Names and literals
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),
    #[regex(r"[0-9]", number)]
    #[regex(r"\.[0-9]", number)]
    Number(f64),
    #[token("\"", quoted_string)]
    #[token("'", quoted_string)]
    #[regex(r"\[=*\[", long_string)]
    String(Vec<u8>),

    // Arithmetic and length
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
    #[token("#")]
    Hash,

    // Comparison and assignment
    #[token("==")]
    Eq,
    #[token("~=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Assign,

    // Compound assignment (LuaU)
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("^=")]
    CaretAssign,
    #[token("..=")]
    ConcatAssign,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("::")]
    DoubleColon,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("..")]
    Concat,
    #[token("...")]
    Ellipsis,

    /// `--` line comments and `--[[ ]]` block comments. Dropped before parsing.
    #[token("--", comment)]
    Comment,

    /// End of the token stream. Never produced by logos, appended by `tokenize`.
    Eof,
}

impl Token {
    pub fn is_comment(&self) -> bool {
        matches!(self, Token::Comment)
    }

    /// Check if this token is one of the reserved words
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::And
                | Token::Break
                | Token::Do
                | Token::Else
                | Token::Elseif
                | Token::End
                | Token::False
                | Token::For
                | Token::Function
                | Token::If
                | Token::In
                | Token::Local
                | Token::Nil
                | Token::Not
                | Token::Or
                | Token::Repeat
                | Token::Return
                | Token::Then
                | Token::True
                | Token::Until
                | Token::While
        )
    }

    /// Whether this token is the name `word` (used for the contextual keywords).
    pub fn is_name(&self, word: &str) -> bool {
        matches!(self, Token::Name(name) if name == word)
    }

    /// Tokens that close a block.
    pub fn ends_block(&self) -> bool {
        matches!(
            self,
            Token::End | Token::Else | Token::Elseif | Token::Until | Token::Eof
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str, dialect: Dialect) -> Vec<Result<Token, LexErrorKind>> {
        Token::lexer_with_extras(source, dialect).collect()
    }

    #[test]
    fn test_keywords_and_names() {
        let tokens = lex("local andy = nil", Dialect::Lua51);
        assert_eq!(
            tokens,
            vec![
                Ok(Token::Local),
                Ok(Token::Name("andy".to_string())),
                Ok(Token::Assign),
                Ok(Token::Nil),
            ]
        );
    }

    #[test]
    fn test_contextual_keywords_are_names() {
        let tokens = lex("goto continue", Dialect::LuaU);
        assert_eq!(
            tokens,
            vec![
                Ok(Token::Name("goto".to_string())),
                Ok(Token::Name("continue".to_string())),
            ]
        );
    }

    #[test]
    fn test_dots() {
        let tokens = lex(". .. ... ..=", Dialect::LuaU);
        assert_eq!(
            tokens,
            vec![
                Ok(Token::Dot),
                Ok(Token::Concat),
                Ok(Token::Ellipsis),
                Ok(Token::ConcatAssign),
            ]
        );
    }

    #[test]
    fn test_brackets_and_long_strings() {
        let tokens = lex("t[ [[x]] ] [", Dialect::Lua51);
        assert_eq!(
            tokens,
            vec![
                Ok(Token::Name("t".to_string())),
                Ok(Token::LBracket),
                Ok(Token::String(b"x".to_vec())),
                Ok(Token::RBracket),
                Ok(Token::LBracket),
            ]
        );
    }

    #[test]
    fn test_open_long_bracket_without_second_bracket_is_rejected() {
        let tokens = lex("x = [=", Dialect::Lua51);
        assert_eq!(tokens[2], Err(LexErrorKind::UnexpectedCharacter));
    }

    #[test]
    fn test_comment_then_minus() {
        let tokens = lex("a - b -- note\nc", Dialect::Lua51);
        assert_eq!(
            tokens,
            vec![
                Ok(Token::Name("a".to_string())),
                Ok(Token::Minus),
                Ok(Token::Name("b".to_string())),
                Ok(Token::Comment),
                Ok(Token::Name("c".to_string())),
            ]
        );
    }

    #[test]
    fn test_unknown_character() {
        let tokens = lex("a @ b", Dialect::Lua51);
        assert_eq!(tokens[1], Err(LexErrorKind::UnexpectedCharacter));
    }
}
