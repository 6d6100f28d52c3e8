//! Dialect definitions
//!
//!     veil reads and writes two dialects of Lua. They share the grammar core and differ in a
//!     handful of reserved words and literal forms:
//!
//!         - Lua51: the standard dialect. `goto` and `::label::` are accepted as a contextual
//!           extension, `continue` is an ordinary name.
//!         - LuaU: the platform variant. `continue` is reserved, compound assignment
//!           (`+=`, `..=`, ...) is allowed, numbers may be binary (`0b101`) and contain `_`
//!           separators, strings may contain `\u{...}` escapes. No goto or labels.
//!
//!     Every stage that needs to know about these differences takes a [`Dialect`] value. There is
//!     no global dialect state.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved words shared by both dialects.
const LUA51_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

const LUAU_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
    "continue",
];

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"));

/// The Lua dialect a pipeline reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// Lua 5.1, the standard dialect
    #[default]
    #[serde(alias = "Standard", alias = "standard", alias = "lua51")]
    Lua51,
    /// LuaU, the platform variant
    #[serde(alias = "PlatformVariant", alias = "platformVariant", alias = "luau", alias = "Luau")]
    LuaU,
}

impl Dialect {
    /// All dialects, in a stable order.
    pub const ALL: [Dialect; 2] = [Dialect::Lua51, Dialect::LuaU];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Dialect::Lua51 => LUA51_KEYWORDS,
            Dialect::LuaU => LUAU_KEYWORDS,
        }
    }

    pub fn is_keyword(self, word: &str) -> bool {
        self.keywords().contains(&word)
    }

    /// Words a generated identifier must never take.
    ///
    /// This is the keyword set plus the contextual `goto` of Lua51, which would turn
    /// `goto x` back into a statement.
    pub fn is_reserved(self, word: &str) -> bool {
        self.is_keyword(word) || (self.supports_goto() && word == "goto")
    }

    /// Whether `name` may appear as an identifier in this dialect.
    pub fn is_valid_identifier(self, name: &str) -> bool {
        IDENTIFIER.is_match(name) && !self.is_keyword(name)
    }

    /// Whether `name` has identifier shape, ignoring reserved words.
    pub fn is_identifier_shaped(name: &str) -> bool {
        IDENTIFIER.is_match(name)
    }

    pub fn supports_continue(self) -> bool {
        matches!(self, Dialect::LuaU)
    }

    pub fn supports_compound_assignment(self) -> bool {
        matches!(self, Dialect::LuaU)
    }

    /// `goto` and `::label::` as accepted by Lua 5.2 and LuaJIT. Stock 5.1 lacks them, but
    /// sources targeting this dialect use them and nothing valid in 5.1 changes meaning.
    pub fn supports_goto(self) -> bool {
        matches!(self, Dialect::Lua51)
    }

    pub fn supports_binary_literals(self) -> bool {
        matches!(self, Dialect::LuaU)
    }

    pub fn supports_digit_separators(self) -> bool {
        matches!(self, Dialect::LuaU)
    }

    pub fn supports_unicode_escapes(self) -> bool {
        matches!(self, Dialect::LuaU)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Lua51 => write!(f, "Lua51"),
            Dialect::LuaU => write!(f, "LuaU"),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lua51" | "standard" | "lua5.1" => Ok(Dialect::Lua51),
            "luau" | "platformvariant" => Ok(Dialect::LuaU),
            _ => Err(format!("unknown dialect '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continue_is_reserved_only_in_luau() {
        assert!(!Dialect::Lua51.is_keyword("continue"));
        assert!(Dialect::LuaU.is_keyword("continue"));
        assert!(Dialect::Lua51.is_valid_identifier("continue"));
        assert!(!Dialect::LuaU.is_valid_identifier("continue"));
    }

    #[test]
    fn test_goto_is_reserved_for_generated_names() {
        assert!(!Dialect::Lua51.is_keyword("goto"));
        assert!(Dialect::Lua51.is_reserved("goto"));
        assert!(!Dialect::LuaU.is_reserved("goto"));
    }

    #[test]
    fn test_identifier_shape() {
        assert!(Dialect::Lua51.is_valid_identifier("_x1"));
        assert!(!Dialect::Lua51.is_valid_identifier("1x"));
        assert!(!Dialect::Lua51.is_valid_identifier("a-b"));
        assert!(!Dialect::Lua51.is_valid_identifier(""));
        assert!(!Dialect::Lua51.is_valid_identifier("end"));
    }

    #[test]
    fn test_from_str_accepts_config_names() {
        assert_eq!("Standard".parse::<Dialect>().unwrap(), Dialect::Lua51);
        assert_eq!("PlatformVariant".parse::<Dialect>().unwrap(), Dialect::LuaU);
        assert_eq!("luau".parse::<Dialect>().unwrap(), Dialect::LuaU);
        assert!("lua54".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_serde_aliases() {
        let d: Dialect = serde_json::from_str("\"PlatformVariant\"").unwrap();
        assert_eq!(d, Dialect::LuaU);
        let d: Dialect = serde_json::from_str("\"Lua51\"").unwrap();
        assert_eq!(d, Dialect::Lua51);
    }
}
