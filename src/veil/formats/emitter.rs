//! Token-level output buffer
//!
//!     The emitter receives tokens one at a time and decides the whitespace between them.
//!     In compact mode a space is written only where the two tokens would otherwise lex as
//!     something else. Pretty mode adds line breaks, indentation and the explicit spaces the
//!     unparser asks for.

use serde::{Deserialize, Serialize};

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Minimal whitespace
    #[default]
    Compact,
    /// One statement per line, four spaces per level
    Pretty,
}

const INDENT: &str = "    ";

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether `next_first` may not directly follow `prev_last`.
pub fn needs_space(prev_last: char, prev_is_number: bool, next_first: char) -> bool {
    (is_word(prev_last) && is_word(next_first))
        || (prev_last == '-' && next_first == '-')
        || (prev_is_number && next_first == '.')
        || (prev_last == '.' && (next_first == '.' || next_first.is_ascii_digit()))
        || (prev_last == '[' && (next_first == '[' || next_first == '='))
        || ("<>~=:".contains(prev_last) && (next_first == '=' || next_first == ':'))
}

pub struct Emitter {
    mode: Mode,
    out: String,
    depth: usize,
    last_number: bool,
    after_keyword: bool,
}

impl Emitter {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            out: String::new(),
            depth: 0,
            last_number: false,
            after_keyword: false,
        }
    }

    pub fn is_pretty(&self) -> bool {
        self.mode == Mode::Pretty
    }

    fn separate(&mut self, next: &str) {
        if std::mem::take(&mut self.after_keyword) && !next.starts_with([')', ',', ']', '}', ';']) {
            self.space();
            return;
        }
        if let (Some(prev), Some(first)) = (self.out.chars().last(), next.chars().next()) {
            if needs_space(prev, self.last_number, first) {
                self.out.push(' ');
            }
        }
    }

    pub fn token(&mut self, text: &str) {
        self.separate(text);
        self.out.push_str(text);
        self.last_number = false;
    }

    /// A reserved word. Pretty mode keeps a space after it.
    pub fn keyword(&mut self, text: &str) {
        self.token(text);
        self.after_keyword = self.is_pretty();
    }

    /// A numeric literal. Remembered so a following `.` is kept apart from it.
    pub fn number(&mut self, text: &str) {
        self.separate(text);
        self.out.push_str(text);
        self.last_number = true;
    }

    /// A space in pretty mode, nothing in compact mode.
    pub fn space(&mut self) {
        if self.is_pretty() && !self.out.is_empty() && !self.out.ends_with([' ', '\n']) {
            self.out.push(' ');
            self.last_number = false;
        }
    }

    /// A line break at the current indentation in pretty mode.
    pub fn line(&mut self) {
        if self.is_pretty() && !self.out.is_empty() {
            self.out.push('\n');
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.last_number = false;
        }
        self.after_keyword = false;
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn finish(mut self) -> String {
        if self.is_pretty() && !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact(tokens: &[(&str, bool)]) -> String {
        let mut emitter = Emitter::new(Mode::Compact);
        for (text, is_number) in tokens {
            if *is_number {
                emitter.number(text);
            } else {
                emitter.token(text);
            }
        }
        emitter.finish()
    }

    #[test]
    fn test_words_are_separated() {
        assert_eq!(
            compact(&[("local", false), ("x", false), ("=", false), ("1", true)]),
            "local x=1"
        );
    }

    #[test]
    fn test_number_then_concat() {
        assert_eq!(
            compact(&[("1", true), ("..", false), ("2", true)]),
            "1 .. 2"
        );
        assert_eq!(compact(&[("a", false), ("..", false), ("b", false)]), "a..b");
    }

    #[test]
    fn test_minus_minus_is_not_a_comment() {
        assert_eq!(compact(&[("a", false), ("-", false), ("-", false), ("1", true)]), "a- -1");
    }

    #[test]
    fn test_pretty_lines() {
        let mut emitter = Emitter::new(Mode::Pretty);
        emitter.token("do");
        emitter.indent();
        emitter.line();
        emitter.token("x");
        emitter.space();
        emitter.token("=");
        emitter.space();
        emitter.number("1");
        emitter.dedent();
        emitter.line();
        emitter.token("end");
        assert_eq!(emitter.finish(), "do\n    x = 1\nend\n");
    }
}
