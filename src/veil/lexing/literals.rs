//! Literal decoding callbacks
//!
//!     logos matches the first character of a literal and hands over to these callbacks,
//!     which scan the rest from `lex.remainder()`, bump the lexer past it and return the
//!     decoded value. Dialect rules are read from the lexer extras.

use super::error::LexErrorKind;
use crate::veil::dialect::Dialect;
use crate::veil::token::Token;
use logos::Lexer;

/// Scan a numeral the way Lua does (greedy over alphanumerics, `.`, `_` and exponent signs),
/// then decode it.
pub fn number(lex: &mut Lexer<Token>) -> Result<f64, LexErrorKind> {
    let head = lex.slice().as_bytes();
    let rest = lex.remainder().as_bytes();
    let is_hex = head == b"0" && matches!(rest.first(), Some(b'x') | Some(b'X'));
    let exponent_markers: &[u8] = if is_hex { b"pP" } else { b"eE" };

    let mut prev = head[head.len() - 1];
    let mut len = 0;
    while let Some(&c) = rest.get(len) {
        let accepted = c.is_ascii_alphanumeric()
            || c == b'.'
            || c == b'_'
            || (matches!(c, b'+' | b'-') && exponent_markers.contains(&prev));
        if !accepted {
            break;
        }
        prev = c;
        len += 1;
    }
    lex.bump(len);
    parse_number(lex.slice(), lex.extras)
}

/// Decode the text of a numeral in `dialect`.
pub fn parse_number(text: &str, dialect: Dialect) -> Result<f64, LexErrorKind> {
    let malformed = || LexErrorKind::MalformedNumber(text.to_string());

    let cleaned;
    let digits = if text.contains('_') {
        if !dialect.supports_digit_separators() {
            return Err(malformed());
        }
        cleaned = text.replace('_', "");
        cleaned.as_str()
    } else {
        text
    };
    let lower = digits.to_ascii_lowercase();

    if let Some(hex) = lower.strip_prefix("0x") {
        return parse_hex(hex).ok_or_else(malformed);
    }
    if let Some(bin) = lower.strip_prefix("0b") {
        if !dialect.supports_binary_literals()
            || bin.is_empty()
            || !bin.bytes().all(|b| b == b'0' || b == b'1')
        {
            return Err(malformed());
        }
        return Ok(bin
            .bytes()
            .fold(0.0, |acc, b| acc * 2.0 + f64::from(b - b'0')));
    }
    if !lower
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'+' | b'-'))
    {
        return Err(malformed());
    }
    lower.parse::<f64>().map_err(|_| malformed())
}

fn parse_hex(text: &str) -> Option<f64> {
    let (mantissa, exponent) = match text.split_once('p') {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (text, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    let mut value = 0.0;
    for c in int_part.chars() {
        value = value * 16.0 + f64::from(c.to_digit(16)?);
    }
    let mut scale = 1.0 / 16.0;
    for c in frac_part.chars() {
        value += f64::from(c.to_digit(16)?) * scale;
        scale /= 16.0;
    }
    if let Some(exponent) = exponent {
        let unsigned = exponent.trim_start_matches(['+', '-']);
        if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let power: i32 = exponent.parse().ok()?;
        value *= 2f64.powi(power);
    }
    Some(value)
}

/// Decode a `"` or `'` delimited string. The opening quote is the current slice.
pub fn quoted_string(lex: &mut Lexer<Token>) -> Result<Vec<u8>, LexErrorKind> {
    let quote = lex.slice().as_bytes()[0];
    let dialect = lex.extras;
    let rest = lex.remainder().as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    loop {
        let Some(&c) = rest.get(i) else {
            return Err(LexErrorKind::UnterminatedString);
        };
        match c {
            q if q == quote => {
                lex.bump(i + 1);
                return Ok(out);
            }
            b'\n' | b'\r' => return Err(LexErrorKind::UnterminatedString),
            b'\\' => i = decode_escape(rest, i + 1, &mut out, dialect)?,
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
}

/// Decode the escape whose first character (after the backslash) is at `i`.
/// Returns the index just past the escape.
fn decode_escape(
    rest: &[u8],
    i: usize,
    out: &mut Vec<u8>,
    dialect: Dialect,
) -> Result<usize, LexErrorKind> {
    let Some(&c) = rest.get(i) else {
        return Err(LexErrorKind::UnterminatedString);
    };
    let simple = match c {
        b'a' => Some(7),
        b'b' => Some(8),
        b'f' => Some(12),
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        b'v' => Some(11),
        b'\\' | b'"' | b'\'' => Some(c),
        _ => None,
    };
    if let Some(byte) = simple {
        out.push(byte);
        return Ok(i + 1);
    }

    match c {
        b'\n' | b'\r' => {
            out.push(b'\n');
            let pair = match rest.get(i + 1) {
                Some(&next) => (next == b'\n' || next == b'\r') && next != c,
                None => false,
            };
            Ok(if pair { i + 2 } else { i + 1 })
        }
        b'x' => {
            let digits = rest.get(i + 1..i + 3).unwrap_or(&[]);
            let value = std::str::from_utf8(digits)
                .ok()
                .filter(|d| d.len() == 2)
                .and_then(|d| u8::from_str_radix(d, 16).ok())
                .ok_or_else(|| LexErrorKind::InvalidEscape("'\\x' needs two hex digits".into()))?;
            out.push(value);
            Ok(i + 3)
        }
        b'z' => {
            let mut j = i + 1;
            while rest.get(j).is_some_and(|b| b.is_ascii_whitespace() || *b == 11) {
                j += 1;
            }
            Ok(j)
        }
        b'u' if dialect.supports_unicode_escapes() => {
            if rest.get(i + 1) != Some(&b'{') {
                return Err(LexErrorKind::InvalidEscape("missing '{' in '\\u{XXXX}'".into()));
            }
            let mut j = i + 2;
            let mut code: u32 = 0;
            while let Some(digit) = rest.get(j).and_then(|b| (*b as char).to_digit(16)) {
                code = code.saturating_mul(16).saturating_add(digit);
                j += 1;
            }
            if j == i + 2 || rest.get(j) != Some(&b'}') || code > 0x10FFFF {
                return Err(LexErrorKind::InvalidEscape("malformed '\\u{XXXX}'".into()));
            }
            push_utf8(out, code);
            Ok(j + 1)
        }
        b'0'..=b'9' => {
            let mut j = i;
            let mut value: u32 = 0;
            while j < i + 3 {
                match rest.get(j) {
                    Some(d) if d.is_ascii_digit() => {
                        value = value * 10 + u32::from(d - b'0');
                        j += 1;
                    }
                    _ => break,
                }
            }
            let byte = u8::try_from(value).map_err(|_| {
                LexErrorKind::InvalidEscape(format!("'\\{}' is larger than 255", value))
            })?;
            out.push(byte);
            Ok(j)
        }
        other => Err(LexErrorKind::InvalidEscape(format!(
            "'\\{}'",
            other.escape_ascii()
        ))),
    }
}

/// UTF-8 encoding that also accepts surrogate code points.
fn push_utf8(out: &mut Vec<u8>, code: u32) {
    if code < 0x80 {
        out.push(code as u8);
    } else if code < 0x800 {
        out.push(0xC0 | (code >> 6) as u8);
        out.push(0x80 | (code & 0x3F) as u8);
    } else if code < 0x10000 {
        out.push(0xE0 | (code >> 12) as u8);
        out.push(0x80 | ((code >> 6) & 0x3F) as u8);
        out.push(0x80 | (code & 0x3F) as u8);
    } else {
        out.push(0xF0 | (code >> 18) as u8);
        out.push(0x80 | ((code >> 12) & 0x3F) as u8);
        out.push(0x80 | ((code >> 6) & 0x3F) as u8);
        out.push(0x80 | (code & 0x3F) as u8);
    }
}

/// Level of the long bracket opening `bytes`, if it starts with one.
fn long_bracket_level(bytes: &[u8]) -> Option<usize> {
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut j = 1;
    while bytes.get(j) == Some(&b'=') {
        j += 1;
    }
    (bytes.get(j) == Some(&b'[')).then_some(j - 1)
}

/// Find `]` `=`*level `]`. Returns (content end, closer end).
fn find_long_close(bytes: &[u8], level: usize) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b']' {
            let mut j = i + 1;
            while bytes.get(j) == Some(&b'=') {
                j += 1;
            }
            if j - i - 1 == level && bytes.get(j) == Some(&b']') {
                return Some((i, j + 1));
            }
        }
        i += 1;
    }
    None
}

/// Decode a `[==[ ... ]==]` string. The opening bracket is the current slice.
pub fn long_string(lex: &mut Lexer<Token>) -> Result<Vec<u8>, LexErrorKind> {
    let level = lex.slice().len() - 2;
    let rest = lex.remainder().as_bytes();
    let (content_end, close_end) =
        find_long_close(rest, level).ok_or(LexErrorKind::UnterminatedLongString)?;

    let content = &rest[..content_end];
    let skip = match content {
        [b'\r', b'\n', ..] | [b'\n', b'\r', ..] => 2,
        [b'\n', ..] | [b'\r', ..] => 1,
        _ => 0,
    };
    let value = content[skip..].to_vec();
    lex.bump(close_end);
    Ok(value)
}

/// Skip a comment. The `--` is the current slice.
pub fn comment(lex: &mut Lexer<Token>) -> Result<(), LexErrorKind> {
    let rest = lex.remainder().as_bytes();
    match long_bracket_level(rest) {
        Some(level) => {
            let open = level + 2;
            let (_, close_end) = find_long_close(&rest[open..], level)
                .ok_or(LexErrorKind::UnterminatedComment)?;
            lex.bump(open + close_end);
        }
        None => {
            let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
            lex.bump(end);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use logos::Logos;

    fn first(source: &str, dialect: Dialect) -> Result<Token, LexErrorKind> {
        Token::lexer_with_extras(source, dialect)
            .next()
            .expect("at least one token")
    }

    #[test]
    fn test_decimal_numbers() {
        assert_eq!(parse_number("42", Dialect::Lua51), Ok(42.0));
        assert_eq!(parse_number("3.25", Dialect::Lua51), Ok(3.25));
        assert_eq!(parse_number(".5", Dialect::Lua51), Ok(0.5));
        assert_eq!(parse_number("5.", Dialect::Lua51), Ok(5.0));
        assert_eq!(parse_number("1e3", Dialect::Lua51), Ok(1000.0));
        assert_eq!(parse_number("2.5E-1", Dialect::Lua51), Ok(0.25));
        assert!(parse_number("1e", Dialect::Lua51).is_err());
        assert!(parse_number("3..2", Dialect::Lua51).is_err());
        assert!(parse_number("12abc", Dialect::Lua51).is_err());
    }

    #[test]
    fn test_hex_numbers() {
        assert_eq!(parse_number("0xff", Dialect::Lua51), Ok(255.0));
        assert_eq!(parse_number("0X1P4", Dialect::Lua51), Ok(16.0));
        assert_eq!(parse_number("0x.8", Dialect::Lua51), Ok(0.5));
        assert!(parse_number("0x", Dialect::Lua51).is_err());
        assert!(parse_number("0xg", Dialect::Lua51).is_err());
    }

    #[test]
    fn test_luau_only_number_forms() {
        assert!(parse_number("0b101", Dialect::Lua51).is_err());
        assert_eq!(parse_number("0b101", Dialect::LuaU), Ok(5.0));
        assert!(parse_number("1_000", Dialect::Lua51).is_err());
        assert_eq!(parse_number("1_000", Dialect::LuaU), Ok(1000.0));
        assert_eq!(parse_number("0xFF_FF", Dialect::LuaU), Ok(65535.0));
    }

    #[test]
    fn test_number_scan_stops_at_operators() {
        let tokens: Vec<_> = Token::lexer_with_extras("1e-2-3", Dialect::Lua51).collect();
        assert_eq!(
            tokens,
            vec![Ok(Token::Number(0.01)), Ok(Token::Minus), Ok(Token::Number(3.0))]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            first(r#""a\tb\n\065\x41\\\"""#, Dialect::Lua51),
            Ok(Token::String(b"a\tb\nAA\\\"".to_vec()))
        );
        assert_eq!(
            first("'x\\z   \n  y'", Dialect::Lua51),
            Ok(Token::String(b"xy".to_vec()))
        );
        assert_eq!(
            first("'a\\\nb'", Dialect::Lua51),
            Ok(Token::String(b"a\nb".to_vec()))
        );
    }

    #[test]
    fn test_unicode_escape_is_luau_only() {
        assert_eq!(
            first(r#""\u{48}\u{e9}""#, Dialect::LuaU),
            Ok(Token::String(vec![b'H', 0xC3, 0xA9]))
        );
        assert!(matches!(
            first(r#""\u{48}""#, Dialect::Lua51),
            Err(LexErrorKind::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_string_errors() {
        assert_eq!(
            first("\"abc", Dialect::Lua51),
            Err(LexErrorKind::UnterminatedString)
        );
        assert_eq!(
            first("\"ab\ncd\"", Dialect::Lua51),
            Err(LexErrorKind::UnterminatedString)
        );
        assert!(matches!(
            first(r#""\256""#, Dialect::Lua51),
            Err(LexErrorKind::InvalidEscape(_))
        ));
        assert!(matches!(
            first(r#""\q""#, Dialect::Lua51),
            Err(LexErrorKind::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_long_strings() {
        assert_eq!(
            first("[[\nline]]", Dialect::Lua51),
            Ok(Token::String(b"line".to_vec()))
        );
        assert_eq!(
            first("[==[a]]b]=]c]==]", Dialect::Lua51),
            Ok(Token::String(b"a]]b]=]c".to_vec()))
        );
        assert_eq!(
            first("[=[never closed]]", Dialect::Lua51),
            Err(LexErrorKind::UnterminatedLongString)
        );
    }

    #[test]
    fn test_comments() {
        let tokens: Vec<_> =
            Token::lexer_with_extras("--[==[ long\n]] ]==] x --[[ open", Dialect::Lua51)
                .take(3)
                .collect();
        assert_eq!(
            tokens,
            vec![
                Ok(Token::Comment),
                Ok(Token::Name("x".to_string())),
                Err(LexErrorKind::UnterminatedComment),
            ]
        );
    }
}
