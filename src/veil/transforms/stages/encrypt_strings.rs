//! Encrypt string literals behind an injected decoder
//!
//! Byte `i` (1-based) of a literal is stored as `(b + key + i) % 256`. The decoder reverses it
//! with plain arithmetic, so the output runs under both dialects. Decoded strings are cached
//! per encrypted value.

use crate::veil::ast::{for_each_expr_mut, Chunk, Expr, ExprKind, Range};
use crate::veil::parsing::parse_snippet;
use crate::veil::pipeline::{ConfigError, PipelineContext};
use crate::veil::transforms::{Step, StepSettings, TransformError};

const DECODER: &str = r#"
local DECRYPT
do
    local byte, char, concat = string.byte, string.char, table.concat
    local cache = {}
    function DECRYPT(value, key)
        local hit = cache[value]
        if hit then
            return hit
        end
        local out = {}
        for i = 1, #value do
            out[i] = char((byte(value, i) - key - i) % 256)
        end
        local result = concat(out)
        cache[value] = result
        return result
    end
end
"#;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncryptStrings;

impl EncryptStrings {
    pub fn from_settings(settings: &StepSettings) -> Result<Self, ConfigError> {
        settings.allow_only(&[])?;
        Ok(Self)
    }
}

pub fn encrypt(bytes: &[u8], key: u8) -> Vec<u8> {
    bytes
        .iter()
        .enumerate()
        .map(|(i, b)| ((*b as usize + key as usize + i + 1) % 256) as u8)
        .collect()
}

pub fn decrypt(bytes: &[u8], key: u8) -> Vec<u8> {
    bytes
        .iter()
        .enumerate()
        .map(|(i, b)| (*b as i64 - key as i64 - (i as i64 + 1)).rem_euclid(256) as u8)
        .collect()
}

impl Step for EncryptStrings {
    fn name(&self) -> &str {
        "EncryptStrings"
    }

    fn apply(&self, mut chunk: Chunk, context: &mut PipelineContext) -> Result<Chunk, TransformError> {
        let top = chunk.body.scope;
        let snippet = parse_snippet(DECODER, context.dialect(), &mut chunk.scopes, top).map_err(
            |err| TransformError::StageFailed {
                stage: "decoder".to_string(),
                message: err.to_string(),
            },
        )?;
        let decoder = snippet
            .variable(&chunk.scopes, "DECRYPT")
            .ok_or_else(|| TransformError::from("decoder does not declare DECRYPT"))?;

        let key = context.rng().u8(1..=255);
        let mut uses = Vec::new();
        for_each_expr_mut(&mut chunk.body, &mut |expr: &mut Expr, scope| {
            let ExprKind::String(bytes) = &expr.kind else {
                return;
            };
            let encrypted = encrypt(bytes, key);
            *expr = Expr::call(
                Expr::variable(decoder),
                vec![Expr::string(encrypted), Expr::number(key as f64)],
            );
            uses.push(scope);
        });
        for scope in uses {
            chunk.scopes.reference(decoder, scope, Range::default());
        }

        chunk.body.statements.splice(0..0, snippet.statements);
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::veil::ast::{check_integrity, StmtKind};
    use crate::veil::dialect::Dialect;
    use crate::veil::formats::{unparse, Mode};
    use crate::veil::parsing::parse_source;
    use rstest::rstest;

    #[test]
    fn test_decrypt_inverts_encrypt() {
        let plain = b"hello\0\xff world";
        for key in [1u8, 77, 255] {
            assert_eq!(decrypt(&encrypt(plain, key), key), plain.to_vec());
        }
    }

    #[rstest]
    #[case(Dialect::Lua51)]
    #[case(Dialect::LuaU)]
    fn test_output_reparses(#[case] dialect: Dialect) {
        let chunk = parse_source(r#"local s = "secret" print(s, "x")"#, dialect).unwrap();
        let mut context = PipelineContext::new(dialect, 5, None, "test");
        let chunk = EncryptStrings.apply(chunk, &mut context).unwrap();
        check_integrity(&chunk).unwrap();
        let text = unparse(&chunk, dialect, Mode::Compact).unwrap();
        assert!(!text.contains("secret"));
        parse_source(&text, dialect).unwrap();
    }

    #[test]
    fn test_user_local_does_not_capture_decoder_globals() {
        let chunk = parse_source(r#"local string = "s""#, Dialect::Lua51).unwrap();
        let mut context = PipelineContext::new(Dialect::Lua51, 5, None, "test");
        let chunk = EncryptStrings.apply(chunk, &mut context).unwrap();
        let globals: Vec<&str> = chunk
            .scopes
            .variables()
            .iter()
            .filter(|v| v.is_global())
            .map(|v| v.declared_name.as_str())
            .collect();
        assert!(globals.contains(&"string"));
        assert!(globals.contains(&"table"));
    }

    #[test]
    fn test_literals_become_calls() {
        let chunk = parse_source(r#"return "a""#, Dialect::Lua51).unwrap();
        let mut context = PipelineContext::new(Dialect::Lua51, 5, None, "test");
        let chunk = EncryptStrings.apply(chunk, &mut context).unwrap();
        let Some(StmtKind::Return(values)) = chunk.body.statements.last().map(|s| &s.kind) else {
            panic!("expected a trailing return");
        };
        assert!(values[0].is_call());
    }
}
