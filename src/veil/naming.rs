//! Renaming engine
//!
//!     Renaming walks the scope tree in pre-order (children in creation order, variables in
//!     declaration order) and gives every local, parameter, upvalue and label a fresh name
//!     built as `prefix + generator.generate_name(context, index)`. Globals keep their names.
//!
//!     The index restarts at 0 in each scope and increases until the candidate is
//!
//!         - not reserved in the dialect,
//!         - not taken by any variable already named in the scope chain (the scope and its
//!           ancestors),
//!         - not the name of a global the program references,
//!         - not the variable's own source name.
//!
//!     Since no two variables visible from one scope ever share a name, shadowing disappears
//!     and every reference keeps pointing at the same binding. Sibling scopes reuse the short
//!     names freely.
//!
//!     Only `Variable::name` is written. Identities and reference lists never change.

pub mod generators;

pub use generators::{Il, Mangled, MangledShuffled, Number};

use crate::veil::ast::{Chunk, ScopeId, ScopeTree, Variable};
use crate::veil::dialect::Dialect;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Candidate budget per variable, on top of the names that are known to be taken.
pub const DEFAULT_MAX_ATTEMPTS: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenameError {
    #[error("invalid variable name prefix '{0}'")]
    InvalidPrefix(String),
    #[error("no free name for '{variable}' after {attempts} candidates")]
    Exhausted { variable: String, attempts: usize },
    #[error("name generator '{generator}' produced invalid identifier '{name}'")]
    InvalidName { generator: String, name: String },
}

/// What a generator may look at when producing a name.
pub struct NameContext<'a> {
    pub dialect: Dialect,
    pub variable: &'a Variable,
    /// Nesting depth of the variable's scope, the global scope being 0
    pub depth: usize,
}

/// Produces candidate identifiers. `generate_name` must be a pure function of its inputs
/// (after `prepare`) so runs with the same seed give the same names.
pub trait NameGenerator {
    fn name(&self) -> &'static str;

    /// Called once per run before any name is generated.
    fn prepare(&mut self, _rng: &mut fastrand::Rng) {}

    fn generate_name(&self, context: &NameContext<'_>, index: usize) -> String;
}

/// Names accepted by [`generator_by_name`].
pub const GENERATOR_NAMES: &[&str] = &["Mangled", "MangledShuffled", "Il", "Number"];

pub fn generator_by_name(name: &str) -> Option<Box<dyn NameGenerator>> {
    match name {
        "Mangled" => Some(Box::new(Mangled::default())),
        "MangledShuffled" => Some(Box::new(MangledShuffled::default())),
        "Il" => Some(Box::new(Il::default())),
        "Number" => Some(Box::new(Number)),
        _ => None,
    }
}

struct Renamer<'g> {
    generator: &'g dyn NameGenerator,
    prefix: &'g str,
    dialect: Dialect,
    max_attempts: usize,
    globals: HashSet<String>,
    chain: HashSet<String>,
}

impl Renamer<'_> {
    /// Candidates a variable may burn. Every taken name (chain, globals, reserved words and
    /// the source name) can reject at most one candidate of an injective generator, so the
    /// budget only runs out when the generator keeps repeating itself.
    fn budget(&self) -> usize {
        let taken = self.chain.len() + self.globals.len() + self.dialect.keywords().len() + 2;
        self.max_attempts.saturating_add(taken)
    }

    fn rename_scope(&mut self, tree: &mut ScopeTree, scope: ScopeId) -> Result<(), RenameError> {
        let variables = tree.scope(scope).variables.clone();
        let depth = tree.depth(scope);
        let mut added = Vec::new();
        let mut index = 0;

        for id in variables {
            if tree.variable(id).is_global() {
                continue;
            }
            let mut attempts = 0;
            let budget = self.budget();
            let name = loop {
                if attempts >= budget {
                    return Err(RenameError::Exhausted {
                        variable: tree.variable(id).declared_name.clone(),
                        attempts,
                    });
                }
                attempts += 1;
                let context = NameContext {
                    dialect: self.dialect,
                    variable: tree.variable(id),
                    depth,
                };
                let candidate =
                    format!("{}{}", self.prefix, self.generator.generate_name(&context, index));
                index += 1;

                if !Dialect::is_identifier_shaped(&candidate) {
                    return Err(RenameError::InvalidName {
                        generator: self.generator.name().to_string(),
                        name: candidate,
                    });
                }
                if self.dialect.is_reserved(&candidate)
                    || candidate == tree.variable(id).declared_name
                    || self.chain.contains(&candidate)
                    || self.globals.contains(&candidate)
                {
                    continue;
                }
                break candidate;
            };

            self.chain.insert(name.clone());
            added.push(name.clone());
            tree.variable_mut(id).name = name;
        }

        let children = tree.scope(scope).children.clone();
        for child in children {
            self.rename_scope(tree, child)?;
        }

        for name in added {
            self.chain.remove(&name);
        }
        Ok(())
    }
}

/// Rename every non-global variable of `chunk`.
///
/// `max_attempts` bounds the fresh candidates tried for a single variable, see
/// [`DEFAULT_MAX_ATTEMPTS`]. Candidates rejected because the name is already taken in scope
/// do not count against it.
pub fn rename(
    chunk: &mut Chunk,
    generator: &mut dyn NameGenerator,
    prefix: &str,
    dialect: Dialect,
    rng: &mut fastrand::Rng,
    max_attempts: usize,
) -> Result<(), RenameError> {
    if !prefix.is_empty() && !dialect.is_valid_identifier(prefix) {
        return Err(RenameError::InvalidPrefix(prefix.to_string()));
    }
    generator.prepare(rng);

    let globals = chunk
        .scopes
        .variables()
        .iter()
        .filter(|var| var.is_global())
        .map(|var| var.name.clone())
        .collect();
    let mut renamer = Renamer {
        generator: &*generator,
        prefix,
        dialect,
        max_attempts,
        globals,
        chain: HashSet::new(),
    };
    let root = chunk.global_scope;
    renamer.rename_scope(&mut chunk.scopes, root)?;

    debug!(
        generator = generator.name(),
        variables = chunk.scopes.variables().len(),
        "renamed variables"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::veil::parsing::parse_source;
    use crate::veil::ast::VariableKind;

    fn renamed(source: &str, prefix: &str) -> Chunk {
        let mut chunk = parse_source(source, Dialect::Lua51).unwrap();
        let mut generator = Mangled::default();
        rename(
            &mut chunk,
            &mut generator,
            prefix,
            Dialect::Lua51,
            &mut fastrand::Rng::with_seed(1),
            DEFAULT_MAX_ATTEMPTS,
        )
        .unwrap();
        chunk
    }

    fn chain_names(chunk: &Chunk, scope: ScopeId) -> Vec<String> {
        chunk
            .scopes
            .ancestors(scope)
            .flat_map(|s| chunk.scopes.scope(s).variables.clone())
            .map(|id| chunk.scopes.variable(id).name.clone())
            .collect()
    }

    #[test]
    fn test_globals_are_kept_and_avoided() {
        let chunk = renamed("local x = 1\nlocal y = a\nprint(x, y)", "");
        let names: Vec<_> = chunk
            .scopes
            .variables()
            .iter()
            .map(|v| (v.declared_name.as_str(), v.name.as_str(), v.kind()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("x", "b", VariableKind::Local),
                ("a", "a", VariableKind::Global),
                ("y", "c", VariableKind::Local),
                ("print", "print", VariableKind::Global),
            ]
        );
    }

    #[test]
    fn test_no_duplicates_in_any_chain() {
        let chunk = renamed(
            "local a, b = 1, 2\nlocal function f(c, d)\n  local e = c\n  do local g = 1 end\n  return function(h) return a + h end\nend",
            "",
        );
        for scope in chunk.scopes.preorder() {
            let names = chain_names(&chunk, scope);
            let unique: HashSet<_> = names.iter().collect();
            assert_eq!(unique.len(), names.len(), "duplicate in {:?}", names);
        }
    }

    #[test]
    fn test_sibling_scopes_reuse_names() {
        let chunk = renamed("do local x = 1 end do local y = 2 end", "");
        let locals: Vec<_> = chunk
            .scopes
            .variables()
            .iter()
            .map(|v| v.name.clone())
            .collect();
        assert_eq!(locals, vec!["a", "a"]);
    }

    #[test]
    fn test_source_name_is_never_kept() {
        let chunk = renamed("local a = 1", "");
        assert_eq!(chunk.scopes.variables()[0].name, "b");
    }

    #[test]
    fn test_prefix() {
        let chunk = renamed("local x = 1", "v_");
        assert_eq!(chunk.scopes.variables()[0].name, "v_a");

        let mut chunk = parse_source("local x = 1", Dialect::Lua51).unwrap();
        let err = rename(
            &mut chunk,
            &mut Mangled::default(),
            "1x",
            Dialect::Lua51,
            &mut fastrand::Rng::with_seed(1),
            DEFAULT_MAX_ATTEMPTS,
        )
        .unwrap_err();
        assert_eq!(err, RenameError::InvalidPrefix("1x".to_string()));
    }

    #[test]
    fn test_keywords_are_skipped() {
        struct Fixed;
        impl NameGenerator for Fixed {
            fn name(&self) -> &'static str {
                "Fixed"
            }
            fn generate_name(&self, _context: &NameContext<'_>, index: usize) -> String {
                ["end", "goto", "ok"][index.min(2)].to_string()
            }
        }
        let mut chunk = parse_source("local x = 1", Dialect::Lua51).unwrap();
        rename(
            &mut chunk,
            &mut Fixed,
            "",
            Dialect::Lua51,
            &mut fastrand::Rng::with_seed(1),
            10,
        )
        .unwrap();
        assert_eq!(chunk.scopes.variables()[0].name, "ok");
    }

    #[test]
    fn test_exhausted() {
        struct Stuck;
        impl NameGenerator for Stuck {
            fn name(&self) -> &'static str {
                "Stuck"
            }
            fn generate_name(&self, _context: &NameContext<'_>, _index: usize) -> String {
                "print".to_string()
            }
        }
        let mut chunk = parse_source("local x = 1 print(x)", Dialect::Lua51).unwrap();
        let err = rename(
            &mut chunk,
            &mut Stuck,
            "",
            Dialect::Lua51,
            &mut fastrand::Rng::with_seed(1),
            50,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RenameError::Exhausted { ref variable, attempts } if variable == "x" && attempts > 50
        ));
    }

    #[test]
    fn test_taken_names_do_not_use_up_the_budget() {
        let mut chunk = parse_source(
            "local p, q, r, s, t, u = 1, 2, 3, 4, 5, 6\nlocal function g() local h = p return h end",
            Dialect::Lua51,
        )
        .unwrap();
        rename(
            &mut chunk,
            &mut Mangled::default(),
            "",
            Dialect::Lua51,
            &mut fastrand::Rng::with_seed(1),
            1,
        )
        .unwrap();
        let h = chunk
            .scopes
            .variables()
            .iter()
            .find(|v| v.declared_name == "h")
            .unwrap();
        assert_eq!(h.name, "g");
    }
}
