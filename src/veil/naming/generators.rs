//! Built-in name generators

use super::{NameContext, NameGenerator};

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const IDENT_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";

/// Bijective numbering over two alphabets: the first character comes from `start`, every
/// further character from `rest`.
fn mangle(index: usize, start: &[char], rest: &[char]) -> String {
    let mut id = index;
    let mut name = String::new();
    name.push(start[id % start.len()]);
    id /= start.len();
    while id > 0 {
        id -= 1;
        name.push(rest[id % rest.len()]);
        id /= rest.len();
    }
    name
}

/// `a`, `b`, ... `Z`, `aa`, `ba`, ...
#[derive(Debug, Clone)]
pub struct Mangled {
    start: Vec<char>,
    rest: Vec<char>,
}

impl Default for Mangled {
    fn default() -> Self {
        Self {
            start: LETTERS.chars().collect(),
            rest: IDENT_CHARS.chars().collect(),
        }
    }
}

impl NameGenerator for Mangled {
    fn name(&self) -> &'static str {
        "Mangled"
    }

    fn generate_name(&self, _context: &NameContext<'_>, index: usize) -> String {
        mangle(index, &self.start, &self.rest)
    }
}

/// [`Mangled`] over alphabets permuted once per run.
#[derive(Debug, Clone, Default)]
pub struct MangledShuffled {
    inner: Mangled,
}

impl NameGenerator for MangledShuffled {
    fn name(&self) -> &'static str {
        "MangledShuffled"
    }

    fn prepare(&mut self, rng: &mut fastrand::Rng) {
        self.inner = Mangled::default();
        rng.shuffle(&mut self.inner.start);
        rng.shuffle(&mut self.inner.rest);
    }

    fn generate_name(&self, context: &NameContext<'_>, index: usize) -> String {
        self.inner.generate_name(context, index)
    }
}

/// Lookalike names built from `I`, `l` and `1`, at least six characters long.
#[derive(Debug, Clone)]
pub struct Il {
    start: Vec<char>,
    rest: Vec<char>,
}

/// Indices below this produce names shorter than six characters.
const IL_OFFSET: usize = 242;

impl Default for Il {
    fn default() -> Self {
        Self {
            start: vec!['I', 'l'],
            rest: vec!['I', 'l', '1'],
        }
    }
}

impl NameGenerator for Il {
    fn name(&self) -> &'static str {
        "Il"
    }

    fn prepare(&mut self, rng: &mut fastrand::Rng) {
        *self = Il::default();
        rng.shuffle(&mut self.start);
        rng.shuffle(&mut self.rest);
    }

    fn generate_name(&self, _context: &NameContext<'_>, index: usize) -> String {
        mangle(index + IL_OFFSET, &self.start, &self.rest)
    }
}

/// `_0`, `_1`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct Number;

impl NameGenerator for Number {
    fn name(&self) -> &'static str {
        "Number"
    }

    fn generate_name(&self, _context: &NameContext<'_>, index: usize) -> String {
        format!("_{}", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::veil::ast::{Range, ScopeTree, VariableKind};
    use crate::veil::dialect::Dialect;

    fn names(generator: &dyn NameGenerator, indices: &[usize]) -> Vec<String> {
        let mut tree = ScopeTree::new();
        let var = tree.declare(tree.global(), "x", VariableKind::Local, Range::default());
        let context = NameContext {
            dialect: Dialect::Lua51,
            variable: tree.variable(var),
            depth: 0,
        };
        indices
            .iter()
            .map(|i| generator.generate_name(&context, *i))
            .collect()
    }

    #[test]
    fn test_mangled_sequence() {
        assert_eq!(
            names(&Mangled::default(), &[0, 1, 25, 26, 51, 52, 53, 52 * 63]),
            vec!["a", "b", "z", "A", "Z", "aa", "ba", "a_"]
        );
    }

    #[test]
    fn test_mangled_is_injective_on_a_prefix() {
        let generated = names(&Mangled::default(), &(0..5000).collect::<Vec<_>>());
        let unique: std::collections::HashSet<_> = generated.iter().collect();
        assert_eq!(unique.len(), generated.len());
        assert!(generated.iter().all(|n| Dialect::is_identifier_shaped(n)));
    }

    #[test]
    fn test_shuffled_depends_on_seed() {
        let mut a = MangledShuffled::default();
        let mut b = MangledShuffled::default();
        a.prepare(&mut fastrand::Rng::with_seed(7));
        b.prepare(&mut fastrand::Rng::with_seed(7));
        let indices: Vec<usize> = (0..100).collect();
        assert_eq!(names(&a, &indices), names(&b, &indices));

        let mut c = MangledShuffled::default();
        c.prepare(&mut fastrand::Rng::with_seed(8));
        assert_ne!(names(&a, &indices), names(&c, &indices));
    }

    #[test]
    fn test_il_names() {
        let mut generator = Il::default();
        generator.prepare(&mut fastrand::Rng::with_seed(1));
        for name in names(&generator, &[0, 1, 2, 500]) {
            assert!(name.len() >= 6, "{}", name);
            assert!(name.chars().all(|c| matches!(c, 'I' | 'l' | '1')));
            assert_ne!(name.chars().next(), Some('1'));
        }
    }

    #[test]
    fn test_number_names() {
        assert_eq!(names(&Number, &[0, 12]), vec!["_0", "_12"]);
    }
}
