//! Property tests: renaming never changes which binding a name refers to

use proptest::prelude::*;
use std::collections::HashMap;
use veil::veil::ast::{
    walk_block, Chunk, Expr, ExprKind, FunctionBody, Stmt, StmtKind, VarId, Visitor,
};
use veil::{parse_source, Dialect, Pipeline, PipelineConfig};

/// Names that collide with the short generated names, with globals, or with words that are
/// reserved elsewhere.
const NAMES: &[&str] = &["a", "b", "c", "x", "print", "self", "continue", "goto_", "_"];

fn name() -> impl Strategy<Value = String> {
    (0..NAMES.len()).prop_map(|i| NAMES[i].to_string())
}

fn expression() -> impl Strategy<Value = String> {
    prop_oneof![
        name(),
        (0u32..10).prop_map(|n| n.to_string()),
        (name(), name()).prop_map(|(l, r)| format!("{} + {}", l, r)),
    ]
}

fn block() -> impl Strategy<Value = String> {
    let statement = prop_oneof![
        (name(), expression()).prop_map(|(n, e)| format!("local {} = {}", n, e)),
        (name(), expression()).prop_map(|(n, e)| format!("{} = {}", n, e)),
        expression().prop_map(|e| format!("print({})", e)),
    ];
    let leaf = prop::collection::vec(statement, 1..4).prop_map(|s| s.join("\n"));
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..3).prop_map(|s| s.join("\n")),
            inner.clone().prop_map(|b| format!("do\n{}\nend", b)),
            (name(), name(), name(), inner.clone(), expression()).prop_map(
                |(f, p, q, body, ret)| format!(
                    "local function {}({}, {})\n{}\nreturn {}\nend",
                    f, p, q, body, ret
                )
            ),
            (name(), inner.clone(), expression()).prop_map(|(v, body, e)| format!(
                "for {} = 1, 2 do\n{}\nend\nprint({})",
                v, body, e
            )),
            (inner.clone(), inner).prop_map(|(a, b)| format!("{}\n{}", a, b)),
        ]
    })
}

/// Every binding occurrence in walk order, numbered by first appearance. Globals are named.
struct Bindings<'c> {
    chunk: &'c Chunk,
    numbering: HashMap<VarId, usize>,
    trace: Vec<String>,
}

impl Bindings<'_> {
    fn note(&mut self, id: VarId) {
        let var = self.chunk.scopes.variable(id);
        let entry = if var.is_global() {
            format!("global {}", var.name)
        } else {
            let next = self.numbering.len();
            format!("local #{}", self.numbering.entry(id).or_insert(next))
        };
        self.trace.push(entry);
    }
}

impl Visitor for Bindings<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Local { variables, .. } | StmtKind::GenericFor { variables, .. } => {
                for id in variables {
                    self.note(*id);
                }
            }
            StmtKind::LocalFunction { variable, .. } | StmtKind::NumericFor { variable, .. } => {
                self.note(*variable)
            }
            _ => {}
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::Variable(id) = expr.kind {
            self.note(id);
        }
    }

    fn visit_function(&mut self, function: &FunctionBody) {
        for id in &function.parameters {
            self.note(*id);
        }
    }
}

fn bindings(chunk: &Chunk) -> Vec<String> {
    let mut collector = Bindings {
        chunk,
        numbering: HashMap::new(),
        trace: Vec::new(),
    };
    walk_block(&mut collector, &chunk.body);
    collector.trace
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_renaming_preserves_bindings(
        program in block(),
        seed in 1i64..10_000,
        generator in prop_oneof![Just("Mangled"), Just("MangledShuffled"), Just("Number")],
    ) {
        let original = parse_source(&program, Dialect::Lua51).unwrap();
        let config = PipelineConfig {
            lua_version: Dialect::Lua51,
            seed,
            name_generator: generator.to_string(),
            ..PipelineConfig::default()
        };
        let output = Pipeline::from_config(config).unwrap().apply(&program, "prop.lua").unwrap();
        let renamed = parse_source(&output, Dialect::Lua51).unwrap();

        prop_assert_eq!(bindings(&renamed), bindings(&original));
    }
}
