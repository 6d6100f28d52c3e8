//! AST definitions and utilities for Lua chunks
//!
//!     The parser produces a [`Chunk`]: the body block, the [`ScopeTree`] arena and the handle
//!     of the global scope. The tree is scope-annotated from the start, every block knows its
//!     scope and every identifier is a [`VarId`]. Transform steps consume a chunk by value and
//!     return a new one; the renamer only ever writes `Variable::name`.
//!
//! ## How location tracking works
//!
//!     The lexer produces byte spans and converts them to [`Range`] values once, with
//!     [`SourceLocation`]. Statements and expressions carry the range of the text they were
//!     parsed from. Nodes built by steps use `Range::default()`, there is no source text for
//!     them.
//!
//! ## Modules
//!
//!     - [`range`]: positions and ranges
//!     - [`scope`]: the scope and variable arena
//!     - [`nodes`]: statements, expressions and operators
//!     - [`visit`]: read-only and rewriting walks, integrity check, footprint estimate

pub mod nodes;
pub mod range;
pub mod scope;
pub mod visit;

pub use nodes::{
    BinaryOp, Block, Chunk, CompoundOp, Expr, ExprKind, FunctionBody, FunctionName, IfClause,
    Stmt, StmtKind, TableField, UnaryOp, UNARY_PRIORITY,
};
pub use range::{Position, Range, SourceLocation};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree, VarId, Variable, VariableKind};
pub use visit::{check_integrity, estimate_footprint, for_each_expr_mut, walk_block, Visitor};
