//! AST node definitions
//!
//!     Statements and expressions are tagged enums wrapped in a struct that carries the source
//!     [`Range`]. Nodes created by transform steps use `Range::default()`.
//!
//!     Identifiers are never stored as text in the tree. Every name position holds a [`VarId`]
//!     into the chunk's [`ScopeTree`], so renaming a variable renames every use at once. Field
//!     and method names (`a.b`, `a:c()`) are plain strings since they are not bindings.

use super::range::Range;
use super::scope::{ScopeId, ScopeTree, VarId};
use serde::Serialize;

/// The root of a parsed program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub body: Block,
    pub scopes: ScopeTree,
    pub global_scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub scope: ScopeId,
    pub statements: Vec<Stmt>,
    pub location: Range,
}

impl Block {
    pub fn new(scope: ScopeId, statements: Vec<Stmt>) -> Self {
        Self {
            scope,
            statements,
            location: Range::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: Range,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            location: Range::default(),
        }
    }

    pub fn at(kind: StmtKind, location: Range) -> Self {
        Self { kind, location }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfClause {
    pub condition: Expr,
    pub body: Block,
}

/// `function a.b.c:m()` names: a base variable, field path and optional method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionName {
    pub base: VarId,
    pub fields: Vec<String>,
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    Do(Block),
    Local {
        variables: Vec<VarId>,
        values: Vec<Expr>,
    },
    LocalFunction {
        variable: VarId,
        function: FunctionBody,
    },
    Assignment {
        targets: Vec<Expr>,
        values: Vec<Expr>,
    },
    CompoundAssignment {
        op: CompoundOp,
        target: Expr,
        value: Expr,
    },
    If {
        clauses: Vec<IfClause>,
        else_block: Option<Block>,
    },
    While {
        condition: Expr,
        body: Block,
    },
    Repeat {
        body: Block,
        condition: Expr,
    },
    NumericFor {
        variable: VarId,
        start: Expr,
        limit: Expr,
        step: Option<Expr>,
        body: Block,
    },
    GenericFor {
        variables: Vec<VarId>,
        iterators: Vec<Expr>,
        body: Block,
    },
    /// `function name() end`. For methods the body's first parameter is the implicit `self`.
    Function {
        target: FunctionName,
        function: FunctionBody,
    },
    Return(Vec<Expr>),
    Break,
    Continue,
    /// A function or method call used as a statement
    Call(Expr),
    /// `goto name`, resolved to its label when the enclosing block closes
    Goto {
        name: String,
        label: Option<VarId>,
    },
    Label(VarId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionBody {
    pub parameters: Vec<VarId>,
    pub is_vararg: bool,
    /// The body block. Its scope is the function scope holding the parameters.
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableField {
    /// `{ value }`
    Positional(Expr),
    /// `{ name = value }`
    Named(String, Expr),
    /// `{ [key] = value }`
    Keyed(Expr, Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    Nil,
    True,
    False,
    Number(f64),
    String(Vec<u8>),
    Vararg,
    Variable(VarId),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        arguments: Vec<Expr>,
    },
    Index {
        object: Box<Expr>,
        key: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        name: String,
    },
    Table(Vec<TableField>),
    Function(Box<FunctionBody>),
    /// `(expr)`, kept because it truncates multiple results
    Paren(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            location: Range::default(),
        }
    }

    pub fn at(kind: ExprKind, location: Range) -> Self {
        Self { kind, location }
    }

    pub fn number(value: f64) -> Self {
        Self::new(ExprKind::Number(value))
    }

    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(ExprKind::String(bytes.into()))
    }

    pub fn variable(id: VarId) -> Self {
        Self::new(ExprKind::Variable(id))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn call(callee: Expr, arguments: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: Box::new(callee),
            arguments,
        })
    }

    pub fn index(object: Expr, key: Expr) -> Self {
        Self::new(ExprKind::Index {
            object: Box::new(object),
            key: Box::new(key),
        })
    }

    pub fn paren(inner: Expr) -> Self {
        Self::new(ExprKind::Paren(Box::new(inner)))
    }

    /// Prefix expressions may be called or indexed without parentheses.
    pub fn is_prefix(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Variable(_)
                | ExprKind::Call { .. }
                | ExprKind::MethodCall { .. }
                | ExprKind::Index { .. }
                | ExprKind::Member { .. }
                | ExprKind::Paren(_)
        )
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, ExprKind::Call { .. } | ExprKind::MethodCall { .. })
    }

    /// Valid on the left of `=`.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Variable(_) | ExprKind::Index { .. } | ExprKind::Member { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Or,
    And,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// Binding power of unary operators.
pub const UNARY_PRIORITY: u8 = 8;

impl BinaryOp {
    /// Left and right binding power.
    pub fn priority(self) -> (u8, u8) {
        match self {
            BinaryOp::Or => (1, 1),
            BinaryOp::And => (2, 2),
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Ne
            | BinaryOp::Eq => (3, 3),
            BinaryOp::Concat => (5, 4),
            BinaryOp::Add | BinaryOp::Sub => (6, 6),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (7, 7),
            BinaryOp::Pow => (10, 9),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Ne => "~=",
            BinaryOp::Eq => "==",
            BinaryOp::Concat => "..",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Not,
    Len,
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Len => "#",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompoundOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
}

impl CompoundOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompoundOp::Add => "+=",
            CompoundOp::Sub => "-=",
            CompoundOp::Mul => "*=",
            CompoundOp::Div => "/=",
            CompoundOp::Mod => "%=",
            CompoundOp::Pow => "^=",
            CompoundOp::Concat => "..=",
        }
    }

    pub fn binary(self) -> BinaryOp {
        match self {
            CompoundOp::Add => BinaryOp::Add,
            CompoundOp::Sub => BinaryOp::Sub,
            CompoundOp::Mul => BinaryOp::Mul,
            CompoundOp::Div => BinaryOp::Div,
            CompoundOp::Mod => BinaryOp::Mod,
            CompoundOp::Pow => BinaryOp::Pow,
            CompoundOp::Concat => BinaryOp::Concat,
        }
    }
}
