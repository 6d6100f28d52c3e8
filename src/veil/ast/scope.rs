//! Scope tree and variable arena
//!
//!     Scopes and variables live in one [`ScopeTree`] owned by the chunk. Links between them
//!     are plain indices ([`ScopeId`], [`VarId`]), so the tree has no reference cycles and the
//!     whole structure can be serialized for debugging.
//!
//!     Index 0 is always the global scope. Names that resolve nowhere else become variables of
//!     the global scope on first reference, so every identifier in a parsed chunk points at
//!     exactly one [`Variable`].

use super::range::Range;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
    Loop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VariableKind {
    Local,
    Parameter,
    /// A local or parameter referenced from a nested function
    Upvalue,
    Global,
    Label,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Variables in declaration order
    pub variables: Vec<VarId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub id: VarId,
    pub declared_name: String,
    /// Current name. Only the renamer changes it.
    pub name: String,
    kind: VariableKind,
    pub scope: ScopeId,
    pub references: Vec<Range>,
    pub captured: bool,
}

impl Variable {
    /// The variable kind, reporting captured locals and parameters as upvalues.
    pub fn kind(&self) -> VariableKind {
        match self.kind {
            VariableKind::Local | VariableKind::Parameter if self.captured => VariableKind::Upvalue,
            kind => kind,
        }
    }

    pub fn is_global(&self) -> bool {
        self.kind == VariableKind::Global
    }

    pub fn is_label(&self) -> bool {
        self.kind == VariableKind::Label
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    variables: Vec<Variable>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// A tree holding only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                id: ScopeId(0),
                kind: ScopeKind::Global,
                parent: None,
                children: Vec::new(),
                variables: Vec::new(),
            }],
            variables: Vec::new(),
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn variable_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.variables[id.0]
    }

    pub fn get_scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    pub fn get_variable(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut [Variable] {
        &mut self.variables
    }

    pub fn add_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            id,
            kind,
            parent: Some(parent),
            children: Vec::new(),
            variables: Vec::new(),
        });
        self.scopes[parent.0].children.push(id);
        id
    }

    /// Move `scope` (and its subtree) under `new_parent`.
    pub fn reparent(&mut self, scope: ScopeId, new_parent: ScopeId) {
        if let Some(old) = self.scopes[scope.0].parent {
            self.scopes[old.0].children.retain(|child| *child != scope);
        }
        self.scopes[scope.0].parent = Some(new_parent);
        self.scopes[new_parent.0].children.push(scope);
    }

    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: VariableKind,
        location: Range,
    ) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            id,
            declared_name: name.to_string(),
            name: name.to_string(),
            kind,
            scope,
            references: vec![location],
            captured: false,
        });
        self.scopes[scope.0].variables.push(id);
        id
    }

    /// Find the innermost non-label variable called `name` visible from `scope`.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        self.resolve_with_cutoff(scope, name, None)
    }

    /// Like [`resolve`](Self::resolve), but only the first `hidden.1` variables of scope
    /// `hidden.0` are ignored. Used when parsing code that is inserted ahead of existing
    /// declarations.
    pub fn resolve_with_cutoff(
        &self,
        scope: ScopeId,
        name: &str,
        hidden: Option<(ScopeId, usize)>,
    ) -> Option<VarId> {
        for current in self.ancestors(scope) {
            let vars = &self.scopes[current.0].variables;
            let skip = match hidden {
                Some((hidden_scope, count)) if hidden_scope == current => count,
                _ => 0,
            };
            let found = vars[skip.min(vars.len())..].iter().rev().find(|id| {
                let var = &self.variables[id.0];
                !var.is_label() && var.declared_name == name
            });
            if let Some(id) = found {
                return Some(*id);
            }
        }
        None
    }

    /// Find a label called `name` visible from `scope` inside the same function.
    pub fn resolve_label(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        for current in self.ancestors(scope) {
            let found = self.scopes[current.0].variables.iter().find(|id| {
                let var = &self.variables[id.0];
                var.is_label() && var.declared_name == name
            });
            if found.is_some() {
                return found.copied();
            }
            if matches!(self.scopes[current.0].kind, ScopeKind::Function | ScopeKind::Global) {
                break;
            }
        }
        None
    }

    /// The global variable called `name`, created if it does not exist yet.
    pub fn global_variable(&mut self, name: &str) -> VarId {
        let global = self.global();
        let existing = self.scopes[global.0]
            .variables
            .iter()
            .find(|id| self.variables[id.0].declared_name == name)
            .copied();
        match existing {
            Some(id) => id,
            None => {
                let id = self.declare(global, name, VariableKind::Global, Range::default());
                self.variables[id.0].references.clear();
                id
            }
        }
    }

    pub fn resolve_or_global(&mut self, scope: ScopeId, name: &str) -> VarId {
        match self.resolve(scope, name) {
            Some(id) => id,
            None => self.global_variable(name),
        }
    }

    /// Record a reference to `var` made from `from`.
    pub fn reference(&mut self, var: VarId, from: ScopeId, location: Range) {
        let owner = self.variables[var.0].scope;
        let crosses_function = self.function_of(owner) != self.function_of(from);
        let variable = &mut self.variables[var.0];
        variable.references.push(location);
        if crosses_function
            && matches!(variable.kind, VariableKind::Local | VariableKind::Parameter)
        {
            variable.captured = true;
        }
    }

    /// `scope` followed by each of its ancestors up to the global scope.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |id| self.scopes[id.0].parent)
    }

    /// The nearest enclosing function (or global) scope.
    pub fn function_of(&self, scope: ScopeId) -> ScopeId {
        self.ancestors(scope)
            .find(|id| {
                matches!(
                    self.scopes[id.0].kind,
                    ScopeKind::Function | ScopeKind::Global
                )
            })
            .unwrap_or(ScopeId(0))
    }

    pub fn depth(&self, scope: ScopeId) -> usize {
        self.ancestors(scope).count() - 1
    }

    /// All scopes in pre-order, children in creation order.
    pub fn preorder(&self) -> Vec<ScopeId> {
        let mut order = Vec::with_capacity(self.scopes.len());
        let mut stack = vec![self.global()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.scopes[id.0].children.iter().rev());
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_function() -> (ScopeTree, ScopeId, ScopeId) {
        let mut tree = ScopeTree::new();
        let top = tree.add_scope(tree.global(), ScopeKind::Function);
        let inner = tree.add_scope(top, ScopeKind::Function);
        (tree, top, inner)
    }

    #[test]
    fn test_resolve_prefers_latest_declaration() {
        let (mut tree, top, _) = tree_with_function();
        let first = tree.declare(top, "x", VariableKind::Local, Range::default());
        let second = tree.declare(top, "x", VariableKind::Local, Range::default());

        assert_ne!(first, second);
        assert_eq!(tree.resolve(top, "x"), Some(second));
    }

    #[test]
    fn test_unresolved_name_becomes_single_global() {
        let (mut tree, top, inner) = tree_with_function();
        let a = tree.resolve_or_global(top, "print");
        let b = tree.resolve_or_global(inner, "print");

        assert_eq!(a, b);
        assert_eq!(tree.variable(a).kind(), VariableKind::Global);
        assert_eq!(tree.variable(a).scope, tree.global());
    }

    #[test]
    fn test_reference_from_nested_function_marks_upvalue() {
        let (mut tree, top, inner) = tree_with_function();
        let x = tree.declare(top, "x", VariableKind::Local, Range::default());
        assert_eq!(tree.variable(x).kind(), VariableKind::Local);

        tree.reference(x, top, Range::default());
        assert_eq!(tree.variable(x).kind(), VariableKind::Local);

        tree.reference(x, inner, Range::default());
        assert_eq!(tree.variable(x).kind(), VariableKind::Upvalue);
    }

    #[test]
    fn test_cutoff_hides_existing_variables() {
        let (mut tree, top, _) = tree_with_function();
        tree.declare(top, "string", VariableKind::Local, Range::default());

        assert!(tree.resolve(top, "string").is_some());
        assert!(tree.resolve_with_cutoff(top, "string", Some((top, 1))).is_none());
    }

    #[test]
    fn test_labels_do_not_cross_functions() {
        let (mut tree, top, inner) = tree_with_function();
        tree.declare(top, "done", VariableKind::Label, Range::default());

        assert!(tree.resolve_label(top, "done").is_some());
        assert!(tree.resolve_label(inner, "done").is_none());
        assert!(tree.resolve(top, "done").is_none());
    }

    #[test]
    fn test_reparent_keeps_preorder_consistent() {
        let (mut tree, top, inner) = tree_with_function();
        let wrapper = tree.add_scope(tree.global(), ScopeKind::Function);
        tree.reparent(top, wrapper);

        assert_eq!(tree.scope(top).parent, Some(wrapper));
        assert_eq!(tree.preorder(), vec![ScopeId(0), wrapper, top, inner]);
        assert_eq!(tree.depth(inner), 3);
    }
}
