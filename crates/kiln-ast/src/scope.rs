//! Lexical scope resolution
//!
//! Builds a [`ScopeTree`] for a program: one global scope, one script scope
//! per source unit, and one function scope per function literal. Block
//! scoping is flattened into the enclosing function, which over-approximates
//! the set of names live at any point.

use crate::ir::{Expr, FunctionLit, Program, Stmt, VarKind};
use kiln_types::{NodeId, ScopeId, UnitId};
use std::collections::HashMap;

/// What opened a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    /// Top level of one source unit
    Script(UnitId),
    /// Body of one function literal
    Function(NodeId),
}

/// How a name was introduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Param,
    Var,
    Let,
    Const,
    Function,
}

impl From<VarKind> for DeclKind {
    fn from(kind: VarKind) -> Self {
        match kind {
            VarKind::Var => DeclKind::Var,
            VarKind::Let => DeclKind::Let,
            VarKind::Const => DeclKind::Const,
        }
    }
}

/// A lexical binding environment
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// `None` only for the global scope
    pub parent: Option<ScopeId>,
    pub bindings: HashMap<String, DeclKind>,
}

/// Every scope of a program, indexed by id
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    by_function: HashMap<NodeId, ScopeId>,
    by_unit: HashMap<UnitId, ScopeId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// A tree holding only the global scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                id: 0,
                kind: ScopeKind::Global,
                parent: None,
                bindings: HashMap::new(),
            }],
            by_function: HashMap::new(),
            by_unit: HashMap::new(),
        }
    }

    pub fn global(&self) -> ScopeId {
        0
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).and_then(|s| s.parent)
    }

    pub fn scope_of_function(&self, id: NodeId) -> Option<ScopeId> {
        self.by_function.get(&id).copied()
    }

    pub fn script_scope(&self, unit: UnitId) -> Option<ScopeId> {
        self.by_unit.get(&unit).copied()
    }

    /// Open a new scope under `parent`
    pub fn push_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = self.scopes.len() as ScopeId;
        self.scopes.push(Scope {
            id,
            kind,
            parent: Some(parent),
            bindings: HashMap::new(),
        });
        match kind {
            ScopeKind::Function(node) => {
                self.by_function.insert(node, id);
            }
            ScopeKind::Script(unit) => {
                self.by_unit.insert(unit, id);
            }
            ScopeKind::Global => {}
        }
        id
    }

    /// Bind `name` in `scope`. An existing binding keeps its first kind.
    pub fn declare(&mut self, scope: ScopeId, name: impl Into<String>, kind: DeclKind) {
        if let Some(s) = self.scopes.get_mut(scope as usize) {
            s.bindings.entry(name.into()).or_insert(kind);
        }
    }

    /// `scope` followed by each of its ancestors up to the global scope
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(self.get(scope), move |s| s.parent.and_then(|p| self.get(p)))
    }

    /// The scope that binds `name` as seen from `scope`, if any
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Scope> {
        self.ancestors(scope).find(|s| s.bindings.contains_key(name))
    }

    pub fn is_bound_in_chain(&self, scope: ScopeId, name: &str) -> bool {
        self.lookup(scope, name).is_some()
    }

    /// True if `name` resolves to a function-level binding rather than a
    /// script-level or global one
    pub fn is_locally_bound(&self, scope: ScopeId, name: &str) -> bool {
        matches!(
            self.lookup(scope, name).map(|s| s.kind),
            Some(ScopeKind::Function(_))
        )
    }

    /// Bind the declarations of statements spliced into `scope` after
    /// resolution. Function literals that already have a scope keep it.
    pub fn declare_spliced(&mut self, scope: ScopeId, stmts: &[Stmt]) {
        declare_stmts(self, scope, stmts);
    }

    /// The nearest function or script scope at or above `scope`
    pub fn enclosing_change_scope(&self, scope: ScopeId) -> ScopeId {
        self.ancestors(scope)
            .find(|s| !matches!(s.kind, ScopeKind::Global))
            .map_or(scope, |s| s.id)
    }
}

/// Resolve the scopes of a whole program
pub fn resolve_scopes(program: &Program) -> ScopeTree {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    for unit in &program.units {
        let script = tree.push_scope(global, ScopeKind::Script(unit.id));
        declare_stmts(&mut tree, script, &unit.body);
    }
    tree
}

fn declare_function(tree: &mut ScopeTree, parent: ScopeId, func: &FunctionLit, is_expression: bool) {
    if tree.by_function.contains_key(&func.id) {
        return;
    }
    let scope = tree.push_scope(parent, ScopeKind::Function(func.id));
    // A named function expression binds its own name inside its body
    if is_expression {
        if let Some(name) = &func.name {
            tree.declare(scope, name.clone(), DeclKind::Function);
        }
    }
    for param in &func.params {
        tree.declare(scope, param.clone(), DeclKind::Param);
    }
    declare_stmts(tree, scope, &func.body);
}

fn declare_stmts(tree: &mut ScopeTree, scope: ScopeId, stmts: &[Stmt]) {
    for stmt in stmts {
        declare_stmt(tree, scope, stmt);
    }
}

fn declare_stmt(tree: &mut ScopeTree, scope: ScopeId, stmt: &Stmt) {
    match stmt {
        Stmt::Var { kind, name, init } => {
            tree.declare(scope, name.clone(), DeclKind::from(*kind));
            if let Some(init) = init {
                declare_expr(tree, scope, init);
            }
        }
        Stmt::Function(func) => {
            if let Some(name) = &func.name {
                tree.declare(scope, name.clone(), DeclKind::Function);
            }
            declare_function(tree, scope, func, false);
        }
        Stmt::Expr(expr) | Stmt::Throw(expr) | Stmt::Return(Some(expr)) => {
            declare_expr(tree, scope, expr)
        }
        Stmt::Return(None) | Stmt::Break(_) | Stmt::Continue(_) => {}
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            declare_expr(tree, scope, condition);
            declare_stmts(tree, scope, then_branch);
            if let Some(else_b) = else_branch {
                declare_stmts(tree, scope, else_b);
            }
        }
        Stmt::While { condition, body } => {
            declare_expr(tree, scope, condition);
            declare_stmts(tree, scope, body);
        }
        Stmt::Block(body) | Stmt::Labeled { body, .. } => declare_stmts(tree, scope, body),
    }
}

fn declare_expr(tree: &mut ScopeTree, scope: ScopeId, expr: &Expr) {
    match expr {
        Expr::Function(func) => declare_function(tree, scope, func, true),
        Expr::Undefined
        | Expr::Null
        | Expr::Bool(_)
        | Expr::Number(_)
        | Expr::String(_)
        | Expr::Ident(_)
        | Expr::This => {}
        Expr::Member { object, .. } => declare_expr(tree, scope, object),
        Expr::Index { object, index } => {
            declare_expr(tree, scope, object);
            declare_expr(tree, scope, index);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            declare_expr(tree, scope, callee);
            for arg in args {
                declare_expr(tree, scope, arg);
            }
        }
        Expr::Assign { target, value, .. } => {
            declare_expr(tree, scope, target);
            declare_expr(tree, scope, value);
        }
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            declare_expr(tree, scope, left);
            declare_expr(tree, scope, right);
        }
        Expr::Unary { operand, .. } => declare_expr(tree, scope, operand),
        Expr::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            declare_expr(tree, scope, condition);
            declare_expr(tree, scope, then_expr);
            declare_expr(tree, scope, else_expr);
        }
        Expr::Sequence(items) | Expr::Array(items) => {
            for item in items {
                declare_expr(tree, scope, item);
            }
        }
    }
}
