//! Fresh identifier generation
//!
//! Every name the inliner introduces has the shape `<base>$inline_<id>`,
//! where `<id>` comes from a pluggable [`NameIdSupplier`]. A candidate is
//! rejected if any identifier already spelled in the program uses it, or if
//! it is bound anywhere in the scope chain of the insertion point.

use kiln_ast::{walk_stmts, Expr, NodeRef, Program, ScopeTree, Stmt, Walk};
use kiln_types::ScopeId;
use std::collections::HashSet;

/// Source of unique id suffixes for fresh names.
///
/// Implementations must never return the same id twice.
pub trait NameIdSupplier {
    fn next_id(&mut self) -> String;
}

/// Counter-backed supplier: `0`, `1`, `2`, ...
#[derive(Debug, Default, Clone)]
pub struct UniqueIdSupplier {
    next: u64,
}

impl UniqueIdSupplier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NameIdSupplier for UniqueIdSupplier {
    fn next_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }
}

/// Marker between a base name and its id
pub const INLINE_MARKER: &str = "$inline_";

/// Allocates collision-free identifiers for one pass run
pub struct FreshNames {
    supplier: Box<dyn NameIdSupplier>,
    reserved: HashSet<String>,
}

impl FreshNames {
    pub fn new(supplier: Box<dyn NameIdSupplier>) -> Self {
        Self {
            supplier,
            reserved: HashSet::new(),
        }
    }

    /// Reserve every name spelled anywhere in `program`
    pub fn reserve_program(&mut self, program: &Program) {
        for unit in &program.units {
            self.reserved.extend(spelled_names(&unit.body));
        }
    }

    pub fn reserve(&mut self, name: impl Into<String>) {
        self.reserved.insert(name.into());
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// A name derived from `base` that is unused in the program and unbound
    /// as seen from `scope`. The result is reserved before returning.
    pub fn fresh(&mut self, base: &str, scopes: &ScopeTree, scope: ScopeId) -> String {
        loop {
            let candidate = format!("{}{}{}", base, INLINE_MARKER, self.supplier.next_id());
            if self.reserved.contains(&candidate) || scopes.is_bound_in_chain(scope, &candidate) {
                continue;
            }
            self.reserved.insert(candidate.clone());
            return candidate;
        }
    }
}

/// Every identifier, declared name, parameter and label in `stmts`
pub fn spelled_names(stmts: &[Stmt]) -> HashSet<String> {
    let mut names = HashSet::new();
    walk_stmts(stmts, &mut |node| {
        match node {
            NodeRef::Stmt(Stmt::Var { name, .. }) => {
                names.insert(name.clone());
            }
            NodeRef::Stmt(Stmt::Function(func)) => {
                names.extend(func.name.iter().cloned());
                names.extend(func.params.iter().cloned());
            }
            NodeRef::Stmt(Stmt::Labeled { label, .. }) => {
                names.insert(label.clone());
            }
            NodeRef::Expr(Expr::Ident(name)) => {
                names.insert(name.clone());
            }
            NodeRef::Expr(Expr::Function(func)) => {
                names.extend(func.name.iter().cloned());
                names.extend(func.params.iter().cloned());
            }
            _ => {}
        }
        Walk::Continue
    });
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ast::builder::*;
    use kiln_ast::{resolve_scopes, DeclKind};

    /// Replays a fixed list of ids
    struct Scripted(Vec<&'static str>);

    impl NameIdSupplier for Scripted {
        fn next_id(&mut self) -> String {
            self.0.remove(0).to_string()
        }
    }

    #[test]
    fn test_unique_id_supplier_counts_up() {
        let mut supplier = UniqueIdSupplier::new();
        assert_eq!(supplier.next_id(), "0");
        assert_eq!(supplier.next_id(), "1");
    }

    #[test]
    fn test_fresh_skips_names_spelled_in_program() {
        let mut program = Program::new();
        let unit = program.add_unit("main.js", vec![expr_stmt(ident("t$inline_0"))]);
        let scopes = resolve_scopes(&program);
        let script = scopes.script_scope(unit).unwrap();

        let mut names = FreshNames::new(Box::new(UniqueIdSupplier::new()));
        names.reserve_program(&program);
        assert_eq!(names.fresh("t", &scopes, script), "t$inline_1");
        assert_eq!(names.fresh("t", &scopes, script), "t$inline_2");
    }

    #[test]
    fn test_fresh_skips_names_bound_in_scope_chain() {
        let mut program = Program::new();
        let unit = program.add_unit("main.js", vec![]);
        let mut scopes = resolve_scopes(&program);
        let script = scopes.script_scope(unit).unwrap();
        scopes.declare(scopes.global(), "x$inline_a", DeclKind::Var);

        let mut names = FreshNames::new(Box::new(Scripted(vec!["a", "b"])));
        assert_eq!(names.fresh("x", &scopes, script), "x$inline_b");
        assert!(names.is_reserved("x$inline_b"));
    }

    #[test]
    fn test_spelled_names_include_params_and_labels() {
        let stmts = vec![
            function_decl("f", &["p"], vec![]),
            Stmt::Labeled {
                label: "outer".to_string(),
                body: vec![Stmt::Break(Some("outer".to_string()))],
            },
        ];
        let names = spelled_names(&stmts);
        for expected in ["f", "p", "outer"] {
            assert!(names.contains(expected), "missing {}", expected);
        }
    }
}
