//! Function-local analyses used to decide inlineability

use kiln_ast::{any_node, Expr, FunctionLit, NodeRef, Stmt};
use kiln_types::QualifiedName;
use std::collections::{BTreeSet, HashSet};

/// Names bound in a function's own scope: parameters, `var`/`let`/`const`
/// declarations and function declarations, in first-declaration order.
/// Nested function bodies are not entered.
pub fn declared_names(params: &[String], body: &[Stmt]) -> Vec<String> {
    fn walk(stmts: &[Stmt], out: &mut Vec<String>, seen: &mut HashSet<String>) {
        for stmt in stmts {
            match stmt {
                Stmt::Var { name, .. } => {
                    if seen.insert(name.clone()) {
                        out.push(name.clone());
                    }
                }
                Stmt::Function(func) => {
                    if let Some(name) = &func.name {
                        if seen.insert(name.clone()) {
                            out.push(name.clone());
                        }
                    }
                }
                Stmt::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    walk(then_branch, out, seen);
                    if let Some(else_b) = else_branch {
                        walk(else_b, out, seen);
                    }
                }
                Stmt::While { body, .. } | Stmt::Block(body) | Stmt::Labeled { body, .. } => {
                    walk(body, out, seen)
                }
                _ => {}
            }
        }
    }

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for param in params {
        if seen.insert(param.clone()) {
            out.push(param.clone());
        }
    }
    walk(body, &mut out, &mut seen);
    out
}

/// Parameters that are listed twice or redeclared in the body
pub fn redeclared_params(func: &FunctionLit) -> Vec<String> {
    let mut out = Vec::new();
    for (i, param) in func.params.iter().enumerate() {
        if func.params[..i].contains(param) && !out.contains(param) {
            out.push(param.clone());
        }
    }
    for name in declared_names(&[], &func.body) {
        if func.params.contains(&name) && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Names declared with `var` or as function declarations in the body,
/// excluding nested functions
pub fn hoisted_locals(body: &[Stmt]) -> HashSet<String> {
    let mut out = HashSet::new();
    any_node(body, false, |node| {
        match node {
            NodeRef::Stmt(Stmt::Var {
                kind: kiln_ast::VarKind::Var,
                name,
                ..
            }) => {
                out.insert(name.clone());
            }
            NodeRef::Stmt(Stmt::Function(func)) => {
                if let Some(name) = &func.name {
                    out.insert(name.clone());
                }
            }
            _ => {}
        }
        false
    });
    out
}

/// Identifiers referenced in a function that are not bound by the function
/// itself or by any function nested inside it
pub fn free_variables(func: &FunctionLit) -> BTreeSet<String> {
    let mut free = FreeVars::default();
    free.function(func.name.as_deref(), &func.params, &func.body);
    free.free
}

/// Free variables of every function literal nested directly or indirectly
/// in `body`, as seen from the enclosing function
pub fn captured_by_nested_functions(body: &[Stmt]) -> BTreeSet<String> {
    let mut captured = BTreeSet::new();
    any_node(body, false, |node| {
        let func = match node {
            NodeRef::Stmt(Stmt::Function(func)) => Some(func),
            NodeRef::Expr(Expr::Function(func)) => Some(func.as_ref()),
            _ => None,
        };
        if let Some(func) = func {
            captured.extend(free_variables(func));
        }
        false
    });
    captured
}

#[derive(Default)]
struct FreeVars {
    frames: Vec<HashSet<String>>,
    free: BTreeSet<String>,
}

impl FreeVars {
    fn function(&mut self, name: Option<&str>, params: &[String], body: &[Stmt]) {
        let mut frame: HashSet<String> = declared_names(params, body).into_iter().collect();
        if let Some(name) = name {
            frame.insert(name.to_string());
        }
        self.frames.push(frame);
        self.stmts(body);
        self.frames.pop();
    }

    fn reference(&mut self, name: &str) {
        if !self.frames.iter().any(|f| f.contains(name)) {
            self.free.insert(name.to_string());
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var { init, .. } => {
                if let Some(init) = init {
                    self.expr(init);
                }
            }
            Stmt::Function(func) => self.function(None, &func.params, &func.body),
            Stmt::Expr(expr) | Stmt::Throw(expr) | Stmt::Return(Some(expr)) => self.expr(expr),
            Stmt::Return(None) | Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.stmts(then_branch);
                if let Some(else_b) = else_branch {
                    self.stmts(else_b);
                }
            }
            Stmt::While { condition, body } => {
                self.expr(condition);
                self.stmts(body);
            }
            Stmt::Block(body) | Stmt::Labeled { body, .. } => self.stmts(body),
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => self.reference(name),
            Expr::Undefined
            | Expr::Null
            | Expr::Bool(_)
            | Expr::Number(_)
            | Expr::String(_)
            | Expr::This => {}
            Expr::Member { object, .. } => self.expr(object),
            Expr::Index { object, index } => {
                self.expr(object);
                self.expr(index);
            }
            Expr::Call { callee, args } | Expr::New { callee, args } => {
                self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
            }
            Expr::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(condition);
                self.expr(then_expr);
                self.expr(else_expr);
            }
            Expr::Sequence(items) | Expr::Array(items) => {
                for item in items {
                    self.expr(item);
                }
            }
            Expr::Function(func) => self.function(func.name.as_deref(), &func.params, &func.body),
        }
    }
}

/// `this` or `arguments` used in the function's own body (nested function
/// literals have their own and are not inspected)
pub fn uses_this(body: &[Stmt]) -> bool {
    any_node(body, false, |node| matches!(node, NodeRef::Expr(Expr::This)))
}

pub fn uses_arguments(body: &[Stmt]) -> bool {
    any_node(body, false, |node| {
        matches!(node, NodeRef::Expr(Expr::Ident(name)) if name == "arguments")
    })
}

/// True if the body calls `name` anywhere, nested functions included
pub fn calls_qualified(body: &[Stmt], name: &QualifiedName) -> bool {
    any_node(body, true, |node| match node {
        NodeRef::Expr(Expr::Call { callee, .. }) => callee.qualified_name().as_ref() == Some(name),
        _ => false,
    })
}

pub fn contains_function(expr: &Expr) -> bool {
    let mut found = false;
    kiln_ast::walk_expr(expr, &mut |node| {
        if matches!(node, NodeRef::Expr(Expr::Function(_))) {
            found = true;
            return kiln_ast::Walk::Prune;
        }
        kiln_ast::Walk::Continue
    });
    found
}

/// True if `expr` assigns to any of the plain identifiers in `names`
pub fn assigns_any(expr: &Expr, names: &[String]) -> bool {
    let mut found = false;
    kiln_ast::walk_expr(expr, &mut |node| {
        if let NodeRef::Expr(Expr::Assign { target, .. }) = node {
            if let Expr::Ident(name) = target.as_ref() {
                if names.contains(name) {
                    found = true;
                }
            }
        }
        kiln_ast::Walk::Continue
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ast::builder::*;

    #[test]
    fn test_declared_names_in_order() {
        let body = vec![
            var("t", Some(ident("x"))),
            if_(ident("c"), vec![let_("u", None)], Some(vec![var("t", None)])),
            function_decl("helper", &["z"], vec![var("inner", None)]),
        ];
        assert_eq!(
            declared_names(&["x".to_string()], &body),
            vec!["x", "t", "u", "helper"]
        );
    }

    #[test]
    fn test_free_variables_skip_bound_names() {
        let func = function_lit(
            &["x"],
            vec![
                var("t", Some(add(ident("x"), ident("g")))),
                ret(call(
                    function_expr(&["y"], vec![ret(add(ident("y"), ident("t")))]),
                    vec![qualified("Arrays.$create")],
                )),
            ],
        );
        let free: Vec<String> = free_variables(&func).into_iter().collect();
        assert_eq!(free, vec!["Arrays", "g"]);
    }

    #[test]
    fn test_captured_by_nested_functions() {
        let body = vec![
            var("t", Some(num(1.0))),
            ret(function_expr(&[], vec![ret(add(ident("t"), ident("p")))])),
        ];
        let captured: Vec<String> = captured_by_nested_functions(&body).into_iter().collect();
        assert_eq!(captured, vec!["p", "t"]);
        assert!(hoisted_locals(&body).contains("t"));
    }

    #[test]
    fn test_this_and_arguments_stop_at_nested_functions() {
        let body = vec![ret(function_expr(&[], vec![ret(this())]))];
        assert!(!uses_this(&body));
        assert!(uses_this(&[ret(member(this(), "x"))]));
        assert!(uses_arguments(&[ret(member(ident("arguments"), "length"))]));
    }

    #[test]
    fn test_calls_qualified() {
        let name: QualifiedName = "A.f".parse().unwrap();
        let body = vec![ret(call_qualified("A.f", vec![num(1.0)]))];
        assert!(calls_qualified(&body, &name));
        assert!(!calls_qualified(&[ret(call_qualified("A.g", vec![]))], &name));
    }

    #[test]
    fn test_redeclared_params() {
        let func = function_lit(&["x", "y"], vec![var("x", Some(num(1.0))), ret(ident("y"))]);
        assert_eq!(redeclared_params(&func), vec!["x"]);
        let dup = function_lit(&["a", "a"], vec![]);
        assert_eq!(redeclared_params(&dup), vec!["a"]);
    }
}
