//! Read-only pre-order traversal with explicit pruning
//!
//! The visiting closure sees every node before its children and decides
//! whether to descend. Dispatch is a closed match over node kinds; there is
//! no visitor trait.

use crate::ir::{Expr, Stmt};

/// A borrowed node of either kind
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

/// Decision returned by the visiting closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Visit the node's children
    Continue,
    /// Skip the node's children
    Prune,
}

pub fn walk_stmts<'a, F>(stmts: &'a [Stmt], f: &mut F)
where
    F: FnMut(NodeRef<'a>) -> Walk,
{
    for stmt in stmts {
        walk_stmt(stmt, f);
    }
}

pub fn walk_stmt<'a, F>(stmt: &'a Stmt, f: &mut F)
where
    F: FnMut(NodeRef<'a>) -> Walk,
{
    if f(NodeRef::Stmt(stmt)) == Walk::Prune {
        return;
    }
    match stmt {
        Stmt::Var { init, .. } => {
            if let Some(init) = init {
                walk_expr(init, f);
            }
        }
        Stmt::Function(func) => walk_stmts(&func.body, f),
        Stmt::Expr(expr) | Stmt::Throw(expr) | Stmt::Return(Some(expr)) => walk_expr(expr, f),
        Stmt::Return(None) | Stmt::Break(_) | Stmt::Continue(_) => {}
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            walk_expr(condition, f);
            walk_stmts(then_branch, f);
            if let Some(else_b) = else_branch {
                walk_stmts(else_b, f);
            }
        }
        Stmt::While { condition, body } => {
            walk_expr(condition, f);
            walk_stmts(body, f);
        }
        Stmt::Block(body) | Stmt::Labeled { body, .. } => walk_stmts(body, f),
    }
}

pub fn walk_expr<'a, F>(expr: &'a Expr, f: &mut F)
where
    F: FnMut(NodeRef<'a>) -> Walk,
{
    if f(NodeRef::Expr(expr)) == Walk::Prune {
        return;
    }
    match expr {
        Expr::Undefined
        | Expr::Null
        | Expr::Bool(_)
        | Expr::Number(_)
        | Expr::String(_)
        | Expr::Ident(_)
        | Expr::This => {}
        Expr::Member { object, .. } => walk_expr(object, f),
        Expr::Index { object, index } => {
            walk_expr(object, f);
            walk_expr(index, f);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            walk_expr(callee, f);
            for arg in args {
                walk_expr(arg, f);
            }
        }
        Expr::Assign { target, value, .. } => {
            walk_expr(target, f);
            walk_expr(value, f);
        }
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        Expr::Unary { operand, .. } => walk_expr(operand, f),
        Expr::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            walk_expr(condition, f);
            walk_expr(then_expr, f);
            walk_expr(else_expr, f);
        }
        Expr::Sequence(items) | Expr::Array(items) => {
            for item in items {
                walk_expr(item, f);
            }
        }
        Expr::Function(func) => walk_stmts(&func.body, f),
    }
}

/// True if any node in `stmts` satisfies `pred`, not descending into nested
/// function literals when `cross_functions` is false.
pub fn any_node<'a, P>(stmts: &'a [Stmt], cross_functions: bool, mut pred: P) -> bool
where
    P: FnMut(NodeRef<'a>) -> bool,
{
    let mut found = false;
    walk_stmts(stmts, &mut |node| {
        if found {
            return Walk::Prune;
        }
        if pred(node) {
            found = true;
            return Walk::Prune;
        }
        match node {
            NodeRef::Expr(Expr::Function(_)) | NodeRef::Stmt(Stmt::Function(_)) if !cross_functions => {
                Walk::Prune
            }
            _ => Walk::Continue,
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;

    #[test]
    fn test_preorder_visits_parent_first() {
        let stmts = vec![expr_stmt(call(ident("f"), vec![ident("a")]))];
        let mut seen = Vec::new();
        walk_stmts(&stmts, &mut |node| {
            if let NodeRef::Expr(Expr::Ident(name)) = node {
                seen.push(name.clone());
            }
            if let NodeRef::Expr(Expr::Call { .. }) = node {
                seen.push("call".to_string());
            }
            Walk::Continue
        });
        assert_eq!(seen, vec!["call", "f", "a"]);
    }

    #[test]
    fn test_prune_skips_children() {
        let stmts = vec![
            expr_stmt(function_expr(&[], vec![expr_stmt(ident("inner"))])),
            expr_stmt(ident("outer")),
        ];
        let mut seen = Vec::new();
        walk_stmts(&stmts, &mut |node| match node {
            NodeRef::Expr(Expr::Function(_)) => Walk::Prune,
            NodeRef::Expr(Expr::Ident(name)) => {
                seen.push(name.as_str());
                Walk::Continue
            }
            _ => Walk::Continue,
        });
        assert_eq!(seen, vec!["outer"]);
    }

    #[test]
    fn test_any_node_respects_function_boundary() {
        let stmts = vec![expr_stmt(function_expr(&[], vec![expr_stmt(this())]))];
        let is_this = |node: NodeRef<'_>| matches!(node, NodeRef::Expr(Expr::This));
        assert!(!any_node(&stmts, false, is_this));
        assert!(any_node(&stmts, true, is_this));
    }
}
