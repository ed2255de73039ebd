//! Terse constructors for building trees by hand
//!
//! Function literals built here draw ids from a process-wide counter, so
//! every literal built in one process gets a distinct id.

use crate::ir::{BinaryOp, Expr, FunctionLit, LogicalOp, Stmt, UnaryOp, VarKind};
use kiln_types::NodeId;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_FUNCTION_ID: AtomicU32 = AtomicU32::new(1);

fn next_function_id() -> NodeId {
    NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed)
}

pub fn ident(name: &str) -> Expr {
    Expr::Ident(name.to_string())
}

pub fn num(value: f64) -> Expr {
    Expr::Number(value)
}

pub fn string(value: &str) -> Expr {
    Expr::String(value.to_string())
}

pub fn boolean(value: bool) -> Expr {
    Expr::Bool(value)
}

pub fn undefined() -> Expr {
    Expr::Undefined
}

pub fn this() -> Expr {
    Expr::This
}

pub fn member(object: Expr, property: &str) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: property.to_string(),
    }
}

pub fn index(object: Expr, index: Expr) -> Expr {
    Expr::Index {
        object: Box::new(object),
        index: Box::new(index),
    }
}

/// Member chain from a dotted path: `qualified("a.b.c")` is `a.b.c`
pub fn qualified(path: &str) -> Expr {
    let mut segments = path.split('.');
    let root = ident(segments.next().unwrap_or_default());
    segments.fold(root, member)
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args,
    }
}

/// Call through a dotted path: `call_qualified("A.f", args)` is `A.f(args)`
pub fn call_qualified(path: &str, args: Vec<Expr>) -> Expr {
    call(qualified(path), args)
}

pub fn new_expr(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::New {
        callee: Box::new(callee),
        args,
    }
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    Expr::Assign {
        target: Box::new(target),
        op: None,
        value: Box::new(value),
    }
}

pub fn compound_assign(target: Expr, op: BinaryOp, value: Expr) -> Expr {
    Expr::Assign {
        target: Box::new(target),
        op: Some(op),
        value: Box::new(value),
    }
}

pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn add(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Add, left, right)
}

pub fn mul(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Mul, left, right)
}

pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary {
        op,
        operand: Box::new(operand),
    }
}

pub fn conditional(condition: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
    Expr::Conditional {
        condition: Box::new(condition),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
    }
}

pub fn sequence(items: Vec<Expr>) -> Expr {
    Expr::Sequence(items)
}

pub fn array(items: Vec<Expr>) -> Expr {
    Expr::Array(items)
}

pub fn function_lit(params: &[&str], body: Vec<Stmt>) -> FunctionLit {
    FunctionLit {
        id: next_function_id(),
        name: None,
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
    }
}

pub fn function_expr(params: &[&str], body: Vec<Stmt>) -> Expr {
    Expr::Function(Box::new(function_lit(params, body)))
}

pub fn function_decl(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    let mut func = function_lit(params, body);
    func.name = Some(name.to_string());
    Stmt::Function(func)
}

pub fn var(name: &str, init: Option<Expr>) -> Stmt {
    Stmt::Var {
        kind: VarKind::Var,
        name: name.to_string(),
        init,
    }
}

pub fn let_(name: &str, init: Option<Expr>) -> Stmt {
    Stmt::Var {
        kind: VarKind::Let,
        name: name.to_string(),
        init,
    }
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(expr)
}

/// `target = value;`
pub fn assign_stmt(target: Expr, value: Expr) -> Stmt {
    Stmt::Expr(assign(target, value))
}

pub fn ret(expr: Expr) -> Stmt {
    Stmt::Return(Some(expr))
}

pub fn if_(condition: Expr, then_branch: Vec<Stmt>, else_branch: Option<Vec<Stmt>>) -> Stmt {
    Stmt::If {
        condition,
        then_branch,
        else_branch,
    }
}

pub fn while_(condition: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While { condition, body }
}
