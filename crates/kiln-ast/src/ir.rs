//! Syntax tree definitions
//!
//! The tree is a scope-resolved, JavaScript-shaped representation of a whole
//! program: an ordered list of source units, each owning its statements.
//! Every node has exactly one owner, so trees are acyclic by construction.

use kiln_types::{NodeId, QualifiedName, UnitId};
use serde::{Deserialize, Serialize};

/// A whole program (every source unit of one compilation)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub units: Vec<SourceUnit>,
}

/// One source file, identified by a stable path-like name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub id: UnitId,
    /// Path-like name (e.g. `out/j2cl/transpiler/vmbootstrap/Arrays.impl.js`)
    pub name: String,
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit and return its id
    pub fn add_unit(&mut self, name: impl Into<String>, body: Vec<Stmt>) -> UnitId {
        let id = self.units.iter().map(|u| u.id + 1).max().unwrap_or(0);
        self.units.push(SourceUnit {
            id,
            name: name.into(),
            body,
        });
        id
    }

    pub fn unit(&self, id: UnitId) -> Option<&SourceUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_by_name(&self, name: &str) -> Option<&SourceUnit> {
        self.units.iter().find(|u| u.name == name)
    }

    /// Largest function literal id in the program, if any function exists
    pub fn max_node_id(&self) -> Option<NodeId> {
        let mut max: Option<NodeId> = None;
        for unit in &self.units {
            crate::visit::walk_stmts(&unit.body, &mut |node| {
                if let crate::visit::NodeRef::Expr(Expr::Function(f)) = node {
                    max = Some(max.map_or(f.id, |m| m.max(f.id)));
                }
                if let crate::visit::NodeRef::Stmt(Stmt::Function(f)) = node {
                    max = Some(max.map_or(f.id, |m| m.max(f.id)));
                }
                crate::visit::Walk::Continue
            });
        }
        max
    }
}

/// Declaration keyword of a variable statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

/// A function literal: `function name(params) { body }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionLit {
    /// Unique across the program; keys the function's scope
    pub id: NodeId,
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

impl FunctionLit {
    /// The returned expression if the body is exactly `return <expr>;`
    pub fn single_return(&self) -> Option<&Expr> {
        match self.body.as_slice() {
            [Stmt::Return(Some(expr))] => Some(expr),
            _ => None,
        }
    }
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Variable declaration: var/let/const x = expr
    Var {
        kind: VarKind,
        name: String,
        init: Option<Expr>,
    },
    /// Function declaration
    Function(FunctionLit),
    /// Expression statement
    Expr(Expr),
    /// Return statement
    Return(Option<Expr>),
    /// If statement
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    /// While loop
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    /// Bare block
    Block(Vec<Stmt>),
    /// Labeled block: `label: { ... }`
    Labeled {
        label: String,
        body: Vec<Stmt>,
    },
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Expr),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
    InstanceOf,
    In,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::In => "in",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
        }
    }
}

/// Short-circuiting operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::TypeOf => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Identifier reference
    Ident(String),
    This,
    /// Static member access: `object.property`
    Member {
        object: Box<Expr>,
        property: String,
    },
    /// Computed member access: `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Assignment; `op` is set for compound forms such as `+=`
    Assign {
        target: Box<Expr>,
        op: Option<BinaryOp>,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// Comma expression: `(a, b, c)`
    Sequence(Vec<Expr>),
    Array(Vec<Expr>),
    Function(Box<FunctionLit>),
}

impl Expr {
    /// Derive the qualified name of a static member chain rooted at a plain
    /// identifier. Computed access, `this` roots and calls break the chain.
    pub fn qualified_name(&self) -> Option<QualifiedName> {
        match self {
            Expr::Ident(name) => QualifiedName::from_segments([name.as_str()]),
            Expr::Member { object, property } => object.qualified_name()?.child(property.as_str()),
            _ => None,
        }
    }

    /// Literal or bare identifier: safe to duplicate textually
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            Expr::Undefined
                | Expr::Null
                | Expr::Bool(_)
                | Expr::Number(_)
                | Expr::String(_)
                | Expr::Ident(_)
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Undefined | Expr::Null | Expr::Bool(_) | Expr::Number(_) | Expr::String(_)
        )
    }

    /// Direct sub-expressions in evaluation order. Function literals have
    /// none: their bodies are statements.
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Undefined
            | Expr::Null
            | Expr::Bool(_)
            | Expr::Number(_)
            | Expr::String(_)
            | Expr::Ident(_)
            | Expr::This
            | Expr::Function(_) => Vec::new(),
            Expr::Member { object, .. } => vec![object.as_mut()],
            Expr::Index { object, index } => vec![object.as_mut(), index.as_mut()],
            Expr::Call { callee, args } | Expr::New { callee, args } => {
                std::iter::once(callee.as_mut()).chain(args.iter_mut()).collect()
            }
            Expr::Assign { target, value, .. } => vec![target.as_mut(), value.as_mut()],
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                vec![left.as_mut(), right.as_mut()]
            }
            Expr::Unary { operand, .. } => vec![operand.as_mut()],
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => vec![condition.as_mut(), then_expr.as_mut(), else_expr.as_mut()],
            Expr::Sequence(items) | Expr::Array(items) => items.iter_mut().collect(),
        }
    }

    /// Conservative side-effect check. Static and computed property reads are
    /// treated as pure; calls, construction, assignment and `delete` are not.
    pub fn has_side_effects(&self) -> bool {
        match self {
            Expr::Undefined
            | Expr::Null
            | Expr::Bool(_)
            | Expr::Number(_)
            | Expr::String(_)
            | Expr::Ident(_)
            | Expr::This
            | Expr::Function(_) => false,
            Expr::Member { object, .. } => object.has_side_effects(),
            Expr::Index { object, index } => object.has_side_effects() || index.has_side_effects(),
            Expr::Call { .. } | Expr::New { .. } | Expr::Assign { .. } => true,
            Expr::Unary { op: UnaryOp::Delete, .. } => true,
            Expr::Unary { operand, .. } => operand.has_side_effects(),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.has_side_effects() || right.has_side_effects()
            }
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                condition.has_side_effects()
                    || then_expr.has_side_effects()
                    || else_expr.has_side_effects()
            }
            Expr::Sequence(items) | Expr::Array(items) => items.iter().any(Expr::has_side_effects),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;

    #[test]
    fn test_qualified_name_of_member_chain() {
        let expr = qualified("a.b.c");
        assert_eq!(expr.qualified_name().unwrap().to_string(), "a.b.c");
        assert_eq!(ident("x").qualified_name().unwrap().to_string(), "x");
    }

    #[test]
    fn test_computed_access_breaks_qualified_name() {
        let expr = member(index(ident("a"), string("b")), "c");
        assert!(expr.qualified_name().is_none());
        let expr = member(this(), "c");
        assert!(expr.qualified_name().is_none());
        let expr = member(call(ident("f"), vec![]), "c");
        assert!(expr.qualified_name().is_none());
    }

    #[test]
    fn test_side_effects() {
        assert!(!add(ident("x"), num(1.0)).has_side_effects());
        assert!(call(ident("f"), vec![]).has_side_effects());
        assert!(add(ident("x"), call(ident("f"), vec![])).has_side_effects());
        assert!(!function_expr(&["x"], vec![expr_stmt(call(ident("f"), vec![]))]).has_side_effects());
    }

    #[test]
    fn test_children_mut_in_evaluation_order() {
        let mut expr = call(ident("f"), vec![ident("a"), ident("b")]);
        let names: Vec<String> = expr
            .children_mut()
            .into_iter()
            .map(|child| match child {
                Expr::Ident(name) => name.clone(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(names, vec!["f", "a", "b"]);
        assert!(function_expr(&[], vec![]).children_mut().is_empty());
    }

    #[test]
    fn test_single_return() {
        let f = function_lit(&["x"], vec![ret(ident("x"))]);
        assert_eq!(f.single_return(), Some(&ident("x")));
        let g = function_lit(&["x"], vec![var("t", Some(ident("x"))), ret(ident("t"))]);
        assert!(g.single_return().is_none());
    }

    #[test]
    fn test_add_unit_assigns_increasing_ids() {
        let mut program = Program::new();
        let a = program.add_unit("a.js", vec![]);
        let b = program.add_unit("b.js", vec![]);
        assert_eq!((a, b), (0, 1));
        assert_eq!(program.unit_by_name("b.js").map(|u| u.id), Some(1));
    }
}
