//! Syntax tree model for kiln
//!
//! A whole program is an ordered list of source units, each owning a tree of
//! JavaScript-shaped statements and expressions. Besides the tree itself this
//! crate resolves lexical scopes, validates structural invariants and prints
//! trees back to source text.

pub mod builder;
pub mod ir;
pub mod print;
pub mod scope;
pub mod validate;
pub mod visit;

pub use ir::*;
pub use print::{print_expr, print_program, print_stmt, print_stmts, print_unit};
pub use scope::{resolve_scopes, DeclKind, Scope, ScopeKind, ScopeTree};
pub use validate::{validate, AstError};
pub use visit::{any_node, walk_expr, walk_stmt, walk_stmts, NodeRef, Walk};
