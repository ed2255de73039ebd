//! Structural checks run before any rewriting
//!
//! A tree that fails these checks breaks the caller's contract and must not
//! be transformed.

use crate::ir::{Expr, Program, Stmt};
use crate::visit::{walk_stmts, NodeRef, Walk};
use kiln_types::{NodeId, UnitId};
use std::collections::HashSet;
use thiserror::Error;

/// A violated structural invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AstError {
    #[error("source unit id {0} is used by more than one unit")]
    DuplicateUnitId(UnitId),

    #[error("function node {node} in '{unit}' has more than one owner")]
    DuplicateNodeId { node: NodeId, unit: String },

    #[error("call in '{unit}' has no resolvable target")]
    UnresolvableCallee { unit: String },
}

/// Check unit ids, function node ids and call targets
pub fn validate(program: &Program) -> Result<(), AstError> {
    let mut unit_ids = HashSet::new();
    let mut node_ids = HashSet::new();

    for unit in &program.units {
        if !unit_ids.insert(unit.id) {
            return Err(AstError::DuplicateUnitId(unit.id));
        }

        let mut error: Option<AstError> = None;
        walk_stmts(&unit.body, &mut |node| {
            if error.is_some() {
                return Walk::Prune;
            }
            let func = match node {
                NodeRef::Stmt(Stmt::Function(func)) => Some(func),
                NodeRef::Expr(Expr::Function(func)) => Some(func.as_ref()),
                _ => None,
            };
            if let Some(func) = func {
                if !node_ids.insert(func.id) {
                    error = Some(AstError::DuplicateNodeId {
                        node: func.id,
                        unit: unit.name.clone(),
                    });
                }
            }
            if let NodeRef::Expr(Expr::Call { callee, .. } | Expr::New { callee, .. }) = node {
                if !has_resolvable_target(callee) {
                    error = Some(AstError::UnresolvableCallee {
                        unit: unit.name.clone(),
                    });
                }
            }
            Walk::Continue
        });
        if let Some(err) = error {
            return Err(err);
        }
    }
    Ok(())
}

fn has_resolvable_target(callee: &Expr) -> bool {
    match callee {
        Expr::Ident(name) => !name.is_empty(),
        Expr::Member { object, property } => !property.is_empty() && has_resolvable_target(object),
        Expr::Undefined | Expr::Null | Expr::Bool(_) | Expr::Number(_) => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;
    use crate::ir::SourceUnit;

    #[test]
    fn test_valid_program() {
        let mut program = Program::new();
        program.add_unit(
            "main.js",
            vec![expr_stmt(call_qualified("A.f", vec![num(1.0)]))],
        );
        assert_eq!(validate(&program), Ok(()));
    }

    #[test]
    fn test_shared_function_node_is_rejected() {
        let func = function_lit(&[], vec![]);
        let id = func.id;
        let mut program = Program::new();
        program.add_unit(
            "main.js",
            vec![
                expr_stmt(Expr::Function(Box::new(func.clone()))),
                expr_stmt(Expr::Function(Box::new(func))),
            ],
        );
        assert_eq!(
            validate(&program),
            Err(AstError::DuplicateNodeId {
                node: id,
                unit: "main.js".to_string()
            })
        );
    }

    #[test]
    fn test_empty_callee_is_rejected() {
        let mut program = Program::new();
        program.add_unit("main.js", vec![expr_stmt(call(ident(""), vec![]))]);
        assert!(matches!(
            validate(&program),
            Err(AstError::UnresolvableCallee { .. })
        ));

        let mut program = Program::new();
        program.add_unit("main.js", vec![expr_stmt(call(member(ident("A"), ""), vec![]))]);
        assert!(validate(&program).is_err());
    }

    #[test]
    fn test_duplicate_unit_ids_are_rejected() {
        let program = Program {
            units: vec![
                SourceUnit { id: 3, name: "a.js".to_string(), body: vec![] },
                SourceUnit { id: 3, name: "b.js".to_string(), body: vec![] },
            ],
        };
        assert_eq!(validate(&program), Err(AstError::DuplicateUnitId(3)));
    }
}
