//! State shared by both phases of one pass run

use crate::changes::ChangeSet;
use crate::names::{FreshNames, NameIdSupplier};
use crate::pass::InlineStats;
use kiln_ast::{resolve_scopes, Program, ScopeTree};
use kiln_types::{NodeId, ScopeId};

/// Owned per-run context, threaded through collection and rewriting and
/// dropped when the run ends
pub struct InlineContext {
    pub scopes: ScopeTree,
    pub names: FreshNames,
    pub changes: ChangeSet,
    pub stats: InlineStats,
    next_node_id: NodeId,
}

impl InlineContext {
    pub fn new(program: &Program, supplier: Box<dyn NameIdSupplier>) -> Self {
        let mut names = FreshNames::new(supplier);
        names.reserve_program(program);
        Self {
            scopes: resolve_scopes(program),
            names,
            changes: ChangeSet::new(),
            stats: InlineStats::default(),
            next_node_id: program.max_node_id().map_or(0, |id| id + 1),
        }
    }

    /// A fresh identifier derived from `base`, unbound as seen from `scope`
    pub fn fresh_name(&mut self, base: &str, scope: ScopeId) -> String {
        self.names.fresh(base, &self.scopes, scope)
    }

    /// An id no function literal in the program uses yet
    pub fn fresh_node_id(&mut self) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }
}
