//! Record of which function and script bodies the pass modified

use kiln_ast::ScopeKind;
use kiln_types::{NodeId, UnitId};
use serde::Serialize;
use std::collections::BTreeSet;

/// A rewritten body, named by ids that survive the run: a function literal
/// keeps its node id and a source unit keeps its unit id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ChangedScope {
    /// Top level of a source unit
    Script(UnitId),
    /// Body of a function literal
    Function(NodeId),
}

impl ChangedScope {
    pub fn from_kind(kind: ScopeKind) -> Option<Self> {
        match kind {
            ScopeKind::Global => None,
            ScopeKind::Script(unit) => Some(ChangedScope::Script(unit)),
            ScopeKind::Function(id) => Some(ChangedScope::Function(id)),
        }
    }
}

/// Function and script bodies that were rewritten.
///
/// Written during rewriting, read once when the pass reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    scopes: BTreeSet<ChangedScope>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report that the body owning a scope of `kind` changed
    pub fn mark(&mut self, kind: ScopeKind) {
        if let Some(changed) = ChangedScope::from_kind(kind) {
            self.scopes.insert(changed);
        }
    }

    pub fn contains(&self, scope: ChangedScope) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Changed bodies, scripts before functions, each in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = ChangedScope> + '_ {
        self.scopes.iter().copied()
    }

    /// Function literals whose bodies changed
    pub fn functions(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().filter_map(|scope| match scope {
            ChangedScope::Function(id) => Some(id),
            ChangedScope::Script(_) => None,
        })
    }

    /// Source units whose top level changed
    pub fn scripts(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.iter().filter_map(|scope| match scope {
            ChangedScope::Script(unit) => Some(unit),
            ChangedScope::Function(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_are_deduplicated() {
        let mut changes = ChangeSet::new();
        changes.mark(ScopeKind::Function(3));
        changes.mark(ScopeKind::Script(1));
        changes.mark(ScopeKind::Function(3));
        changes.mark(ScopeKind::Global);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes.iter().collect::<Vec<_>>(),
            vec![ChangedScope::Script(1), ChangedScope::Function(3)]
        );
        assert!(changes.contains(ChangedScope::Function(3)));
        assert!(!changes.contains(ChangedScope::Function(1)));
        assert_eq!(changes.functions().collect::<Vec<_>>(), vec![3]);
        assert_eq!(changes.scripts().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_serializes_as_tagged_ids() {
        let mut changes = ChangeSet::new();
        changes.mark(ScopeKind::Script(0));
        changes.mark(ScopeKind::Function(7));
        let json = serde_json::to_string(&changes).unwrap();
        assert_eq!(
            json,
            r#"[{"kind":"script","id":0},{"kind":"function","id":7}]"#
        );
    }
}
