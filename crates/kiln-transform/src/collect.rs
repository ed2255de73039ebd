//! Definition collection
//!
//! Scans the definition host for assignments of the form
//! `Qualified.name = function (...) { ... }` whose last segment is one of the
//! candidate names, and snapshots each matched function literal into a
//! [`DefinitionTable`]. Source units whose name does not end with the host
//! suffix are pruned without being entered.

use kiln_ast::{walk_stmts, Expr, FunctionLit, NodeRef, Program, Walk};
use kiln_types::{QualifiedName, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// What to keep when a qualified name is assigned more than once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The assignment encountered last in traversal order wins
    #[default]
    LastWins,
    /// The first assignment wins; later ones are ignored
    FirstWins,
}

/// One collected static function
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: QualifiedName,
    /// Snapshot of the function literal at collection time
    pub function: FunctionLit,
    pub unit: UnitId,
    pub unit_name: String,
}

/// A qualified name seen more than once in the host
#[derive(Debug, Clone, PartialEq)]
pub struct Duplicate {
    pub name: QualifiedName,
    /// Unit holding the first occurrence
    pub unit_name: String,
    /// Occurrences of the name, in traversal order
    pub occurrences: usize,
}

/// Qualified name to definition, immutable once collection finishes
#[derive(Debug, Clone, Default)]
pub struct DefinitionTable {
    defs: HashMap<QualifiedName, Definition>,
    duplicates: Vec<Duplicate>,
    host_units: Vec<String>,
}

impl DefinitionTable {
    pub fn get(&self, name: &QualifiedName) -> Option<&Definition> {
        self.defs.get(name)
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.defs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Definitions sorted by qualified name
    pub fn definitions(&self) -> Vec<&Definition> {
        let mut defs: Vec<&Definition> = self.defs.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn duplicates(&self) -> &[Duplicate] {
        &self.duplicates
    }

    /// Names of the units that matched the host suffix
    pub fn host_units(&self) -> &[String] {
        &self.host_units
    }

    /// True if some collected name ends with `function`
    pub fn has_function(&self, function: &str) -> bool {
        self.defs.keys().any(|name| name.last() == function)
    }

    fn record(&mut self, def: Definition, policy: DuplicatePolicy) {
        match self.defs.get(&def.name) {
            Some(existing) => {
                log::warn!(
                    "'{}' is defined more than once in {}",
                    def.name,
                    def.unit_name
                );
                match self.duplicates.iter_mut().find(|d| d.name == def.name) {
                    Some(dup) => dup.occurrences += 1,
                    None => self.duplicates.push(Duplicate {
                        name: def.name.clone(),
                        unit_name: existing.unit_name.clone(),
                        occurrences: 2,
                    }),
                }
                if policy == DuplicatePolicy::LastWins {
                    self.defs.insert(def.name.clone(), def);
                }
            }
            None => {
                self.defs.insert(def.name.clone(), def);
            }
        }
    }
}

/// Collect with the default last-write-wins policy
pub fn collect(program: &Program, host: &str, candidates: &BTreeSet<String>) -> DefinitionTable {
    collect_with_policy(program, host, candidates, DuplicatePolicy::default())
}

pub fn collect_with_policy(
    program: &Program,
    host: &str,
    candidates: &BTreeSet<String>,
    policy: DuplicatePolicy,
) -> DefinitionTable {
    let mut table = DefinitionTable::default();

    for unit in &program.units {
        if !unit.name.ends_with(host) {
            continue;
        }
        table.host_units.push(unit.name.clone());

        let mut found = Vec::new();
        walk_stmts(&unit.body, &mut |node| {
            if let NodeRef::Expr(Expr::Assign {
                target,
                op: None,
                value,
            }) = node
            {
                if let (Some(name), Expr::Function(func)) = (target.qualified_name(), value.as_ref()) {
                    if name.is_qualified() && candidates.contains(name.last()) {
                        found.push((name, func.as_ref().clone()));
                    }
                }
            }
            Walk::Continue
        });

        for (name, function) in found {
            log::debug!("collected {} from {}", name, unit.name);
            table.record(
                Definition {
                    name,
                    function,
                    unit: unit.id,
                    unit_name: unit.name.clone(),
                },
                policy,
            );
        }
    }

    table
}
