//! The task library: every source table for a planning run, plus a per-run
//! index that groups table rows by task code.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    ApplicabilityRule, DependencyEdge, Dimension, LegalBasisRow, PracticalDurationRow, RiskRow,
    StatutoryDurationRow, TaskDefinition, TaskRoleRow,
};

/// Allowed codes per profile dimension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary(BTreeMap<Dimension, BTreeSet<String>>);

impl Vocabulary {
    pub fn insert(&mut self, dimension: Dimension, code: impl Into<String>) {
        self.0.entry(dimension).or_default().insert(code.into());
    }

    /// Codes known for a dimension, or `None` when no vocabulary was loaded for it.
    pub fn codes(&self, dimension: Dimension) -> Option<&BTreeSet<String>> {
        self.0.get(&dimension)
    }
}

/// All tables the loader hands over, in file order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskLibrary {
    pub vocabulary: Vocabulary,
    pub tasks: Vec<TaskDefinition>,
    pub dependencies: Vec<DependencyEdge>,
    pub applicability_rules: Vec<ApplicabilityRule>,
    pub task_legal_basis: Vec<LegalBasisRow>,
    pub task_roles: Vec<TaskRoleRow>,
    pub statutory_durations: Vec<StatutoryDurationRow>,
    pub practical_durations: Vec<PracticalDurationRow>,
    pub risks: Vec<RiskRow>,
}

/// Rows of every per-task table belonging to one task, in table order.
#[derive(Clone, Debug, Default)]
pub struct TaskRows<'a> {
    pub legal_basis: Vec<&'a LegalBasisRow>,
    pub roles: Vec<&'a TaskRoleRow>,
    pub statutory: Vec<&'a StatutoryDurationRow>,
    pub practical: Vec<&'a PracticalDurationRow>,
}

/// Task definitions and their table rows keyed by task code.
///
/// Built once per run so compilation never rescans the tables.
#[derive(Clone, Debug, Default)]
pub struct LibraryIndex<'a> {
    tasks: FxHashMap<&'a str, &'a TaskDefinition>,
    rows: FxHashMap<&'a str, TaskRows<'a>>,
}

impl<'a> LibraryIndex<'a> {
    pub fn build(library: &'a TaskLibrary) -> Self {
        Self::from_tables(
            &library.tasks,
            &library.task_legal_basis,
            &library.task_roles,
            &library.statutory_durations,
            &library.practical_durations,
        )
    }

    pub fn from_tables(
        tasks: &'a [TaskDefinition],
        legal_basis: &'a [LegalBasisRow],
        roles: &'a [TaskRoleRow],
        statutory: &'a [StatutoryDurationRow],
        practical: &'a [PracticalDurationRow],
    ) -> Self {
        let mut task_map: FxHashMap<&'a str, &'a TaskDefinition> =
            FxHashMap::with_capacity_and_hasher(tasks.len(), Default::default());
        for task in tasks {
            // First definition wins; duplicates are a validation error.
            task_map.entry(task.task_code.as_str()).or_insert(task);
        }

        let mut rows: FxHashMap<&'a str, TaskRows<'a>> = FxHashMap::default();
        for row in legal_basis {
            rows.entry(row.task_code.as_str()).or_default().legal_basis.push(row);
        }
        for row in roles {
            rows.entry(row.task_code.as_str()).or_default().roles.push(row);
        }
        for row in statutory {
            rows.entry(row.task_code.as_str()).or_default().statutory.push(row);
        }
        for row in practical {
            rows.entry(row.task_code.as_str()).or_default().practical.push(row);
        }

        Self {
            tasks: task_map,
            rows,
        }
    }

    pub fn task(&self, task_code: &str) -> Option<&'a TaskDefinition> {
        self.tasks.get(task_code).copied()
    }

    /// Table rows for a task; empty when the task appears in no table.
    pub fn rows(&self, task_code: &str) -> TaskRows<'a> {
        self.rows.get(task_code).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_groups_rows_in_table_order() {
        let library = TaskLibrary {
            tasks: vec![TaskDefinition::new("T1", "Permit", "P1", 1)],
            task_roles: vec![
                TaskRoleRow {
                    task_code: "T1".to_string(),
                    actor_role_code: Some("DEVELOPER".to_string()),
                    authority_name: None,
                },
                TaskRoleRow {
                    task_code: "T2".to_string(),
                    actor_role_code: None,
                    authority_name: None,
                },
                TaskRoleRow {
                    task_code: "T1".to_string(),
                    actor_role_code: Some("CONSULTANT".to_string()),
                    authority_name: None,
                },
            ],
            ..TaskLibrary::default()
        };
        let index = LibraryIndex::build(&library);

        let roles = index.rows("T1").roles;
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].actor_role_code.as_deref(), Some("DEVELOPER"));
        assert!(index.task("T1").is_some());
        assert!(index.task("T2").is_none());
        assert!(index.rows("T3").legal_basis.is_empty());
    }

    #[test]
    fn test_library_deserializes_from_partial_json() {
        let library: TaskLibrary = serde_json::from_str(
            r#"{
                "vocabulary": {"classification": ["CLASS_A", "CLASS_B"]},
                "tasks": [{"task_code": "T1", "task_name": "Permit", "phase_code": "P1"}]
            }"#,
        )
        .unwrap();
        assert_eq!(library.tasks.len(), 1);
        assert!(library
            .vocabulary
            .codes(Dimension::Classification)
            .is_some_and(|codes| codes.contains("CLASS_B")));
        assert!(library.vocabulary.codes(Dimension::ProjectType).is_none());
    }
}
