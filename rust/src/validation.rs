//! Structural validation of a task library.
//!
//! Runs before planning and collects every issue instead of stopping at the
//! first one. The planning core itself assumes a library that passed these
//! checks and does not re-validate.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph::TaskGraph;
use crate::library::TaskLibrary;
use crate::models::{Dimension, ANY, NO_LEGAL_BASIS};
use crate::scope::RuleScope;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("ERROR"),
            Self::Warn => f.write_str("WARN"),
        }
    }
}

/// A single finding, with a stable machine-readable code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            message: message.into(),
        }
    }

    fn warn(code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub summary: ValidationSummary,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let errors = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        Self {
            summary: ValidationSummary {
                errors,
                warnings: issues.len() - errors,
            },
            issues,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.summary.errors == 0
    }

    pub fn codes(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.code.as_str()).collect()
    }
}

fn check_unique_task_codes(library: &TaskLibrary, issues: &mut Vec<ValidationIssue>) {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut dupes: Vec<&str> = Vec::new();
    for task in &library.tasks {
        if !seen.insert(task.task_code.as_str()) && !dupes.contains(&task.task_code.as_str()) {
            dupes.push(task.task_code.as_str());
        }
    }
    if !dupes.is_empty() {
        issues.push(ValidationIssue::error(
            "TASK_DUPLICATE",
            format!("Duplicate task_code(s): {}", dupes.join(", ")),
        ));
    }
}

fn check_dependency_references(library: &TaskLibrary, issues: &mut Vec<ValidationIssue>) {
    let known: FxHashSet<&str> = library.tasks.iter().map(|t| t.task_code.as_str()).collect();
    for edge in &library.dependencies {
        let pred = &edge.predecessor_task_code;
        let succ = &edge.successor_task_code;
        if !known.contains(pred.as_str()) {
            issues.push(ValidationIssue::error(
                "DEP_MISSING_TASK",
                format!("Dependency predecessor missing task_code={pred}"),
            ));
        }
        if !known.contains(succ.as_str()) {
            issues.push(ValidationIssue::error(
                "DEP_MISSING_TASK",
                format!("Dependency successor missing task_code={succ}"),
            ));
        }
        if !edge.dependency_type.is_recognized() {
            issues.push(ValidationIssue::error(
                "DEP_BAD_TYPE",
                format!(
                    "Bad dependency_type for {pred}->{succ}: {}",
                    edge.dependency_type
                ),
            ));
        }
    }
}

fn check_dependency_cycles(library: &TaskLibrary, issues: &mut Vec<ValidationIssue>) {
    let graph = TaskGraph::induced(
        library.tasks.iter().map(|t| t.task_code.as_str()),
        &library.dependencies,
    );
    if let Err(err) = graph.topological_order() {
        issues.push(ValidationIssue::error("DEP_CYCLE", err.to_string()));
    }
}

fn check_rule_vocabulary(library: &TaskLibrary, issues: &mut Vec<ValidationIssue>) {
    for rule in &library.applicability_rules {
        for dim in Dimension::ALL {
            let (Some(allowed), Some(values)) = (
                library.vocabulary.codes(dim),
                rule.conditions.accepted(dim),
            ) else {
                continue;
            };
            for value in values.iter().filter(|v| v.as_str() != ANY) {
                if !allowed.contains(value) {
                    issues.push(ValidationIssue::error(
                        "RULE_BAD_VOCAB",
                        format!(
                            "Rule {}: value '{}' not in vocab for '{}'",
                            rule.rule_id, value, dim
                        ),
                    ));
                }
            }
        }
    }
}

fn check_legal_basis(library: &TaskLibrary, issues: &mut Vec<ValidationIssue>) {
    let mut by_task: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for row in &library.task_legal_basis {
        by_task
            .entry(row.task_code.as_str())
            .or_default()
            .push(row.instrument_code.trim());
    }

    let mut codes: Vec<&str> = library.tasks.iter().map(|t| t.task_code.as_str()).collect();
    codes.sort();
    codes.dedup();
    for code in codes {
        match by_task.get(code) {
            None => issues.push(ValidationIssue::error(
                "NO_LEGAL_BASIS_POINTER",
                format!("Task {code} has no legal basis pointer and no {NO_LEGAL_BASIS} marker."),
            )),
            Some(instruments) if instruments.iter().all(|i| i.is_empty()) => {
                issues.push(ValidationIssue::error(
                    "EMPTY_LEGAL_BASIS_POINTER",
                    format!("Task {code} has legal basis row(s) but no instrument_code populated."),
                ))
            }
            Some(_) => {}
        }
    }

    for row in &library.task_legal_basis {
        if row.instrument_code.trim().is_empty() {
            issues.push(ValidationIssue::error(
                "LEGAL_BASIS_MISSING_INST",
                format!(
                    "Missing instrument_code in task_legal_basis row for task={}",
                    row.task_code
                ),
            ));
        }
    }
}

fn check_hard_blockers(library: &TaskLibrary, issues: &mut Vec<ValidationIssue>) {
    if library.statutory_durations.is_empty() {
        issues.push(ValidationIssue::error(
            "NO_STATUTORY_DURATIONS",
            "Statutory duration table is missing or empty.",
        ));
        return;
    }

    for task in library.tasks.iter().filter(|t| t.hard_legal_blocker) {
        let code = &task.task_code;
        let mut rows = library
            .statutory_durations
            .iter()
            .filter(|r| &r.task_code == code)
            .peekable();
        if rows.peek().is_none() {
            issues.push(ValidationIssue::error(
                "HARD_BLOCKER_NO_RULE",
                format!("Hard blocker task {code} has no statutory_durations row (explicit none required)."),
            ));
            continue;
        }

        let class_aware = rows.any(|r| {
            let scope = RuleScope::parse(&r.rule_scope);
            let no_deadline = r
                .notes
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains("no statutory deadline"));
            scope.filter(Dimension::Classification).is_some() || no_deadline
        });
        if !class_aware {
            issues.push(ValidationIssue::warn(
                "HARD_BLOCKER_RULE_NOT_CLASS_AWARE",
                format!(
                    "Hard blocker {code} has statutory rows but none appear classification-aware; \
                     consider adding DIM[classification=...] or an explicit 'No statutory deadline' note."
                ),
            ));
        }
    }
}

/// Run every library check.
pub fn validate_library(library: &TaskLibrary) -> ValidationReport {
    let mut issues = Vec::new();
    check_unique_task_codes(library, &mut issues);
    check_dependency_references(library, &mut issues);
    check_dependency_cycles(library, &mut issues);
    check_rule_vocabulary(library, &mut issues);
    check_legal_basis(library, &mut issues);
    check_hard_blockers(library, &mut issues);
    ValidationReport::from_issues(issues)
}
