//! A full planning run for one project profile.
//!
//! rules -> compiler -> scheduler -> critical path, with soft data-quality
//! findings collected as [`PlanWarning`]s and only cycles treated as fatal.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::compiler::compile_tasks;
use crate::config::{DurationMode, PlanningConfig};
use crate::critical_path::{critical_path, CriticalPathResult};
use crate::error::PlanningError;
use crate::library::{LibraryIndex, TaskLibrary};
use crate::models::{CompiledTask, PlannedTask, PracticalDurationRow, ProjectProfile};
use crate::rules::{evaluate, Applicability};
use crate::schedule::{resolve_duration, schedule_with_config};
use crate::{log_decisions, log_summary};

/// A recoverable condition found during a planning run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// No applicability rule matched the profile.
    NoApplicableRules,
    /// Rules matched, but every included task was excluded again.
    EmptySelection,
    /// A selected task code has no task definition in the library.
    UnknownTaskCode { task_code: String },
    /// Neither duration source resolved; the task was scheduled with 0 days.
    MissingDuration {
        task_code: String,
        mode: DurationMode,
    },
    /// Only one endpoint of the edge is in the selected set; the edge was dropped.
    UnresolvedDependency {
        predecessor: String,
        successor: String,
    },
    /// The edge type is not FS/SS/FF; it was scheduled as FS.
    UnrecognizedDependencyType {
        predecessor: String,
        successor: String,
        dependency_type: String,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoApplicableRules => write!(f, "No applicability rule matched the profile"),
            Self::EmptySelection => write!(f, "Matched rules selected no tasks"),
            Self::UnknownTaskCode { task_code } => {
                write!(f, "Selected task {task_code} has no task definition")
            }
            Self::MissingDuration { task_code, mode } => write!(
                f,
                "Task {task_code} has no usable duration in {mode} mode; scheduled as 0 days"
            ),
            Self::UnresolvedDependency {
                predecessor,
                successor,
            } => write!(
                f,
                "Dependency {predecessor}->{successor} has an endpoint outside the selected tasks"
            ),
            Self::UnrecognizedDependencyType {
                predecessor,
                successor,
                dependency_type,
            } => write!(
                f,
                "Dependency {predecessor}->{successor} has type {dependency_type}; treated as FS"
            ),
        }
    }
}

/// Everything a planning run produces for downstream exporters and sync layers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub applicability: Applicability,
    pub compiled: Vec<CompiledTask>,
    pub planned: FxHashMap<String, PlannedTask>,
    pub critical_path: CriticalPathResult,
    pub duration_mode: DurationMode,
    pub warnings: Vec<PlanWarning>,
}

impl ProjectPlan {
    pub fn planned_for(&self, task_code: &str) -> Option<&PlannedTask> {
        self.planned.get(task_code)
    }

    /// Matched rule ids in evaluation order.
    pub fn matched_rule_ids(&self) -> &[String] {
        &self.applicability.matched_rule_ids
    }
}

/// Typical practical days per task, later rows overriding earlier ones.
///
/// Rows without a typical value are skipped. This is the duration source the
/// reporting layer feeds to [`critical_path`] when running it on its own.
pub fn practical_duration_map(rows: &[PracticalDurationRow]) -> FxHashMap<String, f64> {
    let mut durations = FxHashMap::default();
    for row in rows {
        if let Some(days) = row.typical_days.filter(|d| d.is_finite()) {
            durations.insert(row.task_code.clone(), days);
        }
    }
    durations
}

fn selection_warnings(
    applicability: &Applicability,
    index: &LibraryIndex<'_>,
    warnings: &mut Vec<PlanWarning>,
) {
    if !applicability.has_matches() {
        warnings.push(PlanWarning::NoApplicableRules);
    } else if applicability.final_tasks.is_empty() {
        warnings.push(PlanWarning::EmptySelection);
    }
    for code in &applicability.final_tasks {
        if index.task(code).is_none() {
            warnings.push(PlanWarning::UnknownTaskCode {
                task_code: code.clone(),
            });
        }
    }
}

fn dependency_warnings(
    library: &TaskLibrary,
    compiled: &[CompiledTask],
    warnings: &mut Vec<PlanWarning>,
) {
    let selected: FxHashSet<&str> = compiled.iter().map(|t| t.task_code.as_str()).collect();
    for edge in &library.dependencies {
        let pred = selected.contains(edge.predecessor_task_code.as_str());
        let succ = selected.contains(edge.successor_task_code.as_str());
        if pred != succ {
            warnings.push(PlanWarning::UnresolvedDependency {
                predecessor: edge.predecessor_task_code.clone(),
                successor: edge.successor_task_code.clone(),
            });
        } else if pred && !edge.dependency_type.is_recognized() {
            warnings.push(PlanWarning::UnrecognizedDependencyType {
                predecessor: edge.predecessor_task_code.clone(),
                successor: edge.successor_task_code.clone(),
                dependency_type: edge.dependency_type.to_string(),
            });
        }
    }
}

/// Plan one project: select tasks, compile them, schedule them and find the
/// critical path over the scheduled durations.
///
/// # Returns
/// * `Err(PlanningError::CircularDependency)` when the selected tasks' dependency
///   graph has a cycle; every other data problem becomes a warning
pub fn plan_project(
    library: &TaskLibrary,
    profile: &ProjectProfile,
    config: &PlanningConfig,
) -> Result<ProjectPlan, PlanningError> {
    let verbosity = config.verbosity;
    let mut warnings = Vec::new();

    let applicability = evaluate(&library.applicability_rules, profile);
    log_summary!(
        verbosity,
        "[rules] {}: matched {:?}, {} tasks selected",
        profile.project_id,
        applicability.matched_rule_ids,
        applicability.final_tasks.len()
    );

    let index = LibraryIndex::build(library);
    selection_warnings(&applicability, &index, &mut warnings);

    let compiled = compile_tasks(
        &applicability.final_tasks,
        &index,
        profile,
        &applicability.matched_rule_ids,
    );
    for task in &compiled {
        let resolved =
            resolve_duration(task, config.duration_mode, config.fallback_to_practical);
        log_decisions!(
            verbosity,
            "[compile] {}: statutory={:?} practical={:?} -> {:?}",
            task.task_code,
            task.statutory_max_days,
            task.practical_typical_days,
            resolved
        );
        if resolved.is_none() {
            warnings.push(PlanWarning::MissingDuration {
                task_code: task.task_code.clone(),
                mode: config.duration_mode,
            });
        }
    }
    dependency_warnings(library, &compiled, &mut warnings);

    let planned = schedule_with_config(
        &compiled,
        &library.dependencies,
        profile.plan_start_date,
        config,
    )?;

    let codes: Vec<&str> = compiled.iter().map(|t| t.task_code.as_str()).collect();
    let durations: FxHashMap<String, f64> = planned
        .values()
        .map(|p| (p.task_code.clone(), p.duration_days))
        .collect();
    let critical_path = critical_path(&codes, &library.dependencies, &durations)?;
    log_summary!(
        verbosity,
        "[critical_path] {} ({} days)",
        critical_path.path.join(" -> "),
        critical_path.total_duration
    );

    for warning in &warnings {
        log_summary!(verbosity, "[warning] {}", warning);
    }

    Ok(ProjectPlan {
        applicability,
        compiled,
        planned,
        critical_path,
        duration_mode: config.duration_mode,
        warnings,
    })
}
