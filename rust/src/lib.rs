//! Planning core for regulatory permitting workflows.
//!
//! Turns a project profile and a library of task/rule/duration tables into a
//! dated task plan: applicability rules select tasks, the compiler enriches them
//! with legal basis, roles and durations, the scheduler places them on the
//! calendar and the critical path analyzer finds the longest chain.

pub mod logging;

pub mod compiler;
pub mod config;
pub mod critical_path;
pub mod error;
pub mod graph;
pub mod library;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod schedule;
pub mod scope;
pub mod validation;

#[cfg(feature = "python")]
mod python;

pub use compiler::{compile_task, compile_tasks};
pub use config::{DurationMode, PlanningConfig};
pub use critical_path::{critical_path, CriticalPathResult};
pub use error::PlanningError;
pub use library::{LibraryIndex, TaskLibrary};
pub use models::{
    ApplicabilityRule, CompiledTask, DependencyEdge, DependencyType, Dimension, PlannedTask,
    ProjectProfile,
};
pub use pipeline::{plan_project, practical_duration_map, PlanWarning, ProjectPlan};
pub use rules::{evaluate, Applicability};
pub use schedule::{schedule, schedule_with_config};
pub use validation::{validate_library, ValidationReport};
