//! Error types shared by the planning stages.

use thiserror::Error;

/// Fatal errors raised by the planning engine.
///
/// Soft conditions (missing durations, dangling edges) are not errors; they are
/// reported as [`crate::pipeline::PlanWarning`] values instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    /// The dependency subgraph induced by the selected tasks is not acyclic.
    ///
    /// Carries the sorted codes of every task the topological sort could not place.
    #[error("Circular dependency detected among tasks: {}", tasks.join(", "))]
    CircularDependency { tasks: Vec<String> },
    #[error("Unknown duration mode: {0} (expected \"statutory\" or \"practical\")")]
    UnknownDurationMode(String),
    #[error("Task not found: {0}")]
    UnknownTask(String),
    /// A planned offset lands outside the representable calendar range.
    #[error("Planned date for task {task_code} is out of range ({offset_days} days from plan start)")]
    DateOutOfRange { task_code: String, offset_days: i64 },
}
