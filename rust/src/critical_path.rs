//! Critical path analysis: the longest node-weighted chain through the task graph.
//!
//! Unlike the scheduler, every edge is a plain zero-lag precedence link here;
//! dependency type and lag are not consulted.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::error::PlanningError;
use crate::graph::{TaskGraph, TaskIdx};
use crate::models::DependencyEdge;

/// Result of critical path calculation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathResult {
    /// Task codes on the critical path, first to last.
    pub path: Vec<String>,
    /// Cumulative duration of the path.
    pub total_duration: f64,
    /// Longest cumulative duration of any chain ending at each task.
    pub longest_path_by_task: FxHashMap<String, f64>,
}

impl CriticalPathResult {
    pub fn contains(&self, task_code: &str) -> bool {
        self.path.iter().any(|c| c == task_code)
    }
}

/// Calculate the critical path over `task_codes` and the edges between them.
///
/// Each task weighs its entry in `durations` (0 when missing). The path ends at
/// the task with the largest cumulative duration, the first one in topological
/// order on ties. An empty task list yields an empty path.
///
/// # Returns
/// * `Err(PlanningError::CircularDependency)` if the induced graph has a cycle
pub fn critical_path<T, S>(
    task_codes: &[T],
    edges: &[DependencyEdge],
    durations: &HashMap<String, f64, S>,
) -> Result<CriticalPathResult, PlanningError>
where
    T: AsRef<str>,
    S: BuildHasher,
{
    let graph = TaskGraph::induced(task_codes.iter().map(AsRef::as_ref), edges);
    let order = graph.topological_order()?;
    let index = graph.index();

    let n = graph.len();
    let weight: Vec<f64> = (0..n as TaskIdx)
        .map(|idx| durations.get(index.code(idx)).copied().unwrap_or(0.0))
        .collect();
    let mut dist = weight.clone();
    let mut pred: Vec<Option<TaskIdx>> = vec![None; n];

    for &idx in &order {
        for &(succ, _) in graph.outgoing(idx) {
            let s = succ as usize;
            let candidate = dist[idx as usize] + weight[s];
            if candidate > dist[s] {
                dist[s] = candidate;
                pred[s] = Some(idx);
            }
        }
    }

    let mut end: Option<TaskIdx> = None;
    for &idx in &order {
        if end.map_or(true, |e| dist[idx as usize] > dist[e as usize]) {
            end = Some(idx);
        }
    }

    let mut path = Vec::new();
    let mut cursor = end;
    while let Some(idx) = cursor {
        path.push(index.code(idx).to_string());
        cursor = pred[idx as usize];
    }
    path.reverse();

    let longest_path_by_task = (0..n as TaskIdx)
        .map(|idx| (index.code(idx).to_string(), dist[idx as usize]))
        .collect();

    Ok(CriticalPathResult {
        path,
        total_duration: end.map_or(0.0, |e| dist[e as usize]),
        longest_path_by_task,
    })
}
