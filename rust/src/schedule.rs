//! Precedence-diagramming scheduler.
//!
//! Places compiled tasks on the calendar with a single forward pass over the
//! dependency DAG. Constraints per incoming edge from predecessor P with lag L:
//! - FS: start >= finish(P) + L
//! - SS: start >= start(P) + L
//! - FF: start >= finish(P) + L - duration(self)
//!
//! Unrecognized edge types are treated as FS. Offsets are real-valued days from
//! the plan start and never negative.
//!
//! Calendar conversion rounds half to even (2.5 -> 2, 3.5 -> 4): the start date
//! is `plan_start + round(start)` and the finish date is
//! `start_date + round(duration)`, so a task always spans its rounded duration.

use chrono::{Days, NaiveDate};
use rustc_hash::FxHashMap;

use crate::config::{DurationMode, PlanningConfig};
use crate::error::PlanningError;
use crate::graph::TaskGraph;
use crate::models::{CompiledTask, DependencyEdge, DependencyType, PlannedTask};
use crate::{log_debug, log_decisions, log_summary};

/// Duration for a task under `mode`, or `None` when no source resolves.
///
/// | mode      | primary            | fallback                                  |
/// |-----------|--------------------|-------------------------------------------|
/// | statutory | statutory max      | practical typical if `fallback_to_practical` |
/// | practical | practical typical  | statutory max                             |
pub fn resolve_duration(
    task: &CompiledTask,
    mode: DurationMode,
    fallback_to_practical: bool,
) -> Option<f64> {
    match mode {
        DurationMode::Statutory => task.statutory_max_days.or(if fallback_to_practical {
            task.practical_typical_days
        } else {
            None
        }),
        DurationMode::Practical => task.practical_typical_days.or(task.statutory_max_days),
    }
}

/// Duration used for scheduling: the resolved value, or 0 as a last resort.
pub fn task_duration(task: &CompiledTask, mode: DurationMode, fallback_to_practical: bool) -> f64 {
    resolve_duration(task, mode, fallback_to_practical).unwrap_or(0.0)
}

/// Earliest start of the successor implied by one edge.
fn edge_constraint(
    edge: &DependencyEdge,
    pred_start: f64,
    pred_finish: f64,
    own_duration: f64,
) -> f64 {
    let lag = edge.lag();
    match edge.dependency_type {
        DependencyType::StartToStart => pred_start + lag,
        DependencyType::FinishToFinish => pred_finish + lag - own_duration,
        DependencyType::FinishToStart | DependencyType::Unrecognized(_) => pred_finish + lag,
    }
}

/// Round a real-valued day offset to whole days, ties to even.
pub fn round_days(days: f64) -> i64 {
    days.round_ties_even() as i64
}

fn add_days(date: NaiveDate, days: i64, task_code: &str) -> Result<NaiveDate, PlanningError> {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.ok_or_else(|| PlanningError::DateOutOfRange {
        task_code: task_code.to_string(),
        offset_days: days,
    })
}

/// Schedule `compiled` from `plan_start` using the given duration policy.
///
/// # Returns
/// * Planned dates for every compiled task, keyed by task code
/// * `Err(PlanningError::CircularDependency)` if the induced graph has a cycle;
///   no partial schedule is produced
pub fn schedule(
    compiled: &[CompiledTask],
    edges: &[DependencyEdge],
    plan_start: NaiveDate,
    duration_mode: DurationMode,
    fallback_to_practical: bool,
) -> Result<FxHashMap<String, PlannedTask>, PlanningError> {
    let config = PlanningConfig::new(duration_mode, fallback_to_practical);
    schedule_with_config(compiled, edges, plan_start, &config)
}

/// Same as [`schedule`], taking the duration policy and verbosity from `config`.
pub fn schedule_with_config(
    compiled: &[CompiledTask],
    edges: &[DependencyEdge],
    plan_start: NaiveDate,
    config: &PlanningConfig,
) -> Result<FxHashMap<String, PlannedTask>, PlanningError> {
    let verbosity = config.verbosity;
    let graph = TaskGraph::induced(compiled.iter().map(|t| t.task_code.as_str()), edges);
    let order = graph.topological_order()?;

    // Duplicate task codes collapse onto their first definition.
    let n = graph.len();
    let mut durations: Vec<Option<f64>> = vec![None; n];
    for task in compiled {
        if let Some(idx) = graph.index().get(&task.task_code) {
            let slot = &mut durations[idx as usize];
            if slot.is_none() {
                *slot = Some(task_duration(
                    task,
                    config.duration_mode,
                    config.fallback_to_practical,
                ));
            }
        }
    }
    let durations: Vec<f64> = durations.into_iter().map(|d| d.unwrap_or(0.0)).collect();

    let mut starts = vec![0.0_f64; n];
    for &idx in &order {
        let i = idx as usize;
        let mut best = 0.0_f64;
        for &(pred, edge) in graph.incoming(idx) {
            let p = pred as usize;
            let constraint = edge_constraint(edge, starts[p], starts[p] + durations[p], durations[i]);
            log_debug!(
                verbosity,
                "  {} -[{} lag {}]-> {}: start >= {:.2}",
                graph.index().code(pred),
                edge.dependency_type,
                edge.lag(),
                graph.index().code(idx),
                constraint
            );
            if constraint > best {
                best = constraint;
            }
        }
        starts[i] = best;
    }

    let mut planned: FxHashMap<String, PlannedTask> =
        FxHashMap::with_capacity_and_hasher(n, Default::default());
    for &idx in &order {
        let i = idx as usize;
        let code = graph.index().code(idx);
        let planned_start = add_days(plan_start, round_days(starts[i]), code)?;
        let planned_finish = add_days(planned_start, round_days(durations[i]), code)?;
        log_decisions!(
            verbosity,
            "[schedule] {}: {} -> {} ({} days)",
            code,
            planned_start,
            planned_finish,
            durations[i]
        );
        planned.insert(
            code.to_string(),
            PlannedTask {
                task_code: code.to_string(),
                planned_start,
                planned_finish,
                duration_days: durations[i],
            },
        );
    }

    log_summary!(
        verbosity,
        "[schedule] {} tasks, {} edges, mode={}",
        n,
        graph.edge_count(),
        config.duration_mode
    );
    Ok(planned)
}
