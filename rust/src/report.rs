//! Shapes a [`ProjectPlan`] into the rows exporters and tracker sync consume.
//!
//! Nothing here touches the filesystem or the network; callers serialize the
//! returned records however they need.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::DurationMode;
use crate::critical_path::CriticalPathResult;
use crate::error::PlanningError;
use crate::models::{CompiledTask, PlannedTask, PracticalDurationRow, ProjectProfile, RiskRow};
use crate::pipeline::ProjectPlan;

/// One exported task line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub task_code: String,
    pub task_name: String,
    pub phase_code: String,
    pub planned_start: NaiveDate,
    pub planned_finish: NaiveDate,
    pub duration_mode: DurationMode,
    pub duration_days: f64,
    pub hard_legal_blocker: bool,
    pub legal_basis: String,
    pub actor_role: Option<String>,
    pub competent_authority: Option<String>,
}

impl ExportRow {
    fn new(task: &CompiledTask, planned: &PlannedTask, duration_mode: DurationMode) -> Self {
        Self {
            task_code: task.task_code.clone(),
            task_name: task.task_name.clone(),
            phase_code: task.phase_code.clone(),
            planned_start: planned.planned_start,
            planned_finish: planned.planned_finish,
            duration_mode,
            duration_days: planned.duration_days,
            hard_legal_blocker: task.hard_legal_blocker,
            legal_basis: task.legal_basis.clone(),
            actor_role: task.actor_role.clone(),
            competent_authority: task.competent_authority.clone(),
        }
    }
}

fn planned_entry<'p>(plan: &'p ProjectPlan, task_code: &str) -> Result<&'p PlannedTask, PlanningError> {
    plan.planned_for(task_code)
        .ok_or_else(|| PlanningError::UnknownTask(task_code.to_string()))
}

/// Export rows for every compiled task, sorted by (planned_start, phase_code, task_code).
pub fn export_rows(plan: &ProjectPlan) -> Result<Vec<ExportRow>, PlanningError> {
    let mut rows = plan
        .compiled
        .iter()
        .map(|task| {
            let planned = planned_entry(plan, &task.task_code)?;
            Ok(ExportRow::new(task, planned, plan.duration_mode))
        })
        .collect::<Result<Vec<_>, PlanningError>>()?;

    rows.sort_by(|a, b| {
        a.planned_start
            .cmp(&b.planned_start)
            .then_with(|| a.phase_code.cmp(&b.phase_code))
            .then_with(|| a.task_code.cmp(&b.task_code))
    });
    Ok(rows)
}

/// A serializable snapshot of one planned project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project: ProjectProfile,
    pub matched_rules: Vec<String>,
    pub duration_mode: DurationMode,
    pub tasks: Vec<ExportRow>,
}

impl ProjectSnapshot {
    pub fn from_plan(profile: &ProjectProfile, plan: &ProjectPlan) -> Result<Self, PlanningError> {
        Ok(Self {
            project: profile.clone(),
            matched_rules: plan.matched_rule_ids().to_vec(),
            duration_mode: plan.duration_mode,
            tasks: export_rows(plan)?,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Task body pushed to an external work tracker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerTaskPayload {
    pub name: String,
    pub description: String,
    /// Epoch milliseconds of the planned start at UTC midnight.
    pub start_date: i64,
    /// Epoch milliseconds of the planned finish at UTC midnight.
    pub due_date: i64,
}

/// Epoch milliseconds of `date` at 00:00 UTC.
pub fn epoch_millis(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN)
        .and_utc()
        .timestamp_millis()
}

/// Tracker payloads in compiled-task order.
pub fn tracker_payloads(plan: &ProjectPlan) -> Result<Vec<TrackerTaskPayload>, PlanningError> {
    plan.compiled
        .iter()
        .map(|task| {
            let planned = planned_entry(plan, &task.task_code)?;
            Ok(TrackerTaskPayload {
                name: format!("[{}] {}", task.phase_code, task.task_name),
                description: task.description_md.clone(),
                start_date: epoch_millis(planned.planned_start),
                due_date: epoch_millis(planned.planned_finish),
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPathRow {
    /// 1-based position on the path.
    pub critical_path_order: usize,
    pub task_code: String,
}

pub fn critical_path_rows(result: &CriticalPathResult) -> Vec<CriticalPathRow> {
    result
        .path
        .iter()
        .enumerate()
        .map(|(i, code)| CriticalPathRow {
            critical_path_order: i + 1,
            task_code: code.clone(),
        })
        .collect()
}

/// A practical duration row ranked by its spread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarianceBottleneck {
    pub task_code: String,
    pub rule_scope: String,
    pub typical_days: f64,
    pub p90_days: f64,
    /// `p90_days - typical_days`.
    pub variance: f64,
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// The `top_n` practical rows with the widest p90 over typical spread.
///
/// Rows missing either value are left out. Equal spreads keep table order.
pub fn variance_bottlenecks(rows: &[PracticalDurationRow], top_n: usize) -> Vec<VarianceBottleneck> {
    let mut ranked: Vec<VarianceBottleneck> = rows
        .iter()
        .filter_map(|row| {
            let typical = row.typical_days.filter(|v| v.is_finite())?;
            let p90 = row.p90_days.filter(|v| v.is_finite())?;
            Some(VarianceBottleneck {
                task_code: row.task_code.clone(),
                rule_scope: row.rule_scope.clone(),
                typical_days: typical,
                p90_days: p90,
                variance: p90 - typical,
            })
        })
        .collect();
    ranked.sort_by(|a, b| descending(a.variance, b.variance));
    ranked.truncate(top_n);
    ranked
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedRisk {
    #[serde(flatten)]
    pub risk: RiskRow,
    /// probability x impact, 1..=25.
    pub score: u32,
}

/// The `top_n` risks by probability times impact. Equal scores keep table order.
pub fn top_risks(risks: &[RiskRow], top_n: usize) -> Vec<RankedRisk> {
    let mut ranked: Vec<RankedRisk> = risks
        .iter()
        .map(|risk| RankedRisk {
            score: u32::from(risk.probability_1_5) * u32::from(risk.impact_1_5),
            risk: risk.clone(),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(top_n);
    ranked
}
