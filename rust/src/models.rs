//! Core data types for the planning engine.
//!
//! Every table row is a typed record. Records derive serde so the library loader
//! can decode YAML/CSV/JSON rows straight into them.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Wildcard accepted by rule match clauses and duration scopes.
pub const ANY: &str = "ANY";

/// Instrument code marking a task that deliberately has no legal basis.
pub const NO_LEGAL_BASIS: &str = "NO_LEGAL_BASIS";

/// The seven categorical dimensions of a project profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Classification,
    EnvironmentalRegime,
    ProjectType,
    GridInteraction,
    CapacityBand,
    RegulatoryPath,
    LocationConstraint,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Classification,
        Dimension::EnvironmentalRegime,
        Dimension::ProjectType,
        Dimension::GridInteraction,
        Dimension::CapacityBand,
        Dimension::RegulatoryPath,
        Dimension::LocationConstraint,
    ];

    /// Field name used in profiles, rule clauses and duration scopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::EnvironmentalRegime => "environmental_regime",
            Self::ProjectType => "project_type",
            Self::GridInteraction => "grid_interaction",
            Self::CapacityBand => "capacity_band",
            Self::RegulatoryPath => "regulatory_path",
            Self::LocationConstraint => "location_constraint",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The project being planned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectProfile {
    pub project_id: String,
    #[serde(default)]
    pub project_name: String,
    pub plan_start_date: NaiveDate,
    pub classification: String,
    pub environmental_regime: String,
    pub project_type: String,
    pub grid_interaction: String,
    pub capacity_band: String,
    pub regulatory_path: String,
    pub location_constraint: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, serde_json::Value>,
}

impl ProjectProfile {
    /// Create a profile with every dimension left empty.
    pub fn new(project_id: impl Into<String>, plan_start_date: NaiveDate) -> Self {
        let project_id = project_id.into();
        Self {
            project_name: project_id.clone(),
            project_id,
            plan_start_date,
            classification: String::new(),
            environmental_regime: String::new(),
            project_type: String::new(),
            grid_interaction: String::new(),
            capacity_band: String::new(),
            regulatory_path: String::new(),
            location_constraint: String::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn with_dimension(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        let value = value.into();
        match dimension {
            Dimension::Classification => self.classification = value,
            Dimension::EnvironmentalRegime => self.environmental_regime = value,
            Dimension::ProjectType => self.project_type = value,
            Dimension::GridInteraction => self.grid_interaction = value,
            Dimension::CapacityBand => self.capacity_band = value,
            Dimension::RegulatoryPath => self.regulatory_path = value,
            Dimension::LocationConstraint => self.location_constraint = value,
        }
        self
    }

    /// The profile's code for a dimension.
    pub fn value(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Classification => &self.classification,
            Dimension::EnvironmentalRegime => &self.environmental_regime,
            Dimension::ProjectType => &self.project_type,
            Dimension::GridInteraction => &self.grid_interaction,
            Dimension::CapacityBand => &self.capacity_band,
            Dimension::RegulatoryPath => &self.regulatory_path,
            Dimension::LocationConstraint => &self.location_constraint,
        }
    }
}

fn unknown_rule_id() -> String {
    "UNKNOWN".to_string()
}

/// Treat an explicit `null` list the same as a missing one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Per-dimension lists of accepted codes. A missing clause accepts anything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environmental_regime: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_interaction: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_band: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulatory_path: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_constraint: Option<Vec<String>>,
}

impl RuleMatch {
    /// Accepted codes for a dimension, or `None` when the clause is omitted.
    pub fn accepted(&self, dimension: Dimension) -> Option<&[String]> {
        let clause = match dimension {
            Dimension::Classification => &self.classification,
            Dimension::EnvironmentalRegime => &self.environmental_regime,
            Dimension::ProjectType => &self.project_type,
            Dimension::GridInteraction => &self.grid_interaction,
            Dimension::CapacityBand => &self.capacity_band,
            Dimension::RegulatoryPath => &self.regulatory_path,
            Dimension::LocationConstraint => &self.location_constraint,
        };
        clause.as_deref()
    }

    pub fn with(mut self, dimension: Dimension, codes: &[&str]) -> Self {
        let codes = Some(codes.iter().map(|c| c.to_string()).collect());
        match dimension {
            Dimension::Classification => self.classification = codes,
            Dimension::EnvironmentalRegime => self.environmental_regime = codes,
            Dimension::ProjectType => self.project_type = codes,
            Dimension::GridInteraction => self.grid_interaction = codes,
            Dimension::CapacityBand => self.capacity_band = codes,
            Dimension::RegulatoryPath => self.regulatory_path = codes,
            Dimension::LocationConstraint => self.location_constraint = codes,
        }
        self
    }
}

/// Task codes a matched rule adds to or removes from the selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleApply {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub include_tasks: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub exclude_tasks: Vec<String>,
}

/// A conditional clause over the profile dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicabilityRule {
    #[serde(default = "unknown_rule_id")]
    pub rule_id: String,
    #[serde(rename = "match", default)]
    pub conditions: RuleMatch,
    #[serde(default)]
    pub apply: RuleApply,
}

impl ApplicabilityRule {
    pub fn new(rule_id: impl Into<String>, conditions: RuleMatch) -> Self {
        Self {
            rule_id: rule_id.into(),
            conditions,
            apply: RuleApply::default(),
        }
    }

    pub fn including(mut self, codes: &[&str]) -> Self {
        self.apply
            .include_tasks
            .extend(codes.iter().map(|c| c.to_string()));
        self
    }

    pub fn excluding(mut self, codes: &[&str]) -> Self {
        self.apply
            .exclude_tasks
            .extend(codes.iter().map(|c| c.to_string()));
        self
    }
}

/// Accepts `true`/`false` or the library's `"yes"`/`"no"` spelling.
fn yes_no<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "yes" | "true"),
    })
}

/// A procedural task in the library.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task_code: String,
    pub task_name: String,
    pub phase_code: String,
    #[serde(default)]
    pub task_description_md: String,
    #[serde(default, deserialize_with = "yes_no")]
    pub hard_legal_blocker: bool,
    #[serde(default, deserialize_with = "yes_no")]
    pub parallelizable: bool,
    #[serde(default)]
    pub default_order: i64,
}

impl TaskDefinition {
    pub fn new(
        task_code: impl Into<String>,
        task_name: impl Into<String>,
        phase_code: impl Into<String>,
        default_order: i64,
    ) -> Self {
        Self {
            task_code: task_code.into(),
            task_name: task_name.into(),
            phase_code: phase_code.into(),
            task_description_md: String::new(),
            hard_legal_blocker: false,
            parallelizable: false,
            default_order,
        }
    }
}

/// Precedence constraint type between two tasks.
///
/// Unknown strings are preserved so validation can report them; the scheduler
/// treats them as finish-to-start.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DependencyType {
    FinishToStart,
    StartToStart,
    FinishToFinish,
    Unrecognized(String),
}

impl DependencyType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::FinishToStart => "FS",
            Self::StartToStart => "SS",
            Self::FinishToFinish => "FF",
            Self::Unrecognized(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for DependencyType {
    fn from(s: String) -> Self {
        match s.trim() {
            "FS" => Self::FinishToStart,
            "SS" => Self::StartToStart,
            "FF" => Self::FinishToFinish,
            _ => Self::Unrecognized(s),
        }
    }
}

impl From<&str> for DependencyType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<DependencyType> for String {
    fn from(t: DependencyType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed precedence edge between two tasks, with an optional lag in days.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub predecessor_task_code: String,
    pub successor_task_code: String,
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub lag_days: Option<f64>,
}

impl DependencyEdge {
    pub fn new(
        predecessor: impl Into<String>,
        successor: impl Into<String>,
        dependency_type: DependencyType,
        lag_days: f64,
    ) -> Self {
        Self {
            predecessor_task_code: predecessor.into(),
            successor_task_code: successor.into(),
            dependency_type,
            lag_days: Some(lag_days),
        }
    }

    /// Finish-to-start with no lag.
    pub fn fs(predecessor: impl Into<String>, successor: impl Into<String>) -> Self {
        Self::new(predecessor, successor, DependencyType::FinishToStart, 0.0)
    }

    pub fn lag(&self) -> f64 {
        self.lag_days.filter(|l| !l.is_nan()).unwrap_or(0.0)
    }
}

/// A legal-basis pointer for a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalBasisRow {
    pub task_code: String,
    #[serde(default)]
    pub instrument_code: String,
    #[serde(default)]
    pub article_ref: Option<String>,
}

/// Responsible actor and competent authority for a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRoleRow {
    pub task_code: String,
    #[serde(default)]
    pub actor_role_code: Option<String>,
    #[serde(default)]
    pub authority_name: Option<String>,
}

/// A statutory maximum-duration override, scoped by `rule_scope`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatutoryDurationRow {
    pub task_code: String,
    #[serde(default)]
    pub rule_scope: String,
    #[serde(default)]
    pub max_days: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A practical duration estimate (typical, p10, p90), scoped by `rule_scope`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PracticalDurationRow {
    pub task_code: String,
    #[serde(default)]
    pub rule_scope: String,
    #[serde(default)]
    pub typical_days: Option<f64>,
    #[serde(default)]
    pub p10_days: Option<f64>,
    #[serde(default)]
    pub p90_days: Option<f64>,
}

/// A risk register entry attached to a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskRow {
    pub risk_id: String,
    pub task_code: String,
    pub probability_1_5: u8,
    pub impact_1_5: u8,
    #[serde(default)]
    pub risk_level: String,
}

/// A task enriched with legal basis, roles and resolved durations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompiledTask {
    pub task_code: String,
    pub task_name: String,
    pub phase_code: String,
    pub description_md: String,
    pub hard_legal_blocker: bool,
    pub parallelizable: bool,
    pub default_order: i64,
    pub legal_basis: String,
    pub actor_role: Option<String>,
    pub competent_authority: Option<String>,
    pub statutory_max_days: Option<f64>,
    pub practical_typical_days: Option<f64>,
    pub practical_p10_days: Option<f64>,
    pub practical_p90_days: Option<f64>,
    pub matched_rule_ids: Vec<String>,
}

/// A task placed on the calendar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub task_code: String,
    pub planned_start: NaiveDate,
    pub planned_finish: NaiveDate,
    pub duration_days: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_names_round_trip() {
        for dim in Dimension::ALL {
            assert_eq!(Dimension::from_name(dim.as_str()), Some(dim));
        }
        assert_eq!(Dimension::from_name("colour"), None);
    }

    #[test]
    fn test_dependency_type_keeps_unknown_text() {
        assert_eq!(DependencyType::from("SS"), DependencyType::StartToStart);
        let odd = DependencyType::from("SF");
        assert!(!odd.is_recognized());
        assert_eq!(odd.as_str(), "SF");
    }

    #[test]
    fn test_rule_deserializes_with_missing_clauses() {
        let rule: ApplicabilityRule = serde_json::from_str(
            r#"{
                "rule_id": "R1",
                "match": {"classification": ["A1"]},
                "apply": {"include_tasks": ["T1"], "exclude_tasks": null}
            }"#,
        )
        .unwrap();
        assert_eq!(rule.rule_id, "R1");
        assert_eq!(
            rule.conditions.accepted(Dimension::Classification),
            Some(&["A1".to_string()][..])
        );
        assert_eq!(rule.conditions.accepted(Dimension::ProjectType), None);
        assert!(rule.apply.exclude_tasks.is_empty());
    }

    #[test]
    fn test_rule_without_id_is_unknown() {
        let rule: ApplicabilityRule = serde_json::from_str(r#"{"match": {}}"#).unwrap();
        assert_eq!(rule.rule_id, "UNKNOWN");
    }

    #[test]
    fn test_task_flags_accept_yes_no() {
        let task: TaskDefinition = serde_json::from_str(
            r#"{
                "task_code": "T1",
                "task_name": "Submit application",
                "phase_code": "P1",
                "hard_legal_blocker": "Yes",
                "parallelizable": false,
                "default_order": 10
            }"#,
        )
        .unwrap();
        assert!(task.hard_legal_blocker);
        assert!(!task.parallelizable);
    }

    #[test]
    fn test_edge_lag_defaults_to_zero() {
        let edge: DependencyEdge = serde_json::from_str(
            r#"{"predecessor_task_code": "A", "successor_task_code": "B", "dependency_type": "FF"}"#,
        )
        .unwrap();
        assert_eq!(edge.dependency_type, DependencyType::FinishToFinish);
        assert_eq!(edge.lag(), 0.0);
    }

    #[test]
    fn test_profile_value_by_dimension() {
        let profile = ProjectProfile::new("P1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_dimension(Dimension::CapacityBand, "CB_LARGE");
        assert_eq!(profile.value(Dimension::CapacityBand), "CB_LARGE");
        assert_eq!(profile.value(Dimension::Classification), "");
        assert_eq!(profile.project_name, "P1");
    }
}
