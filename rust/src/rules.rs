//! Applicability rule engine.
//!
//! Matches a project profile against an ordered rule list and derives the set of
//! tasks that apply: the union of matched includes minus the union of matched
//! excludes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{ApplicabilityRule, Dimension, ProjectProfile, ANY};

/// Outcome of evaluating the rule list against one profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicability {
    /// Ids of matched rules in evaluation order (not deduplicated).
    pub matched_rule_ids: Vec<String>,
    /// Union of `include_tasks` over matched rules.
    pub included: BTreeSet<String>,
    /// Union of `exclude_tasks` over matched rules.
    pub excluded: BTreeSet<String>,
    /// `included - excluded`, sorted.
    pub final_tasks: BTreeSet<String>,
}

impl Applicability {
    pub fn has_matches(&self) -> bool {
        !self.matched_rule_ids.is_empty()
    }
}

fn dimension_matches(value: &str, accepted: Option<&[String]>) -> bool {
    match accepted {
        None => true,
        Some(codes) => codes.iter().any(|c| c == ANY || c == value),
    }
}

/// Whether every dimension clause of `rule` accepts the profile's value.
pub fn rule_matches(rule: &ApplicabilityRule, profile: &ProjectProfile) -> bool {
    Dimension::ALL
        .into_iter()
        .all(|dim| dimension_matches(profile.value(dim), rule.conditions.accepted(dim)))
}

/// Evaluate `rules` in order against `profile`.
///
/// No matching rule is not an error; it yields an empty selection.
pub fn evaluate(rules: &[ApplicabilityRule], profile: &ProjectProfile) -> Applicability {
    let mut result = Applicability::default();

    for rule in rules.iter().filter(|r| rule_matches(r, profile)) {
        result.matched_rule_ids.push(rule.rule_id.clone());
        result
            .included
            .extend(rule.apply.include_tasks.iter().cloned());
        result
            .excluded
            .extend(rule.apply.exclude_tasks.iter().cloned());
    }

    result.final_tasks = result
        .included
        .difference(&result.excluded)
        .cloned()
        .collect();
    result
}
