//! Duration override scopes and specificity ranking.
//!
//! A `rule_scope` string either names a rule id literally (`R_012`) or carries
//! dimension filters, bare or wrapped: `classification=CLASS_A`,
//! `DIM[classification=CLASS_A;environmental_regime=EIA_FULL|EIA_SIMPLE]`.
//! Filters are separated by `;`, `,` or `&`; alternative values by `|`.

use crate::models::{Dimension, ProjectProfile, ANY};

/// Score for a scope whose classification filter accepts the profile.
pub const CLASSIFICATION_WEIGHT: u32 = 3;
/// Score for a scope whose environmental-regime filter accepts the profile.
pub const ENVIRONMENTAL_REGIME_WEIGHT: u32 = 2;
/// Score for a scope that is literally one of the matched rule ids.
pub const RULE_ID_WEIGHT: u32 = 2;

/// A parsed `rule_scope`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleScope<'a> {
    raw: &'a str,
    filters: Vec<(Dimension, Vec<&'a str>)>,
}

impl<'a> RuleScope<'a> {
    pub fn parse(scope: &'a str) -> Self {
        let raw = scope.trim();
        let body = raw
            .strip_prefix("DIM[")
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(raw);

        let filters = body
            .split([';', ',', '&'])
            .filter_map(|part| part.split_once('='))
            .filter_map(|(key, values)| {
                let dim = Dimension::from_name(key.trim())?;
                let values = values.split('|').map(str::trim).collect();
                Some((dim, values))
            })
            .collect();

        Self { raw, filters }
    }

    /// The trimmed scope text.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Values the scope filters `dimension` on, if it filters on it at all.
    pub fn filter(&self, dimension: Dimension) -> Option<&[&'a str]> {
        self.filters
            .iter()
            .find(|(dim, _)| *dim == dimension)
            .map(|(_, values)| values.as_slice())
    }

    /// Whether the scope filters `dimension` to the profile's value or `ANY`.
    pub fn targets(&self, dimension: Dimension, profile: &ProjectProfile) -> bool {
        let value = profile.value(dimension);
        self.filter(dimension)
            .is_some_and(|values| values.iter().any(|v| *v == ANY || *v == value))
    }
}

/// Which parts of a scope target the current profile.
///
/// Ordered by [`Specificity::score`]; the weights are fixed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Specificity {
    pub classification: bool,
    pub environmental_regime: bool,
    pub rule_id: bool,
}

impl Specificity {
    pub fn of(scope: &str, profile: &ProjectProfile, matched_rule_ids: &[String]) -> Self {
        let scope = RuleScope::parse(scope);
        Self {
            classification: scope.targets(Dimension::Classification, profile),
            environmental_regime: scope.targets(Dimension::EnvironmentalRegime, profile),
            rule_id: matched_rule_ids.iter().any(|id| id == scope.raw()),
        }
    }

    pub fn score(&self) -> u32 {
        let mut score = 0;
        if self.classification {
            score += CLASSIFICATION_WEIGHT;
        }
        if self.environmental_regime {
            score += ENVIRONMENTAL_REGIME_WEIGHT;
        }
        if self.rule_id {
            score += RULE_ID_WEIGHT;
        }
        score
    }
}

/// Pick the highest-scoring usable row.
///
/// Rows for which `usable` is false are skipped. Ties keep table order: the
/// first row reaching the best score wins.
pub fn most_specific<'r, R>(
    rows: impl IntoIterator<Item = &'r R>,
    scope_of: impl Fn(&R) -> &str,
    usable: impl Fn(&R) -> bool,
    profile: &ProjectProfile,
    matched_rule_ids: &[String],
) -> Option<&'r R>
where
    R: 'r,
{
    let mut best: Option<(u32, &'r R)> = None;
    for row in rows.into_iter().filter(|r| usable(r)) {
        let score = Specificity::of(scope_of(row), profile, matched_rule_ids).score();
        if best.map_or(true, |(best_score, _)| score > best_score) {
            best = Some((score, row));
        }
    }
    best.map(|(_, row)| row)
}
