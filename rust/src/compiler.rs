//! Task compiler: enriches each applicable task with its legal basis, roles and
//! best-fit duration estimates.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::library::LibraryIndex;
use crate::models::{
    CompiledTask, LegalBasisRow, PracticalDurationRow, ProjectProfile, StatutoryDurationRow,
    TaskDefinition, TaskRoleRow, NO_LEGAL_BASIS,
};
use crate::scope::most_specific;

/// Practical duration triple taken from a single override row.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PracticalEstimate {
    pub typical_days: Option<f64>,
    pub p10_days: Option<f64>,
    pub p90_days: Option<f64>,
}

fn usable(value: Option<f64>) -> bool {
    value.is_some_and(f64::is_finite)
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Join the task's legal-basis pointers as `"<instrument> <article>"`,
/// deduplicated and sorted, separated by `"; "`.
///
/// Returns [`NO_LEGAL_BASIS`] when no row contributes anything.
pub fn aggregate_legal_basis(rows: &[&LegalBasisRow]) -> String {
    let mut parts: BTreeSet<String> = BTreeSet::new();
    for row in rows {
        let instrument = row.instrument_code.trim();
        if instrument == NO_LEGAL_BASIS {
            parts.insert(NO_LEGAL_BASIS.to_string());
            continue;
        }
        if instrument.is_empty() {
            continue;
        }
        match non_blank(row.article_ref.as_ref()) {
            Some(article) => parts.insert(format!("{instrument} {article}")),
            None => parts.insert(instrument.to_string()),
        };
    }

    if parts.is_empty() {
        return NO_LEGAL_BASIS.to_string();
    }
    parts.into_iter().collect::<Vec<_>>().join("; ")
}

/// Actor role and competent authority from the first role row, in table order.
pub fn primary_role(rows: &[&TaskRoleRow]) -> (Option<String>, Option<String>) {
    match rows.first() {
        Some(row) => (
            non_blank(row.actor_role_code.as_ref()),
            non_blank(row.authority_name.as_ref()),
        ),
        None => (None, None),
    }
}

/// Statutory maximum days from the most specific row that carries a value.
pub fn pick_statutory_duration(
    rows: &[&StatutoryDurationRow],
    profile: &ProjectProfile,
    matched_rule_ids: &[String],
) -> Option<f64> {
    most_specific(
        rows.iter().copied(),
        |r| r.rule_scope.as_str(),
        |r| usable(r.max_days),
        profile,
        matched_rule_ids,
    )
    .and_then(|r| r.max_days)
}

/// Practical estimate from the most specific row that carries a typical value.
///
/// The whole triple comes from that one row; p10/p90 are not merged across rows.
pub fn pick_practical_duration(
    rows: &[&PracticalDurationRow],
    profile: &ProjectProfile,
    matched_rule_ids: &[String],
) -> PracticalEstimate {
    most_specific(
        rows.iter().copied(),
        |r| r.rule_scope.as_str(),
        |r| usable(r.typical_days),
        profile,
        matched_rule_ids,
    )
    .map(|r| PracticalEstimate {
        typical_days: r.typical_days,
        p10_days: r.p10_days.filter(|v| v.is_finite()),
        p90_days: r.p90_days.filter(|v| v.is_finite()),
    })
    .unwrap_or_default()
}

fn fmt_days(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

/// Markdown block appended to every task description for traceability.
fn traceability_block(task: &CompiledTask, profile: &ProjectProfile) -> String {
    let mut md = String::from("\n\n---\n**RegOps Traceability**\n\n");
    // Writing into a String cannot fail.
    let _ = writeln!(md, "- **Task Code:** `{}`", task.task_code);
    let _ = writeln!(
        md,
        "- **Profile:** `{}` ({}, {}, {})",
        profile.project_id, profile.project_type, profile.classification, profile.environmental_regime
    );
    let _ = writeln!(md, "- **Legal Basis:** {}", task.legal_basis);
    if let Some(days) = task.statutory_max_days {
        let _ = writeln!(md, "- **Statutory Max Days (planned):** {days}");
    }
    if let Some(days) = task.practical_typical_days {
        let _ = writeln!(
            md,
            "- **Practical Typical Days (overlay):** {days} (P10={}, P90={})",
            fmt_days(task.practical_p10_days),
            fmt_days(task.practical_p90_days)
        );
    }
    if let Some(role) = &task.actor_role {
        let _ = writeln!(md, "- **Actor Role:** {role}");
    }
    if let Some(authority) = &task.competent_authority {
        let _ = writeln!(md, "- **Competent Authority:** {authority}");
    }
    let _ = writeln!(
        md,
        "- **Matched Rule IDs:** {}",
        task.matched_rule_ids.join(", ")
    );
    md
}

/// Compile a single task definition against the profile.
pub fn compile_task(
    definition: &TaskDefinition,
    index: &LibraryIndex<'_>,
    profile: &ProjectProfile,
    matched_rule_ids: &[String],
) -> CompiledTask {
    let rows = index.rows(&definition.task_code);
    let (actor_role, competent_authority) = primary_role(&rows.roles);
    let practical = pick_practical_duration(&rows.practical, profile, matched_rule_ids);

    let mut task = CompiledTask {
        task_code: definition.task_code.clone(),
        task_name: definition.task_name.clone(),
        phase_code: definition.phase_code.clone(),
        description_md: String::new(),
        hard_legal_blocker: definition.hard_legal_blocker,
        parallelizable: definition.parallelizable,
        default_order: definition.default_order,
        legal_basis: aggregate_legal_basis(&rows.legal_basis),
        actor_role,
        competent_authority,
        statutory_max_days: pick_statutory_duration(&rows.statutory, profile, matched_rule_ids),
        practical_typical_days: practical.typical_days,
        practical_p10_days: practical.p10_days,
        practical_p90_days: practical.p90_days,
        matched_rule_ids: matched_rule_ids.to_vec(),
    };
    task.description_md = format!(
        "{}{}",
        definition.task_description_md,
        traceability_block(&task, profile)
    );
    task
}

/// Compile every selected task, ordered by (default_order, task_code).
///
/// Selected codes without a task definition are skipped; the planning pipeline
/// reports them as warnings.
pub fn compile_tasks(
    selected: &BTreeSet<String>,
    index: &LibraryIndex<'_>,
    profile: &ProjectProfile,
    matched_rule_ids: &[String],
) -> Vec<CompiledTask> {
    let mut definitions: Vec<&TaskDefinition> =
        selected.iter().filter_map(|code| index.task(code)).collect();
    definitions.sort_by(|a, b| {
        a.default_order
            .cmp(&b.default_order)
            .then_with(|| a.task_code.cmp(&b.task_code))
    });

    definitions
        .into_iter()
        .map(|definition| compile_task(definition, index, profile, matched_rule_ids))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::TaskLibrary;
    use crate::models::Dimension;
    use chrono::NaiveDate;

    fn make_profile() -> ProjectProfile {
        ProjectProfile::new("SCH001", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_dimension(Dimension::Classification, "CLASS_A")
            .with_dimension(Dimension::EnvironmentalRegime, "EIA_FULL")
            .with_dimension(Dimension::ProjectType, "PV")
    }

    fn basis(task: &str, instrument: &str, article: Option<&str>) -> LegalBasisRow {
        LegalBasisRow {
            task_code: task.to_string(),
            instrument_code: instrument.to_string(),
            article_ref: article.map(str::to_string),
        }
    }

    fn statutory(task: &str, scope: &str, max_days: Option<f64>) -> StatutoryDurationRow {
        StatutoryDurationRow {
            task_code: task.to_string(),
            rule_scope: scope.to_string(),
            max_days,
            notes: None,
        }
    }

    fn practical(task: &str, scope: &str, typical: Option<f64>, p10: f64, p90: f64) -> PracticalDurationRow {
        PracticalDurationRow {
            task_code: task.to_string(),
            rule_scope: scope.to_string(),
            typical_days: typical,
            p10_days: Some(p10),
            p90_days: Some(p90),
        }
    }

    #[test]
    fn test_legal_basis_dedup_sorted() {
        let rows = [
            basis("T1", "LAW_4014", Some("Art. 3")),
            basis("T1", "EU_2011_92", None),
            basis("T1", "LAW_4014", Some("Art. 3")),
            basis("T1", "", Some("Art. 9")),
        ];
        let refs: Vec<&LegalBasisRow> = rows.iter().collect();
        assert_eq!(aggregate_legal_basis(&refs), "EU_2011_92; LAW_4014 Art. 3");
    }

    #[test]
    fn test_legal_basis_marker_and_default() {
        let marker = basis("T1", NO_LEGAL_BASIS, Some("ignored"));
        assert_eq!(aggregate_legal_basis(&[&marker]), NO_LEGAL_BASIS);
        assert_eq!(aggregate_legal_basis(&[]), NO_LEGAL_BASIS);
    }

    #[test]
    fn test_primary_role_is_first_row() {
        let first = TaskRoleRow {
            task_code: "T1".to_string(),
            actor_role_code: Some("DEVELOPER".to_string()),
            authority_name: Some(" ".to_string()),
        };
        let second = TaskRoleRow {
            task_code: "T1".to_string(),
            actor_role_code: Some("MINISTRY".to_string()),
            authority_name: Some("Ministry of Environment".to_string()),
        };
        assert_eq!(
            primary_role(&[&first, &second]),
            (Some("DEVELOPER".to_string()), None)
        );
        assert_eq!(primary_role(&[]), (None, None));
    }

    #[test]
    fn test_statutory_prefers_most_specific_numeric_row() {
        let rows = [
            statutory("T1", "", Some(90.0)),
            statutory("T1", "DIM[classification=CLASS_A;environmental_regime=EIA_FULL]", None),
            statutory("T1", "classification=CLASS_A", Some(60.0)),
            statutory("T1", "R_PV", Some(45.0)),
        ];
        let refs: Vec<_> = rows.iter().collect();
        let matched = vec!["R_PV".to_string()];
        // The score-5 row has no value; the classification row (3) beats the rule row (2).
        assert_eq!(pick_statutory_duration(&refs, &make_profile(), &matched), Some(60.0));
    }

    #[test]
    fn test_statutory_none_when_no_values() {
        let rows = [statutory("T1", "classification=CLASS_A", None)];
        let refs: Vec<_> = rows.iter().collect();
        assert_eq!(pick_statutory_duration(&refs, &make_profile(), &[]), None);
    }

    #[test]
    fn test_practical_triple_from_single_row() {
        let rows = [
            practical("T1", "", Some(20.0), 10.0, 40.0),
            practical("T1", "environmental_regime=EIA_FULL", Some(30.0), 25.0, 70.0),
            practical("T1", "classification=CLASS_A", None, 1.0, 2.0),
        ];
        let refs: Vec<_> = rows.iter().collect();
        let estimate = pick_practical_duration(&refs, &make_profile(), &[]);
        assert_eq!(
            estimate,
            PracticalEstimate {
                typical_days: Some(30.0),
                p10_days: Some(25.0),
                p90_days: Some(70.0),
            }
        );
    }

    #[test]
    fn test_compile_orders_and_enriches() {
        let mut late = TaskDefinition::new("T_B", "Grid connection offer", "P2", 20);
        late.task_description_md = "Request the offer.".to_string();
        let library = TaskLibrary {
            tasks: vec![
                late,
                TaskDefinition::new("T_C", "Site survey", "P1", 10),
                TaskDefinition::new("T_A", "Pre-screening", "P1", 10),
                TaskDefinition::new("T_X", "Not selected", "P9", 0),
            ],
            task_legal_basis: vec![basis("T_B", "LAW_4685", Some("Art. 12"))],
            task_roles: vec![TaskRoleRow {
                task_code: "T_B".to_string(),
                actor_role_code: Some("TSO".to_string()),
                authority_name: Some("IPTO".to_string()),
            }],
            statutory_durations: vec![statutory("T_B", "classification=ANY", Some(40.0))],
            practical_durations: vec![practical("T_B", "", Some(55.0), 30.0, 120.0)],
            ..TaskLibrary::default()
        };
        let index = LibraryIndex::build(&library);
        let selected: BTreeSet<String> = ["T_B", "T_C", "T_A", "T_MISSING"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let matched = vec!["R1".to_string(), "R2".to_string()];

        let compiled = compile_tasks(&selected, &index, &make_profile(), &matched);
        let codes: Vec<&str> = compiled.iter().map(|t| t.task_code.as_str()).collect();
        assert_eq!(codes, vec!["T_A", "T_C", "T_B"]);

        let offer = &compiled[2];
        assert_eq!(offer.legal_basis, "LAW_4685 Art. 12");
        assert_eq!(offer.actor_role.as_deref(), Some("TSO"));
        assert_eq!(offer.statutory_max_days, Some(40.0));
        assert_eq!(offer.practical_typical_days, Some(55.0));
        assert!(offer.description_md.starts_with("Request the offer."));
        assert!(offer.description_md.contains("- **Task Code:** `T_B`"));
        assert!(offer.description_md.contains("- **Statutory Max Days (planned):** 40"));
        assert!(offer.description_md.contains("(P10=30, P90=120)"));
        assert!(offer.description_md.contains("- **Matched Rule IDs:** R1, R2"));

        let survey = &compiled[1];
        assert_eq!(survey.legal_basis, NO_LEGAL_BASIS);
        assert_eq!(survey.statutory_max_days, None);
        assert_eq!(survey.practical_typical_days, None);
        assert!(!survey.description_md.contains("Statutory Max Days"));
        assert!(!survey.description_md.contains("Actor Role"));
    }
}
