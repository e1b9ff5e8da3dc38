use chrono::NaiveDate;
use regops_core::report::{critical_path_rows, export_rows, tracker_payloads};
use regops_core::{
    critical_path, plan_project, practical_duration_map, schedule, validate_library,
    DurationMode, PlanningConfig, PlanningError, ProjectProfile, TaskLibrary,
};
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn make_library() -> TaskLibrary {
    serde_json::from_value(json!({
        "tasks": [
            {"task_code": "A", "task_name": "Screening", "phase_code": "P1",
             "hard_legal_blocker": "yes", "parallelizable": "no", "default_order": 1},
            {"task_code": "B", "task_name": "Assessment", "phase_code": "P2",
             "hard_legal_blocker": "no", "parallelizable": "no", "default_order": 2},
            {"task_code": "C", "task_name": "Public notice", "phase_code": "P2",
             "hard_legal_blocker": "no", "parallelizable": "yes", "default_order": 3}
        ],
        "dependencies": [
            {"predecessor_task_code": "A", "successor_task_code": "B",
             "dependency_type": "FS", "lag_days": 0},
            {"predecessor_task_code": "A", "successor_task_code": "C",
             "dependency_type": "FS", "lag_days": null}
        ],
        "applicability_rules": [
            {"rule_id": "R_BASE",
             "match": {"classification": ["ANY"]},
             "apply": {"include_tasks": ["A", "B", "C"], "exclude_tasks": null}}
        ],
        "task_legal_basis": [
            {"task_code": "A", "instrument_code": "LAW_1", "article_ref": "Art. 4"},
            {"task_code": "B", "instrument_code": "LAW_1"},
            {"task_code": "C", "instrument_code": "DECREE_9", "article_ref": "Art. 12"}
        ],
        "statutory_durations": [
            {"task_code": "A", "rule_scope": "classification=CLASS_A", "max_days": 30,
             "notes": null}
        ],
        "practical_durations": [
            {"task_code": "A", "rule_scope": "", "typical_days": 2, "p10_days": 1, "p90_days": 4},
            {"task_code": "B", "rule_scope": "", "typical_days": 3, "p10_days": 2, "p90_days": 9},
            {"task_code": "C", "rule_scope": "", "typical_days": 1}
        ]
    }))
    .unwrap()
}

fn make_profile() -> ProjectProfile {
    serde_json::from_value(json!({
        "project_id": "SCH001",
        "project_name": "Solar Park North",
        "plan_start_date": "2024-01-01",
        "classification": "CLASS_A",
        "environmental_regime": "EIA_FULL",
        "project_type": "PV",
        "grid_interaction": "TSO",
        "capacity_band": "50_100MW",
        "regulatory_path": "STANDARD",
        "location_constraint": "NONE"
    }))
    .unwrap()
}

#[test]
fn test_practical_plan_dates_and_critical_path() {
    let plan = plan_project(&make_library(), &make_profile(), &PlanningConfig::default()).unwrap();

    let expected = [
        ("A", date(2024, 1, 1), date(2024, 1, 3)),
        ("B", date(2024, 1, 3), date(2024, 1, 6)),
        ("C", date(2024, 1, 3), date(2024, 1, 4)),
    ];
    for (code, start, finish) in expected {
        let planned = plan.planned_for(code).unwrap();
        assert_eq!(planned.planned_start, start, "start of {code}");
        assert_eq!(planned.planned_finish, finish, "finish of {code}");
    }

    assert_eq!(plan.critical_path.path, vec!["A", "B"]);
    assert_eq!(plan.critical_path.total_duration, 5.0);
    assert!(plan.warnings.is_empty());

    let a = &plan.compiled[0];
    assert_eq!(a.legal_basis, "LAW_1 Art. 4");
    assert!(a.hard_legal_blocker);
    assert_eq!(a.statutory_max_days, Some(30.0));
    assert!(a.description_md.contains("- **Matched Rule IDs:** R_BASE"));
}

#[test]
fn test_statutory_plan_uses_statutory_max_with_fallback() {
    let config = PlanningConfig::new(DurationMode::Statutory, true);
    let plan = plan_project(&make_library(), &make_profile(), &config).unwrap();

    assert_eq!(plan.planned_for("A").unwrap().planned_finish, date(2024, 1, 31));
    assert_eq!(plan.planned_for("B").unwrap().planned_start, date(2024, 1, 31));
    assert_eq!(plan.critical_path.total_duration, 33.0);
}

#[test]
fn test_report_shapes_follow_the_plan() {
    let plan = plan_project(&make_library(), &make_profile(), &PlanningConfig::default()).unwrap();

    let rows = export_rows(&plan).unwrap();
    let codes: Vec<&str> = rows.iter().map(|r| r.task_code.as_str()).collect();
    assert_eq!(codes, vec!["A", "B", "C"]);

    let payloads = tracker_payloads(&plan).unwrap();
    assert_eq!(payloads[2].name, "[P2] Public notice");

    let cp_rows = critical_path_rows(&plan.critical_path);
    assert_eq!(cp_rows.len(), 2);
    assert_eq!(cp_rows[1].critical_path_order, 2);
}

#[test]
fn test_standalone_analyzer_matches_pipeline() {
    let library = make_library();
    let durations = practical_duration_map(&library.practical_durations);
    let codes: Vec<&str> = library.tasks.iter().map(|t| t.task_code.as_str()).collect();
    let result = critical_path(&codes, &library.dependencies, &durations).unwrap();
    assert_eq!(result.path, vec!["A", "B"]);
    assert_eq!(result.total_duration, 5.0);
}

#[test]
fn test_cycle_fails_scheduler_and_analyzer() {
    let mut library = make_library();
    library
        .dependencies
        .push(serde_json::from_value(json!({
            "predecessor_task_code": "B", "successor_task_code": "A", "dependency_type": "SS"
        }))
        .unwrap());

    let plan = plan_project(&library, &make_profile(), &PlanningConfig::default());
    assert!(matches!(plan, Err(PlanningError::CircularDependency { .. })));

    let durations = practical_duration_map(&library.practical_durations);
    let result = critical_path(&["A", "B", "C"], &library.dependencies, &durations);
    assert_eq!(
        result.unwrap_err(),
        PlanningError::CircularDependency {
            tasks: vec!["A".to_string(), "B".to_string(), "C".to_string()]
        }
    );

    let report = validate_library(&library);
    assert!(report.codes().contains(&"DEP_CYCLE"));
}

#[test]
fn test_schedule_entry_point_without_pipeline() {
    let plan = plan_project(&make_library(), &make_profile(), &PlanningConfig::default()).unwrap();
    let planned = schedule(
        &plan.compiled,
        &make_library().dependencies,
        date(2024, 2, 1),
        DurationMode::Practical,
        true,
    )
    .unwrap();
    assert_eq!(planned["B"].planned_start, date(2024, 2, 3));
}
