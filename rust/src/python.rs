//! Python bindings for the planning engine.
//!
//! Tables cross the boundary as JSON strings so the Python side can hand over
//! whatever its loader produced without mirroring every record as a pyclass.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;
use std::fmt::Display;

use crate::config::{DurationMode, PlanningConfig};
use crate::library::TaskLibrary;
use crate::models::{ApplicabilityRule, DependencyEdge, ProjectProfile};

fn value_error(e: impl Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn from_json<T: serde::de::DeserializeOwned>(what: &str, json: &str) -> PyResult<T> {
    serde_json::from_str(json).map_err(|e| PyValueError::new_err(format!("Invalid {what}: {e}")))
}

/// Evaluate applicability rules against a project profile.
///
/// # Arguments
/// * `rules_json` - JSON array of applicability rules
/// * `profile_json` - JSON object with the project profile
///
/// # Returns
/// * JSON object with `matched_rule_ids`, `included`, `excluded` and `final_tasks`
#[pyfunction]
fn evaluate_applicability(rules_json: &str, profile_json: &str) -> PyResult<String> {
    let rules: Vec<ApplicabilityRule> = from_json("rules", rules_json)?;
    let profile: ProjectProfile = from_json("profile", profile_json)?;
    let result = crate::rules::evaluate(&rules, &profile);
    serde_json::to_string(&result).map_err(value_error)
}

/// Run a full planning pass: applicability, compilation, scheduling and critical path.
///
/// # Arguments
/// * `library_json` - JSON object with every library table
/// * `profile_json` - JSON object with the project profile
/// * `duration_mode` - "statutory" or "practical"
/// * `fallback_to_practical` - Use practical durations when statutory ones are missing
/// * `verbosity` - 0 silent, 1 summary, 2 decisions, 3 debug (stderr)
/// * `plan_start` - Overrides the profile's plan start date
///
/// # Returns
/// * JSON object with the compiled tasks, planned dates, critical path and warnings
///
/// # Raises
/// * ValueError on malformed input, an unknown duration mode or a circular dependency
#[pyfunction]
#[pyo3(signature = (library_json, profile_json, duration_mode="practical", fallback_to_practical=true, verbosity=0, plan_start=None))]
fn plan_project(
    library_json: &str,
    profile_json: &str,
    duration_mode: &str,
    fallback_to_practical: bool,
    verbosity: u8,
    plan_start: Option<NaiveDate>,
) -> PyResult<String> {
    let library: TaskLibrary = from_json("library", library_json)?;
    let mut profile: ProjectProfile = from_json("profile", profile_json)?;
    if let Some(start) = plan_start {
        profile.plan_start_date = start;
    }
    let mode: DurationMode = duration_mode.parse().map_err(value_error)?;
    let config = PlanningConfig::new(mode, fallback_to_practical).with_verbosity(verbosity);

    let plan = crate::pipeline::plan_project(&library, &profile, &config).map_err(value_error)?;
    serde_json::to_string(&plan).map_err(value_error)
}

/// Validate a task library.
///
/// # Returns
/// * JSON object with `summary` counts and the list of `issues`
#[pyfunction]
fn validate_library(library_json: &str) -> PyResult<String> {
    let library: TaskLibrary = from_json("library", library_json)?;
    let report = crate::validation::validate_library(&library);
    serde_json::to_string(&report).map_err(value_error)
}

/// Compute the critical path over the given tasks.
///
/// # Arguments
/// * `task_codes` - Tasks to analyze
/// * `edges` - (predecessor, successor) pairs; edges outside `task_codes` are ignored
/// * `durations` - Days per task code; missing tasks weigh 0
///
/// # Returns
/// * (critical path task codes, total duration)
///
/// # Raises
/// * ValueError if circular dependency is detected
#[pyfunction]
fn critical_path(
    task_codes: Vec<String>,
    edges: Vec<(String, String)>,
    durations: HashMap<String, f64>,
) -> PyResult<(Vec<String>, f64)> {
    let edges: Vec<DependencyEdge> = edges
        .into_iter()
        .map(|(pred, succ)| DependencyEdge::fs(pred, succ))
        .collect();
    let result =
        crate::critical_path::critical_path(&task_codes, &edges, &durations).map_err(value_error)?;
    Ok((result.path, result.total_duration))
}

/// The regops_core Python module.
#[pymodule]
fn regops_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(evaluate_applicability, m)?)?;
    m.add_function(wrap_pyfunction!(plan_project, m)?)?;
    m.add_function(wrap_pyfunction!(validate_library, m)?)?;
    m.add_function(wrap_pyfunction!(critical_path, m)?)?;
    Ok(())
}
