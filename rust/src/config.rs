//! Configuration for a planning run.
//!
//! A [`PlanningConfig`] is built once by the caller and passed by reference into
//! every entry point; nothing is read from process-wide state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PlanningError;

/// Which duration estimate the scheduler plans with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationMode {
    /// Statutory maximum days, optionally falling back to practical typical days.
    Statutory,
    /// Practical typical days, falling back to statutory maximum days.
    #[default]
    Practical,
}

impl DurationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statutory => "statutory",
            Self::Practical => "practical",
        }
    }
}

impl fmt::Display for DurationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationMode {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "statutory" => Ok(Self::Statutory),
            "practical" => Ok(Self::Practical),
            _ => Err(PlanningError::UnknownDurationMode(s.to_string())),
        }
    }
}

/// Configuration for scheduling and logging.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Duration source used by the scheduler.
    pub duration_mode: DurationMode,
    /// In statutory mode, use practical typical days when no statutory maximum resolves.
    pub fallback_to_practical: bool,
    /// Verbosity level: 0=silent, 1=summary, 2=decisions, 3=debug.
    pub verbosity: u8,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            duration_mode: DurationMode::Practical,
            fallback_to_practical: true,
            verbosity: 0,
        }
    }
}

impl PlanningConfig {
    pub fn new(duration_mode: DurationMode, fallback_to_practical: bool) -> Self {
        Self {
            duration_mode,
            fallback_to_practical,
            ..Self::default()
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_config_defaults() {
        let config = PlanningConfig::default();
        assert_eq!(config.duration_mode, DurationMode::Practical);
        assert!(config.fallback_to_practical);
        assert_eq!(config.verbosity, 0);
    }

    #[rstest]
    #[case("statutory", DurationMode::Statutory)]
    #[case("practical", DurationMode::Practical)]
    #[case(" Statutory ", DurationMode::Statutory)]
    #[case("PRACTICAL", DurationMode::Practical)]
    fn test_duration_mode_parse(#[case] input: &str, #[case] expected: DurationMode) {
        assert_eq!(input.parse::<DurationMode>().unwrap(), expected);
    }

    #[test]
    fn test_duration_mode_parse_unknown() {
        let err = "calendar".parse::<DurationMode>().unwrap_err();
        assert_eq!(err, PlanningError::UnknownDurationMode("calendar".to_string()));
    }

    #[test]
    fn test_config_deserializes_partial_json() {
        let config: PlanningConfig =
            serde_json::from_str(r#"{"duration_mode": "statutory"}"#).unwrap();
        assert_eq!(config.duration_mode, DurationMode::Statutory);
        assert!(config.fallback_to_practical);
    }
}
