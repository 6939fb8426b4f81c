//! Validation Gates - pure, read-only checks over produced artifacts
//!
//! Rules produce structured violations; the gate mode decides whether an
//! invalid report becomes an error. Gates never retry and never mutate
//! their inputs.

mod compose;
mod drift;
mod program;

pub use compose::{check_compose, compose_gate, ComposeInput, ComposeOutcome, ComposeStamp};
pub use drift::{check_drift, drift_gate};
pub use program::{
    check_program, program_compliance_gate, validate_adjacency, AdjacencyRequirement, LockedSpace,
    ProgramLock,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Invalid reports are returned as [`GateError`].
    #[default]
    Strict,
    /// Invalid reports are returned as `Ok` for diagnostics.
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub severity: Severity,
    /// Panel key or room name the violation is about.
    pub subject: Option<String>,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

impl Violation {
    pub fn error(rule: &str, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            severity: Severity::Error,
            subject: Some(subject.into()),
            message: message.into(),
            expected: None,
            actual: None,
            remediation: vec![],
        }
    }

    pub fn warning(rule: &str, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, ..Self::error(rule, subject, message) }
    }

    pub fn expected(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    pub fn remediation(mut self, hint: impl Into<String>) -> Self {
        self.remediation.push(hint.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    ProgramCompliance,
    Drift,
    Compose,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ProgramCompliance => "program_compliance",
            Self::Drift => "drift",
            Self::Compose => "compose",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub gate: Gate,
    pub valid: bool,
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ValidationReport {
    /// A report is valid when no violation is an error.
    pub fn new(gate: Gate, violations: Vec<Violation>, metadata: Map<String, Value>) -> Self {
        let valid = !violations.iter().any(|v| v.severity == Severity::Error);
        Self { gate, valid, violations, metadata }
    }

    pub fn has_errors(&self) -> bool {
        !self.valid
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.severity == Severity::Warning)
    }

    /// Subjects of error violations, in report order, without repeats.
    pub fn failing_subjects(&self) -> Vec<String> {
        let mut out: Vec<String> = vec![];
        for subject in self.errors().filter_map(|v| v.subject.clone()) {
            if !out.contains(&subject) {
                out.push(subject);
            }
        }
        out
    }

    fn summary(&self) -> String {
        let messages: Vec<String> = self.errors().map(|v| format!("{}: {}", v.rule, v.message)).collect();
        messages.join("; ")
    }
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Program compliance failed: {}", .0.summary())]
    ProgramCompliance(ValidationReport),

    #[error("Drift detected: {}", .0.summary())]
    Drift(ValidationReport),

    #[error("Compose gate rejected panels: {}", .0.summary())]
    Compose(ValidationReport),
}

impl GateError {
    pub fn report(&self) -> &ValidationReport {
        match self {
            Self::ProgramCompliance(r) | Self::Drift(r) | Self::Compose(r) => r,
        }
    }
}

/// Apply the gate mode to a finished report.
pub(crate) fn enforce(mode: GateMode, report: ValidationReport) -> Result<ValidationReport, GateError> {
    if report.valid || mode == GateMode::Report {
        return Ok(report);
    }
    Err(match report.gate {
        Gate::ProgramCompliance => GateError::ProgramCompliance(report),
        Gate::Drift => GateError::Drift(report),
        Gate::Compose => GateError::Compose(report),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_do_not_invalidate() {
        let report = ValidationReport::new(
            Gate::ProgramCompliance,
            vec![Violation::warning("preferred_adjacency", "A <-> B", "not adjacent")],
            Map::new(),
        );
        assert!(report.valid);
        assert_eq!(report.warnings().count(), 1);
        assert!(enforce(GateMode::Strict, report).is_ok());
    }

    #[test]
    fn test_strict_mode_turns_errors_into_gate_error() {
        let report = ValidationReport::new(
            Gate::Drift,
            vec![Violation::error("missing_geometry_hash", "hero_3d", "no geometry hash")],
            Map::new(),
        );
        let err = enforce(GateMode::Strict, report.clone()).unwrap_err();
        assert!(matches!(err, GateError::Drift(_)));
        assert!(err.to_string().contains("missing_geometry_hash"));
        assert_eq!(err.report().failing_subjects(), vec!["hero_3d".to_string()]);

        let reported = enforce(GateMode::Report, report).unwrap();
        assert!(!reported.valid);
    }
}
