//! Compose Gate - required panels present, every sheet panel stamped with current hashes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use super::{enforce, Gate, GateError, GateMode, ValidationReport, Violation};
use crate::generation::PanelResult;
use crate::panels::PanelType;

/// Identity stamped into the final sheet metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeStamp {
    pub geometry_hash: String,
    pub spec_hash: String,
    pub program_hash: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ComposeInput<'a> {
    pub spec_hash: &'a str,
    pub geometry_hash: &'a str,
    pub program_hash: &'a str,
    pub required: &'a [PanelType],
    pub results: &'a [PanelResult],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeOutcome {
    pub report: ValidationReport,
    pub stamp: ComposeStamp,
}

fn latest(results: &[PanelResult], panel: PanelType) -> Option<&PanelResult> {
    results.iter().rev().find(|r| r.panel == panel)
}

pub fn check_compose(input: &ComposeInput<'_>) -> ComposeOutcome {
    let mut violations = vec![];

    for &panel in input.required {
        if latest(input.results, panel).filter(|r| r.is_success()).is_some() {
            continue;
        }
        let key = panel.key();
        let actual = latest(input.results, panel)
            .and_then(|r| r.error.as_ref())
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "not generated".to_string());
        violations.push(
            Violation::error("missing_panel", key, format!("required panel {} is missing", key))
                .expected("successful panel", actual)
                .remediation(format!("Regenerate {}", key)),
        );
    }

    let mut panels: Vec<PanelType> = vec![];
    for result in input.results {
        if !panels.contains(&result.panel) {
            panels.push(result.panel);
        }
    }
    let on_sheet: Vec<&PanelResult> = panels
        .into_iter()
        .filter_map(|p| latest(input.results, p))
        .filter(|r| r.is_success())
        .collect();

    for result in &on_sheet {
        let key = result.panel.key();
        if result.spec_hash.as_deref() != Some(input.spec_hash) {
            violations.push(
                Violation::error("spec_hash_mismatch", key, format!("{} was generated for another specification", key))
                    .expected(input.spec_hash, result.spec_hash.clone().unwrap_or_else(|| "none".into())),
            );
        }
        if result.geometry_hash.as_deref() != Some(input.geometry_hash) {
            violations.push(
                Violation::error("geometry_hash_mismatch", key, format!("{} does not match the canonical pack", key))
                    .expected(input.geometry_hash, result.geometry_hash.clone().unwrap_or_else(|| "none".into()))
                    .remediation(format!("Regenerate {} from the current canonical pack", key)),
            );
        }
    }

    let stamp = ComposeStamp {
        geometry_hash: input.geometry_hash.to_string(),
        spec_hash: input.spec_hash.to_string(),
        program_hash: input.program_hash.to_string(),
    };
    let mut metadata = Map::new();
    metadata.insert("required_panels".into(), json!(input.required.len()));
    metadata.insert("panels_checked".into(), json!(on_sheet.len()));
    metadata.insert("stamp".into(), json!(stamp));
    ComposeOutcome { report: ValidationReport::new(Gate::Compose, violations, metadata), stamp }
}

pub fn compose_gate(input: &ComposeInput<'_>, mode: GateMode) -> Result<ComposeOutcome, GateError> {
    let ComposeOutcome { report, stamp } = check_compose(input);
    let report = enforce(mode, report)?;
    Ok(ComposeOutcome { report, stamp })
}
