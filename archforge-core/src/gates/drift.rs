//! Drift Gate - every generated panel must carry the pack's geometry hash.
//!
//! A missing hash is an error in every mode; unhashed panels are never
//! skipped.

use serde_json::{json, Map};
use std::collections::BTreeSet;

use super::{enforce, Gate, GateError, GateMode, ValidationReport, Violation};
use crate::generation::PanelResult;

pub fn check_drift(pack_hash: &str, results: &[PanelResult]) -> ValidationReport {
    let mut violations = vec![];
    let mut offending = BTreeSet::new();
    let mut seen = BTreeSet::new();
    let checked: Vec<&PanelResult> = results.iter().filter(|r| r.is_success()).collect();

    for result in &checked {
        let key = result.panel.key();
        match result.geometry_hash.as_deref() {
            None => {
                offending.insert(key);
                violations.push(
                    Violation::error("missing_geometry_hash", key, format!("{} has no geometry hash", key))
                        .expected(pack_hash, "none")
                        .remediation(format!("Regenerate {}", key)),
                );
            }
            Some(hash) => {
                seen.insert(hash.to_string());
                if hash != pack_hash {
                    offending.insert(key);
                    violations.push(
                        Violation::error(
                            "geometry_hash_mismatch",
                            key,
                            format!("{} was generated from different geometry", key),
                        )
                        .expected(pack_hash, hash)
                        .remediation(format!("Regenerate {} from the current canonical pack", key)),
                    );
                }
            }
        }
    }

    let drift_score = if checked.is_empty() { 0.0 } else { offending.len() as f64 / checked.len() as f64 };
    let mut metadata = Map::new();
    metadata.insert("drift_score".into(), json!(drift_score));
    metadata.insert("panels_checked".into(), json!(checked.len()));
    metadata.insert("distinct_hashes".into(), json!(seen.len()));
    metadata.insert("offending_panels".into(), json!(offending.into_iter().collect::<Vec<_>>()));
    ValidationReport::new(Gate::Drift, violations, metadata)
}

pub fn drift_gate(pack_hash: &str, results: &[PanelResult], mode: GateMode) -> Result<ValidationReport, GateError> {
    enforce(mode, check_drift(pack_hash, results))
}
