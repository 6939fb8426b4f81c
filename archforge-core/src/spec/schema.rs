//! Schema gate - decides whether a pipeline run may start.
//!
//! Problems are reported, never raised; the caller decides what to do.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Specification, MAX_FLOORS};

/// Highest schema version this engine reads.
pub const SPEC_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecificationError {
    #[error("program has no rooms")]
    NoRooms,

    #[error("site area must be positive, got {area_m2}")]
    NonPositiveSiteArea { area_m2: f64 },

    #[error("site polygon needs at least 3 vertices, got {vertices}")]
    DegeneratePolygon { vertices: usize },

    #[error("room {name} has non-positive area {area_m2}")]
    NonPositiveRoomArea { name: String, area_m2: f64 },

    #[error("program declares {floors} floors; at most {max} supported")]
    FloorCountOutOfRange { floors: usize, max: usize },

    #[error("room {name} is on floor {floor} but the program has {floors} floors")]
    RoomFloorOutOfRange { name: String, floor: usize, floors: usize },

    #[error("adjacency names unknown room {name}")]
    UnknownAdjacencyRoom { name: String },

    #[error("geometry rule {rule} must be positive")]
    NonPositiveRule { rule: String },

    #[error("schema version {found} is not supported (engine reads {supported})")]
    UnsupportedSchema { found: String, supported: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub valid: bool,
    pub missing_sections: Vec<String>,
    pub errors: Vec<SpecificationError>,
}

pub fn validate_schema(spec: &Specification) -> SchemaReport {
    let mut errors = vec![];
    let mut missing: Vec<&str> = vec![];

    match semver::Version::parse(&spec.schema_version) {
        Ok(found) if schema_supported(&found) => {}
        _ => errors.push(SpecificationError::UnsupportedSchema {
            found: spec.schema_version.clone(),
            supported: SPEC_SCHEMA_VERSION.to_string(),
        }),
    }

    let site = &spec.site;
    if site.polygon.len() < 3 {
        errors.push(SpecificationError::DegeneratePolygon { vertices: site.polygon.len() });
        missing.push("site");
    }
    if site.area_m2 <= 0.0 || !site.area_m2.is_finite() {
        errors.push(SpecificationError::NonPositiveSiteArea { area_m2: site.area_m2 });
        missing.push("site");
    }

    let program = &spec.program;
    if program.rooms.is_empty() {
        errors.push(SpecificationError::NoRooms);
        missing.push("program");
    }
    if program.floors == 0 || program.floors > MAX_FLOORS {
        errors.push(SpecificationError::FloorCountOutOfRange { floors: program.floors, max: MAX_FLOORS });
        missing.push("program");
    }
    for room in &program.rooms {
        if room.area_m2 <= 0.0 || !room.area_m2.is_finite() {
            errors.push(SpecificationError::NonPositiveRoomArea {
                name: room.name.clone(),
                area_m2: room.area_m2,
            });
        }
        if room.floor >= program.floors {
            errors.push(SpecificationError::RoomFloorOutOfRange {
                name: room.name.clone(),
                floor: room.floor,
                floors: program.floors,
            });
        }
    }
    for adj in &program.adjacency {
        for name in [&adj.a, &adj.b] {
            if program.room(name).is_none() {
                errors.push(SpecificationError::UnknownAdjacencyRoom { name: name.clone() });
            }
        }
    }

    if spec.style.architecture.trim().is_empty() {
        missing.push("style");
    }

    let rules = &spec.geometry_rules;
    for (rule, value) in [
        ("grid_m", rules.grid_m),
        ("max_span_m", rules.max_span_m),
        ("floor_height_m", rules.floor_height_m),
    ] {
        if value <= 0.0 || !value.is_finite() {
            errors.push(SpecificationError::NonPositiveRule { rule: rule.to_string() });
            missing.push("geometry_rules");
        }
    }

    missing.dedup();
    SchemaReport {
        valid: errors.is_empty() && missing.is_empty(),
        missing_sections: missing.into_iter().map(str::to_string).collect(),
        errors,
    }
}

fn schema_supported(found: &semver::Version) -> bool {
    match semver::Version::parse(SPEC_SCHEMA_VERSION) {
        Ok(engine) => found.major == engine.major && found <= &engine,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::normalize;
    use serde_json::json;

    fn valid_spec() -> Specification {
        normalize(&json!({
            "program": {"rooms": [{"name": "Living", "area": 25}]}
        }))
        .spec
    }

    #[test]
    fn test_normalized_spec_with_rooms_is_valid() {
        let report = validate_schema(&valid_spec());
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.missing_sections.is_empty());
    }

    #[test]
    fn test_zero_rooms_reported_not_thrown() {
        let spec = normalize(&json!({})).spec;
        let report = validate_schema(&spec);
        assert!(!report.valid);
        assert_eq!(report.missing_sections, vec!["program".to_string()]);
        assert!(report.errors.contains(&SpecificationError::NoRooms));
    }

    #[test]
    fn test_non_positive_site_area_reported() {
        let mut spec = valid_spec();
        spec.site.area_m2 = 0.0;
        let report = validate_schema(&spec);
        assert!(!report.valid);
        assert!(report.missing_sections.contains(&"site".to_string()));
    }

    #[test]
    fn test_floor_count_above_limit_reported() {
        let mut spec = valid_spec();
        spec.program.floors = 1_000_000;
        let report = validate_schema(&spec);
        assert!(!report.valid);
        assert!(report.errors.contains(&SpecificationError::FloorCountOutOfRange {
            floors: 1_000_000,
            max: MAX_FLOORS,
        }));
    }

    #[test]
    fn test_future_schema_version_rejected() {
        let mut spec = valid_spec();
        spec.schema_version = "2.0.0".to_string();
        let report = validate_schema(&spec);
        assert!(matches!(
            report.errors[0],
            SpecificationError::UnsupportedSchema { .. }
        ));
    }
}
