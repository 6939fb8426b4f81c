//! Specification Normalizer
//!
//! Never fails: every missing or unusable field is replaced by a
//! deterministic default and the replacement is recorded as a [`Repair`].
//! Normalizing an already-normalized spec changes nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

use super::{
    AdjacencyPriority, AdjacencySpec, Footprint, GeometryRules, Program, RoofType, RoomSpec, Site,
    Specification, Style, WindowPattern, SPEC_SCHEMA_VERSION,
};
use crate::geometry::{polygon_area, Facade, Point2};

const SYNTHETIC_SITE_ASPECT: f64 = 1.5;
const SITE_TO_PROGRAM_RATIO: f64 = 2.5;
const FALLBACK_SITE_AREA_M2: f64 = 200.0;

const DEFAULT_GRID_M: f64 = 0.6;
const DEFAULT_MAX_SPAN_M: f64 = 6.0;
const DEFAULT_ROOF_PITCH_DEG: f64 = 35.0;
const MAX_ROOF_PITCH_DEG: f64 = 60.0;
const DEFAULT_FLOOR_HEIGHT_M: f64 = 3.0;

/// Most storeys a program may declare or place rooms on.
pub const MAX_FLOORS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repair {
    pub field: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Normalized {
    pub spec: Specification,
    pub repairs: Vec<Repair>,
}

struct Repairs(Vec<Repair>);

impl Repairs {
    fn record(&mut self, field: impl Into<String>, action: impl Into<String>) {
        let repair = Repair { field: field.into(), action: action.into() };
        debug!(field = %repair.field, action = %repair.action, "spec repaired");
        self.0.push(repair);
    }
}

/// Repair a raw design description into a complete [`Specification`].
pub fn normalize(raw: &Value) -> Normalized {
    let mut repairs = Repairs(vec![]);
    let empty = Map::new();
    let root = match raw.as_object() {
        Some(obj) => obj,
        None => {
            repairs.record("$", "input was not an object; all sections defaulted");
            &empty
        }
    };

    let schema_version = normalize_schema_version(root, &mut repairs);
    let program = normalize_program(section(root, &["program"], "program", &mut repairs), &mut repairs);
    let site = normalize_site(section(root, &["site"], "site", &mut repairs), &program, &mut repairs);
    let style = normalize_style(section(root, &["style"], "style", &mut repairs), &mut repairs);
    let geometry_rules = normalize_geometry_rules(
        section(root, &["geometry_rules", "geometryRules", "geometry"], "geometry_rules", &mut repairs),
        root,
        &mut repairs,
    );

    Normalized {
        spec: Specification { schema_version, site, program, style, geometry_rules },
        repairs: repairs.0,
    }
}

fn section<'a>(
    root: &'a Map<String, Value>,
    names: &[&str],
    label: &str,
    repairs: &mut Repairs,
) -> Option<&'a Map<String, Value>> {
    let found = field(root, names).and_then(Value::as_object);
    if found.is_none() {
        repairs.record(label, "section missing; defaults applied");
    }
    found
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| obj.get(*n)).filter(|v| !v.is_null())
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn positive(obj: Option<&Map<String, Value>>, names: &[&str]) -> Option<f64> {
    obj.and_then(|o| field(o, names)).and_then(number).filter(|n| *n > 0.0)
}

fn normalize_schema_version(root: &Map<String, Value>, repairs: &mut Repairs) -> String {
    match field(root, &["schema_version", "schemaVersion", "version"]).and_then(Value::as_str) {
        Some(v) if semver::Version::parse(v).is_ok() => v.to_string(),
        _ => {
            repairs.record("schema_version", format!("set to {}", SPEC_SCHEMA_VERSION));
            SPEC_SCHEMA_VERSION.to_string()
        }
    }
}

// --- Program ---

fn normalize_program(obj: Option<&Map<String, Value>>, repairs: &mut Repairs) -> Program {
    let declared_floors = match obj
        .and_then(|o| field(o, &["floors", "levels", "floor_count", "floorCount"]))
        .and_then(number)
        .filter(|n| *n >= 1.0)
        .map(|n| n.round() as usize)
    {
        Some(declared) if declared > MAX_FLOORS => {
            repairs.record("program.floors", format!("{} floors clamped to {}", declared, MAX_FLOORS));
            Some(MAX_FLOORS)
        }
        declared => declared,
    };

    let raw_rooms = obj
        .and_then(|o| field(o, &["rooms", "spaces"]))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut rooms = Vec::with_capacity(raw_rooms.len());
    let mut seen: HashSet<String> = HashSet::new();
    for (i, raw) in raw_rooms.iter().enumerate() {
        let path = format!("program.rooms[{}]", i);
        let Some(room) = raw.as_object() else {
            repairs.record(path, "room entry was not an object; dropped");
            continue;
        };

        let name = match field(room, &["name", "label", "type"]).and_then(Value::as_str) {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => {
                let generated = format!("Room {}", i + 1);
                repairs.record(format!("{}.name", path), format!("named {}", generated));
                generated
            }
        };

        let area = positive(
            Some(room),
            &["area_m2", "areaM2", "area", "target_area_m2", "targetAreaM2"],
        );
        let Some(area_m2) = area else {
            repairs.record(format!("{}.area_m2", path), format!("non-positive area; {} dropped", name));
            continue;
        };

        let floor = match field(room, &["floor", "level", "lockedLevel", "locked_level"]) {
            None => 0,
            Some(raw) => match parse_level(raw) {
                Some(level) if level < MAX_FLOORS => level,
                Some(level) => {
                    repairs.record(
                        format!("{}.floor", path),
                        format!("floor {} above limit; clamped to {}", level, MAX_FLOORS - 1),
                    );
                    MAX_FLOORS - 1
                }
                None => {
                    repairs.record(format!("{}.floor", path), format!("unreadable level {}; placed on floor 0", raw));
                    0
                }
            },
        };
        let orientation = match field(room, &["orientation", "facing"]) {
            None => None,
            Some(raw) => {
                let parsed = parse_facade(raw);
                if parsed.is_none() {
                    repairs.record(format!("{}.orientation", path), format!("unrecognized orientation {}; dropped", raw));
                }
                parsed
            }
        };

        let name = unique_name(name, &mut seen, &path, repairs);
        rooms.push(RoomSpec { name, area_m2, floor, orientation });
    }

    let needed = rooms.iter().map(|r| r.floor + 1).max().unwrap_or(1);
    let floors = match declared_floors {
        Some(declared) => {
            for room in rooms.iter_mut().filter(|r| r.floor >= declared) {
                repairs.record(
                    format!("program.rooms.{}.floor", room.name),
                    format!("floor {} beyond {} floors; clamped", room.floor, declared),
                );
                room.floor = declared - 1;
            }
            declared
        }
        None => {
            repairs.record("program.floors", format!("derived {} from rooms", needed));
            needed
        }
    };

    let adjacency = normalize_adjacency(obj, &rooms, repairs);
    Program { floors, rooms, adjacency }
}

fn parse_level(value: &Value) -> Option<usize> {
    if let Some(s) = value.as_str() {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "ground" | "g" | "ground floor" => Some(0),
            "first" | "first floor" | "upper" => Some(1),
            "second" | "second floor" => Some(2),
            "third" | "third floor" => Some(3),
            _ => None,
        };
        if level.is_some() {
            return level;
        }
    }
    number(value).filter(|n| *n >= 0.0).map(|n| n.round() as usize)
}

fn unique_name(name: String, seen: &mut HashSet<String>, path: &str, repairs: &mut Repairs) -> String {
    if seen.insert(name.clone()) {
        return name;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{} {}", name, n);
        if seen.insert(candidate.clone()) {
            repairs.record(format!("{}.name", path), format!("duplicate renamed to {}", candidate));
            return candidate;
        }
        n += 1;
    }
}

fn normalize_adjacency(
    obj: Option<&Map<String, Value>>,
    rooms: &[RoomSpec],
    repairs: &mut Repairs,
) -> Vec<AdjacencySpec> {
    let raw = obj
        .and_then(|o| field(o, &["adjacency", "adjacencies", "adjacencyRequirements", "adjacency_requirements"]))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let known = |name: &str| rooms.iter().any(|r| r.name == name);
    let mut out: Vec<AdjacencySpec> = vec![];
    for (i, entry) in raw.iter().enumerate() {
        let path = format!("program.adjacency[{}]", i);
        let (a, b, priority) = match entry {
            Value::Array(pair) => (
                pair.first().and_then(Value::as_str),
                pair.get(1).and_then(Value::as_str),
                None,
            ),
            Value::Object(o) => {
                let pair = field(o, &["rooms"]).and_then(Value::as_array);
                let a = field(o, &["a", "from", "roomA", "room_a"])
                    .and_then(Value::as_str)
                    .or_else(|| pair.and_then(|p| p.first()).and_then(Value::as_str));
                let b = field(o, &["b", "to", "roomB", "room_b"])
                    .and_then(Value::as_str)
                    .or_else(|| pair.and_then(|p| p.get(1)).and_then(Value::as_str));
                (a, b, field(o, &["priority", "strength"]).and_then(Value::as_str))
            }
            _ => (None, None, None),
        };

        let (Some(a), Some(b)) = (a, b) else {
            repairs.record(path, "malformed adjacency entry; dropped");
            continue;
        };
        if a == b || !known(a) || !known(b) {
            repairs.record(path, format!("adjacency {}<->{} names unknown room; dropped", a, b));
            continue;
        }

        let priority = match priority.map(str::to_ascii_lowercase).as_deref() {
            Some("required") | Some("must") | Some("mandatory") => AdjacencyPriority::Required,
            Some("preferred") | Some("should") | Some("optional") => AdjacencyPriority::Preferred,
            _ => {
                repairs.record(format!("{}.priority", path), "defaulted to preferred");
                AdjacencyPriority::Preferred
            }
        };

        let duplicate = out
            .iter()
            .any(|s| (s.a == a && s.b == b) || (s.a == b && s.b == a));
        if duplicate {
            repairs.record(path, format!("duplicate adjacency {}<->{}; dropped", a, b));
            continue;
        }
        out.push(AdjacencySpec { a: a.to_string(), b: b.to_string(), priority });
    }
    out
}

// --- Site ---

fn normalize_site(obj: Option<&Map<String, Value>>, program: &Program, repairs: &mut Repairs) -> Site {
    let polygon: Vec<Point2> = obj
        .and_then(|o| field(o, &["polygon", "boundary", "site_polygon", "sitePolygon"]))
        .and_then(Value::as_array)
        .map(|pts| pts.iter().filter_map(parse_point).collect())
        .unwrap_or_default();
    let polygon_usable = polygon.len() >= 3 && polygon_area(&polygon) > 0.0;

    let area_m2 = match positive(obj, &["area_m2", "areaM2", "area"]) {
        Some(area) => area,
        None if polygon_usable => {
            let area = polygon_area(&polygon);
            repairs.record("site.area_m2", "computed from polygon");
            area
        }
        None if program.total_area_m2() > 0.0 => {
            repairs.record("site.area_m2", "estimated from program area");
            program.total_area_m2() * SITE_TO_PROGRAM_RATIO
        }
        None => {
            repairs.record("site.area_m2", format!("defaulted to {}", FALLBACK_SITE_AREA_M2));
            FALLBACK_SITE_AREA_M2
        }
    };

    let polygon = if polygon_usable {
        polygon
    } else {
        repairs.record("site.polygon", "synthesized rectangle from site area");
        synthesize_rectangle(area_m2)
    };

    let orientation = match obj
        .and_then(|o| field(o, &["orientation", "entrance", "entrance_facade", "entranceFacade"]))
        .and_then(parse_facade)
    {
        Some(f) => f,
        None => {
            repairs.record("site.orientation", "defaulted to south");
            Facade::South
        }
    };

    let passthrough = |names: &[&str]| obj.and_then(|o| field(o, names)).cloned();
    Site {
        polygon,
        area_m2,
        orientation,
        climate: passthrough(&["climate"]),
        sun_path: passthrough(&["sun_path", "sunPath"]),
        wind: passthrough(&["wind"]),
    }
}

fn parse_point(value: &Value) -> Option<Point2> {
    match value {
        Value::Array(xy) if xy.len() >= 2 => Some(Point2::new(number(&xy[0])?, number(&xy[1])?)),
        Value::Object(o) => Some(Point2::new(
            number(field(o, &["x", "lng", "lon"])?)?,
            number(field(o, &["y", "lat"])?)?,
        )),
        _ => None,
    }
}

fn parse_facade(value: &Value) -> Option<Facade> {
    match value {
        Value::String(s) => Facade::parse(s),
        Value::Number(_) => number(value).map(Facade::from_degrees),
        _ => None,
    }
}

fn synthesize_rectangle(area_m2: f64) -> Vec<Point2> {
    let w = (area_m2 * SYNTHETIC_SITE_ASPECT).sqrt();
    let d = area_m2 / w;
    vec![
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(w, d),
        Point2::new(0.0, d),
    ]
}

// --- Style ---

fn normalize_style(obj: Option<&Map<String, Value>>, repairs: &mut Repairs) -> Style {
    let architecture = match obj
        .and_then(|o| field(o, &["architecture", "architectural_style", "architecturalStyle"]))
        .and_then(Value::as_str)
    {
        Some(a) if !a.trim().is_empty() => a.trim().to_string(),
        _ => {
            repairs.record("style.architecture", "defaulted to contemporary");
            "contemporary".to_string()
        }
    };

    let materials: Vec<String> = match obj.and_then(|o| field(o, &["materials"])) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|m| match m {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(o) => field(o, &["name"]).and_then(Value::as_str).map(|s| s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect(),
        _ => vec![],
    };
    let materials = if materials.is_empty() {
        repairs.record("style.materials", "defaulted to brick");
        vec!["brick".to_string()]
    } else {
        materials
    };

    let window_pattern = match obj
        .and_then(|o| field(o, &["window_pattern", "windowPattern", "windows"]))
        .and_then(Value::as_str)
        .and_then(parse_window_pattern)
    {
        Some(p) => p,
        None => {
            repairs.record("style.window_pattern", "defaulted to regular");
            WindowPattern::Regular
        }
    };

    let palette = obj
        .and_then(|o| field(o, &["palette", "color_palette", "colorPalette"]))
        .and_then(Value::as_str)
        .map(str::to_string);

    Style { architecture, materials, window_pattern, palette }
}

fn parse_window_pattern(raw: &str) -> Option<WindowPattern> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "sparse" | "minimal" | "punched" => Some(WindowPattern::Sparse),
        "regular" | "standard" | "grid" => Some(WindowPattern::Regular),
        "dense" | "curtain" | "glazed" => Some(WindowPattern::Dense),
        "ribbon" | "strip" | "band" => Some(WindowPattern::Ribbon),
        _ => None,
    }
}

// --- Geometry rules ---

fn normalize_geometry_rules(
    obj: Option<&Map<String, Value>>,
    root: &Map<String, Value>,
    repairs: &mut Repairs,
) -> GeometryRules {
    let mut positive_or = |names: &[&str], label: &str, default: f64| match positive(obj, names) {
        Some(v) => v,
        None => {
            repairs.record(format!("geometry_rules.{}", label), format!("defaulted to {}", default));
            default
        }
    };

    let grid_m = positive_or(&["grid_m", "grid", "gridM"], "grid_m", DEFAULT_GRID_M);
    let max_span_m = positive_or(&["max_span_m", "maxSpan", "max_span"], "max_span_m", DEFAULT_MAX_SPAN_M);
    let floor_height_m = positive_or(
        &["floor_height_m", "floorHeight", "floor_height"],
        "floor_height_m",
        DEFAULT_FLOOR_HEIGHT_M,
    );

    let roof_type = match obj
        .and_then(|o| field(o, &["roof_type", "roofType", "roof"]))
        .and_then(Value::as_str)
        .and_then(parse_roof_type)
    {
        Some(r) => r,
        None => {
            repairs.record("geometry_rules.roof_type", "defaulted to gable");
            RoofType::Gable
        }
    };

    let roof_pitch_deg = match obj
        .and_then(|o| field(o, &["roof_pitch_deg", "roofPitch", "pitch"]))
        .and_then(number)
    {
        Some(p) if (0.0..=MAX_ROOF_PITCH_DEG).contains(&p) => p,
        Some(p) => {
            let clamped = p.clamp(0.0, MAX_ROOF_PITCH_DEG);
            repairs.record("geometry_rules.roof_pitch_deg", format!("{} clamped to {}", p, clamped));
            clamped
        }
        None => {
            repairs.record("geometry_rules.roof_pitch_deg", format!("defaulted to {}", DEFAULT_ROOF_PITCH_DEG));
            DEFAULT_ROOF_PITCH_DEG
        }
    };

    let footprint_obj = obj
        .and_then(|o| field(o, &["footprint"]))
        .or_else(|| field(root, &["dimensions", "massing"]))
        .and_then(Value::as_object);
    let footprint = footprint_obj.and_then(|fp| {
        let width_m = positive(Some(fp), &["width_m", "width", "length"])?;
        let depth_m = positive(Some(fp), &["depth_m", "depth"])?;
        Some(Footprint { width_m, depth_m })
    });
    if footprint_obj.is_some() && footprint.is_none() {
        repairs.record("geometry_rules.footprint", "incomplete footprint ignored");
    }

    GeometryRules { grid_m, max_span_m, roof_type, roof_pitch_deg, floor_height_m, footprint }
}

fn parse_roof_type(raw: &str) -> Option<RoofType> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "flat" => Some(RoofType::Flat),
        "gable" | "gabled" | "pitched" => Some(RoofType::Gable),
        "hip" | "hipped" => Some(RoofType::Hip),
        "mono" | "shed" | "monopitch" | "mono-pitch" | "lean-to" => Some(RoofType::Mono),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "site": {"area": 400.0, "orientation": "north"},
            "program": {
                "floors": 2,
                "rooms": [
                    {"name": "Living", "area": 25.0, "floor": 0},
                    {"name": "Kitchen", "areaM2": "15", "level": "ground"},
                    {"name": "Bedroom", "area_m2": 14.0, "floor": 1},
                ],
                "adjacency": [{"a": "Living", "b": "Kitchen", "priority": "required"}]
            },
            "style": {"architecture": "modern", "materials": "timber, glass"},
            "geometry_rules": {"roofType": "hipped"}
        })
    }

    #[test]
    fn test_empty_input_is_fully_repaired() {
        let out = normalize(&json!({}));
        assert_eq!(out.spec.program.floors, 1);
        assert_eq!(out.spec.site.area_m2, FALLBACK_SITE_AREA_M2);
        assert_eq!(out.spec.site.polygon.len(), 4);
        assert_eq!(out.spec.style.materials, vec!["brick".to_string()]);
        assert!(out.repairs.iter().any(|r| r.field == "site.polygon"));
        assert!(out.repairs.iter().any(|r| r.field == "program"));
    }

    #[test]
    fn test_non_object_input_never_panics() {
        let out = normalize(&json!("not a spec"));
        assert_eq!(out.repairs[0].field, "$");
        assert!(out.spec.program.rooms.is_empty());
    }

    #[test]
    fn test_synthesized_rectangle_matches_area() {
        let out = normalize(&sample());
        let area = polygon_area(&out.spec.site.polygon);
        assert!((area - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_alternate_spellings_accepted() {
        let out = normalize(&sample());
        let spec = &out.spec;
        assert_eq!(spec.program.rooms.len(), 3);
        assert_eq!(spec.program.room("Kitchen").unwrap().area_m2, 15.0);
        assert_eq!(spec.program.room("Kitchen").unwrap().floor, 0);
        assert_eq!(spec.site.orientation, Facade::North);
        assert_eq!(spec.geometry_rules.roof_type, RoofType::Hip);
        assert_eq!(spec.style.materials, vec!["timber".to_string(), "glass".to_string()]);
        assert_eq!(spec.program.adjacency[0].priority, AdjacencyPriority::Required);
    }

    #[test]
    fn test_invalid_rooms_dropped_and_recorded() {
        let out = normalize(&json!({
            "program": {"rooms": [
                {"name": "Void", "area": 0},
                {"name": "Study", "area": 9},
                {"name": "Study", "area": 10},
            ]}
        }));
        let names: Vec<_> = out.spec.program.rooms.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Study", "Study 2"]);
        assert!(out.repairs.iter().any(|r| r.action.contains("Void dropped")));
    }

    #[test]
    fn test_rooms_clamped_to_declared_floors() {
        let out = normalize(&json!({
            "program": {"floors": 1, "rooms": [{"name": "Loft", "area": 12, "floor": 3}]}
        }));
        assert_eq!(out.spec.program.floors, 1);
        assert_eq!(out.spec.program.rooms[0].floor, 0);
    }

    #[test]
    fn test_floors_derived_when_undeclared() {
        let out = normalize(&json!({
            "program": {"rooms": [{"name": "Loft", "area": 12, "floor": 2}]}
        }));
        assert_eq!(out.spec.program.floors, 3);
    }

    #[test]
    fn test_declared_floors_capped() {
        let out = normalize(&json!({
            "program": {"floors": 1e15, "rooms": [{"name": "A", "area": 10, "floor": 1e12}]}
        }));
        assert_eq!(out.spec.program.floors, MAX_FLOORS);
        assert_eq!(out.spec.program.rooms[0].floor, MAX_FLOORS - 1);
        assert!(out.repairs.iter().any(|r| r.field == "program.floors"));
        assert!(crate::spec::validate_schema(&out.spec).valid);
    }

    #[test]
    fn test_negative_level_and_bad_orientation_recorded() {
        let out = normalize(&json!({
            "program": {"rooms": [{"name": "Den", "area": 10, "floor": -2, "orientation": "sideways"}]}
        }));
        let room = &out.spec.program.rooms[0];
        assert_eq!(room.floor, 0);
        assert_eq!(room.orientation, None);
        assert!(out.repairs.iter().any(|r| r.field == "program.rooms[0].floor"));
        assert!(out.repairs.iter().any(|r| r.field == "program.rooms[0].orientation"));
    }

    #[test]
    fn test_unknown_adjacency_dropped() {
        let out = normalize(&json!({
            "program": {
                "rooms": [{"name": "Hall", "area": 8}],
                "adjacency": [["Hall", "Garage"], {"a": "Hall"}]
            }
        }));
        assert!(out.spec.program.adjacency.is_empty());
        assert_eq!(out.repairs.iter().filter(|r| r.field.starts_with("program.adjacency")).count(), 2);
    }

    #[test]
    fn test_numeric_orientation_maps_to_facade() {
        let out = normalize(&json!({"site": {"orientation": 90}}));
        assert_eq!(out.spec.site.orientation, Facade::East);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let first = normalize(&sample());
        let reserialized = serde_json::to_value(&first.spec).unwrap();
        let second = normalize(&reserialized);
        assert_eq!(first.spec, second.spec);
        assert!(second.repairs.is_empty(), "unexpected repairs: {:?}", second.repairs);
    }
}
