//! Building Geometry Model
//!
//! [`BuildingModel::build`] is a pure function of the specification and an
//! optional massing override. Floors are indexed `0..n` and rooms are
//! indexed per floor; adjacency is derived on demand instead of being
//! stored as mutable graph edges.
//!
//! Plan coordinates: origin at the south-west corner, `x` east, `y` north,
//! meters.

mod adjacency;
mod layout;
mod openings;
mod roof;

pub use adjacency::{AdjacencyPair, AdjacencyReport, DEFAULT_MIN_SHARED_WALL_M};
pub use openings::{FacadeOpening, Opening, OpeningHost, OpeningKind};
pub use roof::{ProfilePoint, RidgeAxis, Roof, RoofProfile};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::spec::{AdjacencyPriority, Specification, MAX_FLOORS};

/// Length tolerance for geometric comparisons, in meters.
pub const EPS: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("program has no rooms to lay out")]
    EmptyProgram,

    #[error("envelope {width_m}x{depth_m} m is not a positive finite size")]
    InvalidEnvelope { width_m: f64, depth_m: f64 },

    #[error("room {room} on floor {floor} extends outside the envelope")]
    RoomOutsideEnvelope { room: String, floor: usize },

    #[error("rooms {a} and {b} overlap on floor {floor}")]
    Overlap { a: String, b: String, floor: usize },

    #[error("{floors} floors requested; at most {max} supported")]
    TooManyFloors { floors: usize, max: usize },

    #[error("non-finite coordinate in {0}")]
    NonFinite(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facade {
    North,
    East,
    South,
    West,
}

impl Facade {
    pub const ALL: [Facade; 4] = [Facade::North, Facade::East, Facade::South, Facade::West];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Some(Self::North),
            "e" | "east" => Some(Self::East),
            "s" | "south" => Some(Self::South),
            "w" | "west" => Some(Self::West),
            other => other.parse::<f64>().ok().filter(|d| d.is_finite()).map(Self::from_degrees),
        }
    }

    /// Compass bearing to nearest facade (0 = north, clockwise).
    pub fn from_degrees(deg: f64) -> Self {
        let d = deg.rem_euclid(360.0);
        match ((d + 45.0) / 90.0).floor() as u32 % 4 {
            0 => Self::North,
            1 => Self::East,
            2 => Self::South,
            _ => Self::West,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::North => 'N',
            Self::East => 'E',
            Self::South => 'S',
            Self::West => 'W',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Absolute polygon area (shoelace).
pub fn polygon_area(points: &[Point2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice += p.x * q.y - q.x * p.y;
    }
    (twice / 2.0).abs()
}

/// Axis-aligned bounding rectangle of a polygon.
pub fn polygon_bounds(points: &[Point2]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub depth: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, depth: f64) -> Self {
        Self { x, y, width, depth }
    }

    pub fn area(&self) -> f64 {
        self.width * self.depth
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.depth
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.x + self.width / 2.0, self.y + self.depth / 2.0)
    }

    /// Corners counter-clockwise from the south-west.
    pub fn corners(&self) -> [Point2; 4] {
        [
            Point2::new(self.x, self.y),
            Point2::new(self.max_x(), self.y),
            Point2::new(self.max_x(), self.max_y()),
            Point2::new(self.x, self.max_y()),
        ]
    }

    /// Interior intersection; touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.max_x() - EPS
            && other.x < self.max_x() - EPS
            && self.y < other.max_y() - EPS
            && other.y < self.max_y() - EPS
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.max_x() <= self.max_x() + EPS
            && other.max_y() <= self.max_y() + EPS
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.depth.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point2,
    pub end: Point2,
}

impl Segment {
    pub const fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end.x - self.start.x).hypot(self.end.y - self.start.y)
    }

    /// Point at distance `d` from `start`.
    pub fn point_at(&self, d: f64) -> Point2 {
        let len = self.length();
        if len <= EPS {
            return self.start;
        }
        let t = d / len;
        Point2::new(
            self.start.x + (self.end.x - self.start.x) * t,
            self.start.y + (self.end.y - self.start.y) * t,
        )
    }

    pub fn is_horizontal(&self) -> bool {
        (self.end.y - self.start.y).abs() <= EPS
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub floor: usize,
    pub target_area_m2: f64,
    pub rect: Rect,
    pub polygon: Vec<Point2>,
}

impl Room {
    pub fn realized_area_m2(&self) -> f64 {
        polygon_area(&self.polygon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub id: String,
    pub floor: usize,
    pub segment: Segment,
    pub exterior: bool,
    pub facade: Option<Facade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub index: usize,
    pub elevation_m: f64,
    pub height_m: f64,
    pub rooms: Vec<Room>,
    pub walls: Vec<Wall>,
    pub openings: Vec<Opening>,
}

impl Floor {
    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.name == name)
    }

    pub fn exterior_wall(&self, facade: Facade) -> Option<&Wall> {
        self.walls.iter().find(|w| w.exterior && w.facade == Some(facade))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub width_m: f64,
    pub depth_m: f64,
}

impl Envelope {
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width_m, self.depth_m)
    }

    pub fn area_m2(&self) -> f64 {
        self.width_m * self.depth_m
    }

    /// Length of the exterior wall on `facade`.
    pub fn facade_length(&self, facade: Facade) -> f64 {
        match facade {
            Facade::North | Facade::South => self.width_m,
            Facade::East | Facade::West => self.depth_m,
        }
    }
}

/// Overrides the envelope derived from the specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MassingOverride {
    #[serde(default)]
    pub width_m: Option<f64>,
    #[serde(default)]
    pub depth_m: Option<f64>,
    #[serde(default)]
    pub floor_height_m: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width_m: f64,
    pub depth_m: f64,
    pub eave_height_m: f64,
    pub ridge_height_m: f64,
    pub floor_count: usize,
    pub floor_height_m: f64,
    pub gross_floor_area_m2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralGrid {
    pub bays: usize,
    pub bay_width_m: f64,
}

/// A room as realized by the layout, for compliance checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedRoom {
    pub name: String,
    pub level: usize,
    pub area_m2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingModel {
    pub envelope: Envelope,
    pub floor_height_m: f64,
    pub floors: Vec<Floor>,
    pub roof: Roof,
    pub structure: StructuralGrid,
    pub entrance: Facade,
}

impl BuildingModel {
    pub fn build(spec: &Specification, massing: Option<&MassingOverride>) -> Result<Self, GeometryError> {
        let result = Self::derive(spec, massing);
        match &result {
            Ok(model) => debug!(
                width_m = model.envelope.width_m,
                depth_m = model.envelope.depth_m,
                floors = model.floors.len(),
                "building model derived"
            ),
            Err(e) => error!(
                error = %e,
                rooms = spec.program.rooms.len(),
                floors = spec.program.floors,
                footprint = ?spec.geometry_rules.footprint,
                massing = ?massing,
                "derived geometry is inconsistent"
            ),
        }
        result
    }

    fn derive(spec: &Specification, massing: Option<&MassingOverride>) -> Result<Self, GeometryError> {
        if spec.program.rooms.is_empty() {
            return Err(GeometryError::EmptyProgram);
        }
        if spec.program.floors > MAX_FLOORS {
            return Err(GeometryError::TooManyFloors { floors: spec.program.floors, max: MAX_FLOORS });
        }
        let envelope = layout::envelope(spec, massing)?;
        let floor_height_m = massing
            .and_then(|m| m.floor_height_m)
            .filter(|h| *h > 0.0 && h.is_finite())
            .unwrap_or(spec.geometry_rules.floor_height_m);
        let floor_count = spec.program.floors.max(1);

        let required: Vec<layout::RequiredPair<'_>> = spec
            .program
            .adjacency
            .iter()
            .filter(|adj| adj.priority == AdjacencyPriority::Required)
            .map(|adj| (adj.a.as_str(), adj.b.as_str()))
            .collect();

        let mut floors = Vec::with_capacity(floor_count);
        for index in 0..floor_count {
            let packed = layout::pack_floor(index, spec.program.rooms_on(index), &envelope, &required);
            let mut walls = layout::exterior_walls(index, &envelope);
            walls.extend(packed.interior_walls);
            let mut floor = Floor {
                index,
                elevation_m: index as f64 * floor_height_m,
                height_m: floor_height_m,
                rooms: packed.rooms,
                walls,
                openings: vec![],
            };
            floor.openings = openings::place(&floor, spec);
            layout::check_floor(&floor, &envelope)?;
            floors.push(floor);
        }

        let roof = Roof::derive(
            spec.geometry_rules.roof_type,
            spec.geometry_rules.roof_pitch_deg,
            &envelope,
            floor_count as f64 * floor_height_m,
        );
        let structure = layout::structural_grid(&envelope, spec.geometry_rules.max_span_m);

        Ok(Self {
            envelope,
            floor_height_m,
            floors,
            roof,
            structure,
            entrance: spec.site.orientation,
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width_m: self.envelope.width_m,
            depth_m: self.envelope.depth_m,
            eave_height_m: self.roof.eave_height_m,
            ridge_height_m: self.roof.ridge_height_m,
            floor_count: self.floors.len(),
            floor_height_m: self.floor_height_m,
            gross_floor_area_m2: self.envelope.area_m2() * self.floors.len() as f64,
        }
    }

    pub fn floor(&self, index: usize) -> Option<&Floor> {
        self.floors.get(index)
    }

    pub fn roof_profile(&self, facade: Facade) -> RoofProfile {
        self.roof.profile(facade, &self.envelope)
    }

    /// Exterior openings on `facade`, in facade coordinates.
    pub fn openings_for_facade(&self, facade: Facade) -> Vec<FacadeOpening> {
        self.floors
            .iter()
            .flat_map(|floor| {
                floor
                    .openings
                    .iter()
                    .filter_map(move |o| o.project(facade, floor.elevation_m))
            })
            .collect()
    }

    pub fn adjacency_report(&self) -> AdjacencyReport {
        self.adjacency_report_with(DEFAULT_MIN_SHARED_WALL_M)
    }

    pub fn adjacency_report_with(&self, min_shared_wall_m: f64) -> AdjacencyReport {
        AdjacencyReport::compute(self, min_shared_wall_m)
    }

    pub fn realized_program(&self) -> Vec<RealizedRoom> {
        self.floors
            .iter()
            .flat_map(|f| f.rooms.iter())
            .map(|r| RealizedRoom {
                name: r.name.clone(),
                level: r.floor,
                area_m2: r.realized_area_m2(),
            })
            .collect()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.floors.iter().flat_map(|f| f.rooms.iter())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::spec::normalize;
    use serde_json::json;

    pub(crate) fn three_room_spec() -> Specification {
        normalize(&json!({
            "program": {"floors": 1, "rooms": [
                {"name": "Living", "area": 25},
                {"name": "Kitchen", "area": 15},
                {"name": "Hallway", "area": 8}
            ]}
        }))
        .spec
    }

    #[test]
    fn test_facade_parse() {
        assert_eq!(Facade::parse("N"), Some(Facade::North));
        assert_eq!(Facade::parse("west"), Some(Facade::West));
        assert_eq!(Facade::parse("180"), Some(Facade::South));
        assert_eq!(Facade::parse("up"), None);
        assert_eq!(Facade::from_degrees(-90.0), Facade::West);
        assert_eq!(Facade::from_degrees(44.0), Facade::North);
    }

    #[test]
    fn test_polygon_helpers() {
        let square = Rect::new(1.0, 2.0, 3.0, 4.0).corners();
        assert_eq!(polygon_area(&square), 12.0);
        assert_eq!(polygon_bounds(&square), Some(Rect::new(1.0, 2.0, 3.0, 4.0)));
        assert_eq!(polygon_area(&square[..2]), 0.0);
    }

    #[test]
    fn test_rect_overlap_ignores_touching_edges() {
        let a = Rect::new(0.0, 0.0, 2.0, 2.0);
        let b = Rect::new(2.0, 0.0, 2.0, 2.0);
        let c = Rect::new(1.0, 1.0, 2.0, 2.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn test_build_is_deterministic() {
        let spec = three_room_spec();
        let a = BuildingModel::build(&spec, None).unwrap();
        let b = BuildingModel::build(&spec, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_floor_count_beyond_limit_rejected() {
        let mut spec = three_room_spec();
        spec.program.floors = 1_000_000_000_000_000;
        let err = BuildingModel::build(&spec, None).unwrap_err();
        assert!(matches!(err, GeometryError::TooManyFloors { max: MAX_FLOORS, .. }));
    }

    #[test]
    fn test_realized_areas_match_targets_without_footprint() {
        let model = BuildingModel::build(&three_room_spec(), None).unwrap();
        for room in model.realized_program() {
            let target = match room.name.as_str() {
                "Living" => 25.0,
                "Kitchen" => 15.0,
                _ => 8.0,
            };
            assert!((room.area_m2 - target).abs() < 1e-6, "{} = {}", room.name, room.area_m2);
        }
    }

    #[test]
    fn test_massing_override_changes_envelope() {
        let spec = three_room_spec();
        let narrow = BuildingModel::build(&spec, Some(&MassingOverride { width_m: Some(12.0), ..Default::default() })).unwrap();
        let wide = BuildingModel::build(&spec, Some(&MassingOverride { width_m: Some(25.0), ..Default::default() })).unwrap();
        assert_eq!(narrow.dimensions().width_m, 12.0);
        assert_eq!(wide.dimensions().width_m, 25.0);
        assert_ne!(narrow, wide);
    }

    #[test]
    fn test_empty_program_is_geometry_error() {
        let spec = normalize(&json!({})).spec;
        assert_eq!(BuildingModel::build(&spec, None), Err(GeometryError::EmptyProgram));
    }

    #[test]
    fn test_floor_lookup_and_dimensions() {
        let spec = normalize(&json!({
            "program": {"rooms": [
                {"name": "Living", "area": 30, "floor": 0},
                {"name": "Bed", "area": 14, "floor": 1}
            ]},
            "geometry_rules": {"floor_height_m": 2.8}
        }))
        .spec;
        let model = BuildingModel::build(&spec, None).unwrap();
        let dims = model.dimensions();
        assert_eq!(dims.floor_count, 2);
        assert!((dims.eave_height_m - 5.6).abs() < 1e-9);
        assert!(dims.ridge_height_m > dims.eave_height_m);
        assert_eq!(model.floor(1).unwrap().elevation_m, 2.8);
        assert!(model.floor(2).is_none());
    }
}
