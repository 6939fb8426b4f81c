//! Design Specification - the building "DNA"
//!
//! A raw design description is repaired by [`normalize`], checked by
//! [`validate_schema`] and then frozen with [`freeze`]. Every later stage
//! reads the same [`FrozenSpec`].

mod frozen;
mod normalize;
mod schema;

pub use frozen::{freeze, FreezeError, FreezeMode, FrozenSpec};
pub use normalize::{normalize, Normalized, Repair, MAX_FLOORS};
pub use schema::{validate_schema, SchemaReport, SpecificationError, SPEC_SCHEMA_VERSION};

use serde::{Deserialize, Serialize};

use crate::geometry::{Facade, Point2};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub schema_version: String,
    pub site: Site,
    pub program: Program,
    pub style: Style,
    pub geometry_rules: GeometryRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub polygon: Vec<Point2>,
    pub area_m2: f64,
    /// Facade carrying the main entrance.
    pub orientation: Facade,
    #[serde(default)]
    pub climate: Option<serde_json::Value>,
    #[serde(default)]
    pub sun_path: Option<serde_json::Value>,
    #[serde(default)]
    pub wind: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub floors: usize,
    pub rooms: Vec<RoomSpec>,
    #[serde(default)]
    pub adjacency: Vec<AdjacencySpec>,
}

impl Program {
    pub fn total_area_m2(&self) -> f64 {
        self.rooms.iter().map(|r| r.area_m2).sum()
    }

    pub fn rooms_on(&self, floor: usize) -> impl Iterator<Item = &RoomSpec> {
        self.rooms.iter().filter(move |r| r.floor == floor)
    }

    pub fn room(&self, name: &str) -> Option<&RoomSpec> {
        self.rooms.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub name: String,
    pub area_m2: f64,
    pub floor: usize,
    #[serde(default)]
    pub orientation: Option<Facade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencySpec {
    pub a: String,
    pub b: String,
    pub priority: AdjacencyPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjacencyPriority {
    Required,
    Preferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub architecture: String,
    pub materials: Vec<String>,
    pub window_pattern: WindowPattern,
    /// Presentation-only label; never affects geometry.
    #[serde(default)]
    pub palette: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPattern {
    Sparse,
    Regular,
    Dense,
    Ribbon,
}

impl WindowPattern {
    /// Center-to-center window spacing along a facade, in meters.
    pub fn spacing_m(self) -> f64 {
        match self {
            Self::Sparse => 4.5,
            Self::Regular => 3.0,
            Self::Dense => 2.0,
            Self::Ribbon => 1.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRules {
    pub grid_m: f64,
    pub max_span_m: f64,
    pub roof_type: RoofType,
    pub roof_pitch_deg: f64,
    pub floor_height_m: f64,
    #[serde(default)]
    pub footprint: Option<Footprint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub width_m: f64,
    pub depth_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoofType {
    Flat,
    Gable,
    Hip,
    Mono,
}
