//! Panel Catalogue - canonical panel keys
//!
//! Every boundary (service results, grid config, CLI input) funnels panel
//! names through [`PanelType::from_key`], so internal code only ever sees
//! the canonical set below. Variant order is the fixed processing order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Facade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PanelType {
    FloorPlanGround,
    FloorPlanFirst,
    FloorPlanSecond,
    ElevationNorth,
    ElevationSouth,
    ElevationEast,
    ElevationWest,
    SectionAA,
    SectionBB,
    Hero3d,
    Axonometric3d,
}

/// The documented processing order. Seeds are derived from positions in
/// this list, so reordering it changes every downstream seed.
pub const PANEL_ORDER: [PanelType; 11] = [
    PanelType::FloorPlanGround,
    PanelType::FloorPlanFirst,
    PanelType::FloorPlanSecond,
    PanelType::ElevationNorth,
    PanelType::ElevationSouth,
    PanelType::ElevationEast,
    PanelType::ElevationWest,
    PanelType::SectionAA,
    PanelType::SectionBB,
    PanelType::Hero3d,
    PanelType::Axonometric3d,
];

/// Plans beyond this many levels are not drawn on the sheet.
pub const MAX_PLAN_LEVELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelCategory {
    /// Plans, elevations, sections: dimensional fidelity dominates.
    TechnicalDrawing,
    /// Stylized 3D views: massing must match, surface may vary.
    Render3d,
}

impl PanelType {
    pub fn key(self) -> &'static str {
        match self {
            Self::FloorPlanGround => "floor_plan_ground",
            Self::FloorPlanFirst => "floor_plan_first",
            Self::FloorPlanSecond => "floor_plan_second",
            Self::ElevationNorth => "elevation_north",
            Self::ElevationSouth => "elevation_south",
            Self::ElevationEast => "elevation_east",
            Self::ElevationWest => "elevation_west",
            Self::SectionAA => "section_a_a",
            Self::SectionBB => "section_b_b",
            Self::Hero3d => "hero_3d",
            Self::Axonometric3d => "axonometric_3d",
        }
    }

    /// Map any known spelling to its canonical panel type.
    pub fn from_key(raw: &str) -> Option<Self> {
        let key = normalize_key(raw);
        let panel = match key.as_str() {
            "floor_plan_ground" | "floor_plan" | "ground_floor_plan" | "plan_ground"
            | "ground_floor" | "plan_0" | "floor_plan_0" | "floor_plan_g" | "plan" => {
                Self::FloorPlanGround
            }
            "floor_plan_first" | "first_floor_plan" | "plan_first" | "first_floor" | "plan_1"
            | "floor_plan_1" | "upper_floor_plan" => Self::FloorPlanFirst,
            "floor_plan_second" | "second_floor_plan" | "plan_second" | "second_floor"
            | "plan_2" | "floor_plan_2" => Self::FloorPlanSecond,
            "elevation_north" | "north_elevation" | "elevation_n" | "elev_n" | "north_elev" => {
                Self::ElevationNorth
            }
            "elevation_south" | "south_elevation" | "elevation_s" | "elev_s" | "south_elev" => {
                Self::ElevationSouth
            }
            "elevation_east" | "east_elevation" | "elevation_e" | "elev_e" | "east_elev" => {
                Self::ElevationEast
            }
            "elevation_west" | "west_elevation" | "elevation_w" | "elev_w" | "west_elev" => {
                Self::ElevationWest
            }
            "section_a_a" | "section_aa" | "section_a" | "section_longitudinal"
            | "longitudinal_section" | "section" => Self::SectionAA,
            "section_b_b" | "section_bb" | "section_b" | "section_transverse"
            | "transverse_section" | "cross_section" => Self::SectionBB,
            "hero_3d" | "hero" | "hero_perspective" | "perspective" | "persp_main"
            | "exterior_3d" | "3d_hero" | "exterior_render" => Self::Hero3d,
            "axonometric_3d" | "axonometric" | "axo" | "axonometric_view" | "3d_axonometric"
            | "isometric" => Self::Axonometric3d,
            _ => return None,
        };
        Some(panel)
    }

    pub fn category(self) -> PanelCategory {
        match self {
            Self::Hero3d | Self::Axonometric3d => PanelCategory::Render3d,
            _ => PanelCategory::TechnicalDrawing,
        }
    }

    /// Floor index drawn by a plan panel.
    pub fn plan_level(self) -> Option<usize> {
        match self {
            Self::FloorPlanGround => Some(0),
            Self::FloorPlanFirst => Some(1),
            Self::FloorPlanSecond => Some(2),
            _ => None,
        }
    }

    pub fn facade(self) -> Option<Facade> {
        match self {
            Self::ElevationNorth => Some(Facade::North),
            Self::ElevationSouth => Some(Facade::South),
            Self::ElevationEast => Some(Facade::East),
            Self::ElevationWest => Some(Facade::West),
            _ => None,
        }
    }

    /// Generation canvas (width, height) in pixels.
    pub fn canvas_size(self) -> (u32, u32) {
        match self {
            Self::FloorPlanGround | Self::FloorPlanFirst | Self::FloorPlanSecond => (1024, 1024),
            Self::ElevationNorth
            | Self::ElevationSouth
            | Self::ElevationEast
            | Self::ElevationWest
            | Self::SectionAA
            | Self::SectionBB => (1344, 768),
            Self::Hero3d => (1536, 1024),
            Self::Axonometric3d => (1024, 1024),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::FloorPlanGround => "Ground Floor Plan",
            Self::FloorPlanFirst => "First Floor Plan",
            Self::FloorPlanSecond => "Second Floor Plan",
            Self::ElevationNorth => "North Elevation",
            Self::ElevationSouth => "South Elevation",
            Self::ElevationEast => "East Elevation",
            Self::ElevationWest => "West Elevation",
            Self::SectionAA => "Section A-A",
            Self::SectionBB => "Section B-B",
            Self::Hero3d => "Exterior Perspective",
            Self::Axonometric3d => "Axonometric",
        }
    }
}

/// Panels a building with `floor_count` floors must present, in order.
pub fn required_panels(floor_count: usize) -> Vec<PanelType> {
    PANEL_ORDER
        .iter()
        .copied()
        .filter(|p| match p.plan_level() {
            Some(level) => level < floor_count.min(MAX_PLAN_LEVELS),
            None => true,
        })
        .collect()
}

fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        let c = match ch {
            '-' | ' ' | '.' | '/' => '_',
            c => c.to_ascii_lowercase(),
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

impl fmt::Display for PanelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl From<PanelType> for String {
    fn from(panel: PanelType) -> Self {
        panel.key().to_string()
    }
}

impl TryFrom<String> for PanelType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_key(&value).ok_or_else(|| format!("unknown panel type: {}", value))
    }
}
