//! Door and window placement.
//!
//! Windows are spaced evenly along every exterior wall inside a corner
//! clearance, so no opening ever touches a corner. The main entrance sits at
//! the middle of the ground-floor wall on the entrance facade; windows that
//! would crowd it are skipped. Interior doors are cut into shared walls of
//! room pairs the program asks to be adjacent.

use serde::{Deserialize, Serialize};

use super::adjacency::shared_edge;
use super::{Facade, Floor, Point2, Segment, Wall, EPS};
use crate::spec::{Specification, WindowPattern};

pub const CORNER_CLEARANCE_M: f64 = 0.6;
pub const MIN_OPENING_SPACING_M: f64 = 0.3;

const ENTRANCE: (f64, f64) = (1.0, 2.1);
const DOOR: (f64, f64) = (0.9, 2.1);
const DOOR_EDGE_CLEARANCE_M: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpeningKind {
    Window,
    Door,
    Entrance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "host", rename_all = "lowercase")]
pub enum OpeningHost {
    Exterior { wall_id: String, facade: Facade },
    Interior { wall_id: Option<String>, rooms: [String; 2] },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub id: String,
    pub kind: OpeningKind,
    pub floor: usize,
    pub host: OpeningHost,
    /// Plan position of the opening's center.
    pub center: Point2,
    /// Distance of the center from the host wall's start.
    pub along_m: f64,
    /// Whether the host wall runs east-west.
    pub horizontal: bool,
    pub width_m: f64,
    pub height_m: f64,
    pub sill_m: f64,
}

/// An opening in facade coordinates: `x` from the viewer's left, `z` up
/// from ground level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacadeOpening {
    pub id: String,
    pub kind: OpeningKind,
    pub floor: usize,
    pub x_m: f64,
    pub z_m: f64,
    pub width_m: f64,
    pub height_m: f64,
}

impl Opening {
    pub fn facade(&self) -> Option<Facade> {
        match &self.host {
            OpeningHost::Exterior { facade, .. } => Some(*facade),
            OpeningHost::Interior { .. } => None,
        }
    }

    // Exterior walls run counter-clockwise, which is left-to-right for a
    // viewer standing outside, so `along_m` is already the facade x.
    pub(crate) fn project(&self, facade: Facade, floor_elevation_m: f64) -> Option<FacadeOpening> {
        if self.facade() != Some(facade) {
            return None;
        }
        Some(FacadeOpening {
            id: self.id.clone(),
            kind: self.kind,
            floor: self.floor,
            x_m: self.along_m - self.width_m / 2.0,
            z_m: floor_elevation_m + self.sill_m,
            width_m: self.width_m,
            height_m: self.height_m,
        })
    }
}

fn window_size(pattern: WindowPattern) -> (f64, f64, f64) {
    match pattern {
        WindowPattern::Ribbon => (1.4, 0.9, 1.0),
        _ => (1.2, 1.2, 0.9),
    }
}

/// Centers of evenly spaced windows of `width` along a wall of `length`.
pub(crate) fn window_centers(length: f64, spacing: f64, width: f64) -> Vec<f64> {
    let usable = length - 2.0 * CORNER_CLEARANCE_M - width;
    if usable < -EPS {
        return vec![];
    }
    let usable = usable.max(0.0);
    let count = (usable / spacing + 1e-9).floor() as usize + 1;
    let span = (count - 1) as f64 * spacing;
    let start = CORNER_CLEARANCE_M + width / 2.0 + (usable - span) / 2.0;
    (0..count).map(|i| start + i as f64 * spacing).collect()
}

pub(crate) fn place(floor: &Floor, spec: &Specification) -> Vec<Opening> {
    let mut openings: Vec<Opening> = vec![];
    let next_id = |kind: OpeningKind, list: &Vec<Opening>| {
        let prefix = match kind {
            OpeningKind::Window => 'W',
            OpeningKind::Door => 'D',
            OpeningKind::Entrance => 'E',
        };
        let n = list.iter().filter(|o| o.kind == kind).count() + 1;
        format!("L{}-{}{:02}", floor.index, prefix, n)
    };

    if floor.index == 0 {
        if let Some(wall) = floor.exterior_wall(spec.site.orientation) {
            let along = wall.segment.length() / 2.0;
            let id = next_id(OpeningKind::Entrance, &openings);
            openings.push(exterior_opening(id, OpeningKind::Entrance, wall, along, ENTRANCE, 0.0));
        }
    }

    let pattern = spec.style.window_pattern;
    let (w, h, sill) = window_size(pattern);
    for wall in floor.walls.iter().filter(|w| w.exterior) {
        let doors: Vec<f64> = openings
            .iter()
            .filter(|o| o.kind != OpeningKind::Window && host_wall(o) == Some(wall.id.as_str()))
            .map(|o| o.along_m)
            .collect();
        for center in window_centers(wall.segment.length(), pattern.spacing_m(), w) {
            let crowded = doors
                .iter()
                .any(|d| (center - d).abs() < (w + ENTRANCE.0) / 2.0 + MIN_OPENING_SPACING_M);
            if crowded {
                continue;
            }
            let id = next_id(OpeningKind::Window, &openings);
            openings.push(exterior_opening(id, OpeningKind::Window, wall, center, (w, h), sill));
        }
    }

    for adj in &spec.program.adjacency {
        let (Some(a), Some(b)) = (floor.room(&adj.a), floor.room(&adj.b)) else {
            continue;
        };
        let Some(edge) = shared_edge(&a.rect, &b.rect) else {
            continue;
        };
        if edge.length() < DOOR.0 + 2.0 * DOOR_EDGE_CLEARANCE_M {
            continue;
        }
        let center = edge.point_at(edge.length() / 2.0);
        let host = floor.walls.iter().find(|w| !w.exterior && on_segment(&w.segment, center));
        let along = host
            .map(|w| distance(w.segment.start, center))
            .unwrap_or(edge.length() / 2.0);
        let id = next_id(OpeningKind::Door, &openings);
        openings.push(Opening {
            id,
            kind: OpeningKind::Door,
            floor: floor.index,
            host: OpeningHost::Interior {
                wall_id: host.map(|w| w.id.clone()),
                rooms: [a.name.clone(), b.name.clone()],
            },
            center,
            along_m: along,
            horizontal: edge.is_horizontal(),
            width_m: DOOR.0,
            height_m: DOOR.1,
            sill_m: 0.0,
        });
    }

    openings
}

fn exterior_opening(
    id: String,
    kind: OpeningKind,
    wall: &Wall,
    along: f64,
    (width_m, height_m): (f64, f64),
    sill_m: f64,
) -> Opening {
    Opening {
        id,
        kind,
        floor: wall.floor,
        host: OpeningHost::Exterior {
            wall_id: wall.id.clone(),
            facade: wall.facade.unwrap_or(Facade::South),
        },
        center: wall.segment.point_at(along),
        along_m: along,
        horizontal: wall.segment.is_horizontal(),
        width_m,
        height_m,
        sill_m,
    }
}

fn host_wall(opening: &Opening) -> Option<&str> {
    match &opening.host {
        OpeningHost::Exterior { wall_id, .. } => Some(wall_id.as_str()),
        OpeningHost::Interior { wall_id, .. } => wall_id.as_deref(),
    }
}

fn distance(a: Point2, b: Point2) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

fn on_segment(segment: &Segment, p: Point2) -> bool {
    let len = segment.length();
    (distance(segment.start, p) + distance(p, segment.end) - len).abs() < 1e-4
}
