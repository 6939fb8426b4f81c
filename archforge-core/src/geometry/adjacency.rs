//! Room adjacency derived from shared walls.

use serde::{Deserialize, Serialize};

use super::{BuildingModel, Point2, Rect, Segment, EPS};

/// Shortest shared wall that still counts as adjacent, in meters.
pub const DEFAULT_MIN_SHARED_WALL_M: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyPair {
    pub room_a: String,
    pub room_b: String,
    pub floor: usize,
    pub adjacent: bool,
    pub shared_length_m: f64,
    /// Shared wall relative to the shorter side of the smaller room, capped at 1.
    pub score: f64,
}

impl AdjacencyPair {
    fn names(&self, a: &str, b: &str) -> bool {
        (self.room_a == a && self.room_b == b) || (self.room_a == b && self.room_b == a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyReport {
    pub min_shared_wall_m: f64,
    pub pairs: Vec<AdjacencyPair>,
}

impl AdjacencyReport {
    pub(crate) fn compute(model: &BuildingModel, min_shared_wall_m: f64) -> Self {
        let mut pairs = vec![];
        for floor in &model.floors {
            for (i, a) in floor.rooms.iter().enumerate() {
                for b in &floor.rooms[i + 1..] {
                    let shared = shared_edge(&a.rect, &b.rect).map(|s| s.length()).unwrap_or(0.0);
                    let shorter = a.rect.width.min(a.rect.depth).min(b.rect.width.min(b.rect.depth));
                    let score = if shorter > EPS { (shared / shorter).min(1.0) } else { 0.0 };
                    pairs.push(AdjacencyPair {
                        room_a: a.name.clone(),
                        room_b: b.name.clone(),
                        floor: floor.index,
                        adjacent: shared + EPS >= min_shared_wall_m,
                        shared_length_m: shared,
                        score,
                    });
                }
            }
        }
        Self { min_shared_wall_m, pairs }
    }

    /// Build a report from explicit pairs, e.g. one produced by another layout engine.
    pub fn from_pairs(min_shared_wall_m: f64, pairs: Vec<AdjacencyPair>) -> Self {
        Self { min_shared_wall_m, pairs }
    }

    pub fn pair(&self, a: &str, b: &str) -> Option<&AdjacencyPair> {
        self.pairs.iter().find(|p| p.names(a, b))
    }

    /// True when the two rooms share a wall on any floor.
    pub fn are_adjacent(&self, a: &str, b: &str) -> bool {
        self.pairs.iter().any(|p| p.adjacent && p.names(a, b))
    }

    pub fn adjacent_pairs(&self) -> impl Iterator<Item = &AdjacencyPair> {
        self.pairs.iter().filter(|p| p.adjacent)
    }
}

/// Segment where two axis-aligned rectangles touch, if any.
pub(crate) fn shared_edge(a: &Rect, b: &Rect) -> Option<Segment> {
    let vertical = [(a.max_x(), b.x), (b.max_x(), a.x)]
        .iter()
        .find(|(p, q)| (p - q).abs() <= EPS)
        .map(|(x, _)| *x);
    if let Some(x) = vertical {
        let lo = a.y.max(b.y);
        let hi = a.max_y().min(b.max_y());
        if hi - lo > EPS {
            return Some(Segment::new(Point2::new(x, lo), Point2::new(x, hi)));
        }
    }

    let horizontal = [(a.max_y(), b.y), (b.max_y(), a.y)]
        .iter()
        .find(|(p, q)| (p - q).abs() <= EPS)
        .map(|(y, _)| *y);
    if let Some(y) = horizontal {
        let lo = a.x.max(b.x);
        let hi = a.max_x().min(b.max_x());
        if hi - lo > EPS {
            return Some(Segment::new(Point2::new(lo, y), Point2::new(hi, y)));
        }
    }
    None
}
