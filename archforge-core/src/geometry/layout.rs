//! Room packing and wall derivation.
//!
//! Rooms are sorted by target area and packed row-major into a grid of
//! `ceil(sqrt(n))` columns. Each row spans the envelope width; a row's depth
//! is its area divided by that width, so every cell keeps its target area
//! unless the floor does not fit the envelope, in which case all cells are
//! scaled down together.
//!
//! Required adjacencies are then resolved by swapping rooms in the packing
//! order. A re-pack keeps every cell's area, so swaps only move rooms.

use super::adjacency::{shared_edge, DEFAULT_MIN_SHARED_WALL_M};
use super::{
    polygon_bounds, Envelope, Facade, Floor, GeometryError, MassingOverride, Point2, Rect, Room,
    Segment, StructuralGrid, Wall, EPS,
};
use crate::spec::{RoomSpec, Specification};
use tracing::debug;

const MIN_ASPECT: f64 = 0.5;
const MAX_ASPECT: f64 = 2.0;
const MAX_SWAP_PASSES: usize = 20;

/// Two room names that must share a wall.
pub(crate) type RequiredPair<'a> = (&'a str, &'a str);

pub(crate) struct PackedFloor {
    pub rooms: Vec<Room>,
    pub interior_walls: Vec<Wall>,
}

fn snap_up(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    let cells = (value / grid - 1e-9).ceil().max(1.0);
    round_mm(cells * grid)
}

fn round_mm(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn valid_length(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x > 0.0 && x.is_finite())
}

pub(crate) fn envelope(spec: &Specification, massing: Option<&MassingOverride>) -> Result<Envelope, GeometryError> {
    let program = &spec.program;
    let rules = &spec.geometry_rules;
    let floor_area = (0..program.floors.max(1))
        .map(|f| program.rooms_on(f).map(|r| r.area_m2).sum::<f64>())
        .fold(0.0, f64::max);

    let aspect = polygon_bounds(&spec.site.polygon)
        .filter(|b| b.depth > EPS)
        .map(|b| b.width / b.depth)
        .unwrap_or(1.0)
        .clamp(MIN_ASPECT, MAX_ASPECT);

    let width_m = valid_length(massing.and_then(|m| m.width_m))
        .or_else(|| valid_length(rules.footprint.map(|f| f.width_m)))
        .unwrap_or_else(|| snap_up((floor_area * aspect).sqrt(), rules.grid_m));
    let depth_m = valid_length(massing.and_then(|m| m.depth_m))
        .or_else(|| valid_length(rules.footprint.map(|f| f.depth_m)))
        .unwrap_or_else(|| snap_up(floor_area / width_m, rules.grid_m));

    if !(width_m > 0.0 && depth_m > 0.0 && width_m.is_finite() && depth_m.is_finite()) {
        return Err(GeometryError::InvalidEnvelope { width_m, depth_m });
    }
    Ok(Envelope { width_m, depth_m })
}

pub(crate) fn pack_floor<'a>(
    floor: usize,
    rooms: impl Iterator<Item = &'a RoomSpec>,
    envelope: &Envelope,
    required: &[RequiredPair<'_>],
) -> PackedFloor {
    let mut order: Vec<&RoomSpec> = rooms.collect();
    order.sort_by(|a, b| b.area_m2.total_cmp(&a.area_m2).then_with(|| a.name.cmp(&b.name)));

    let on_floor = |name: &str| order.iter().any(|r| r.name == name);
    let required: Vec<RequiredPair<'_>> =
        required.iter().copied().filter(|(a, b)| on_floor(*a) && on_floor(*b)).collect();

    let mut packed = pack_order(floor, &order, envelope);
    let mut unmet = unmet_count(&packed.rooms, &required);
    for _ in 0..MAX_SWAP_PASSES {
        if unmet == 0 {
            break;
        }
        let Some((next_order, next_packed, next_unmet)) = best_swap(floor, &order, envelope, &required, unmet)
        else {
            break;
        };
        debug!(floor, unmet = next_unmet, "rooms swapped toward required adjacency");
        order = next_order;
        packed = next_packed;
        unmet = next_unmet;
    }
    packed
}

/// The single swap that leaves the fewest required pairs apart, if any improves on `unmet`.
fn best_swap<'a>(
    floor: usize,
    order: &[&'a RoomSpec],
    envelope: &Envelope,
    required: &[RequiredPair<'_>],
    unmet: usize,
) -> Option<(Vec<&'a RoomSpec>, PackedFloor, usize)> {
    let mut best: Option<(Vec<&'a RoomSpec>, PackedFloor, usize)> = None;
    for i in 0..order.len() {
        for j in i + 1..order.len() {
            let mut candidate = order.to_vec();
            candidate.swap(i, j);
            let packed = pack_order(floor, &candidate, envelope);
            let count = unmet_count(&packed.rooms, required);
            if count < best.as_ref().map_or(unmet, |b| b.2) {
                best = Some((candidate, packed, count));
            }
        }
    }
    best
}

fn unmet_count(rooms: &[Room], required: &[RequiredPair<'_>]) -> usize {
    let rect = |name: &str| rooms.iter().find(|r| r.name == name).map(|r| r.rect);
    required
        .iter()
        .filter(|(a, b)| {
            let shared = match (rect(*a), rect(*b)) {
                (Some(a), Some(b)) => shared_edge(&a, &b).map(|s| s.length()).unwrap_or(0.0),
                _ => 0.0,
            };
            shared + EPS < DEFAULT_MIN_SHARED_WALL_M
        })
        .count()
}

fn pack_order(floor: usize, sorted: &[&RoomSpec], envelope: &Envelope) -> PackedFloor {
    let n = sorted.len();
    if n == 0 {
        return PackedFloor { rooms: vec![], interior_walls: vec![] };
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    let width = envelope.width_m;

    let total: f64 = sorted.iter().map(|r| r.area_m2).sum();
    let scale = if total > envelope.area_m2() { envelope.area_m2() / total } else { 1.0 };

    let mut rooms = Vec::with_capacity(n);
    let mut interior_walls = vec![];
    let mut y = 0.0;
    let row_count = sorted.chunks(cols).len();

    for (row_index, row) in sorted.chunks(cols).enumerate() {
        let row_area: f64 = row.iter().map(|r| r.area_m2 * scale).sum();
        let last_row = row_index + 1 == row_count;
        let mut row_depth = row_area / width;
        if last_row && scale < 1.0 {
            row_depth = envelope.depth_m - y;
        }

        let mut x = 0.0;
        for (col, spec) in row.iter().enumerate() {
            let room_width = if col + 1 == row.len() {
                width - x
            } else {
                spec.area_m2 * scale / row_depth
            };
            let rect = Rect::new(x, y, room_width, row_depth);
            let index = rooms.len() + 1;
            rooms.push(Room {
                id: format!("L{}-R{:02}", floor, index),
                name: spec.name.clone(),
                floor,
                target_area_m2: spec.area_m2,
                rect,
                polygon: rect.corners().to_vec(),
            });
            if col > 0 {
                interior_walls.push(interior_wall(
                    floor,
                    interior_walls.len(),
                    Point2::new(x, y),
                    Point2::new(x, y + row_depth),
                ));
            }
            x += room_width;
        }

        y += row_depth;
        if y < envelope.depth_m - EPS {
            interior_walls.push(interior_wall(
                floor,
                interior_walls.len(),
                Point2::new(0.0, y),
                Point2::new(width, y),
            ));
        }
    }

    PackedFloor { rooms, interior_walls }
}

fn interior_wall(floor: usize, index: usize, start: Point2, end: Point2) -> Wall {
    Wall {
        id: format!("L{}-INT-{:02}", floor, index + 1),
        floor,
        segment: Segment::new(start, end),
        exterior: false,
        facade: None,
    }
}

/// Envelope walls counter-clockwise from the south-west corner.
pub(crate) fn exterior_walls(floor: usize, envelope: &Envelope) -> Vec<Wall> {
    let [sw, se, ne, nw] = envelope.rect().corners();
    [
        (Facade::South, sw, se),
        (Facade::East, se, ne),
        (Facade::North, ne, nw),
        (Facade::West, nw, sw),
    ]
    .into_iter()
    .map(|(facade, start, end)| Wall {
        id: format!("L{}-EXT-{}", floor, facade.letter()),
        floor,
        segment: Segment::new(start, end),
        exterior: true,
        facade: Some(facade),
    })
    .collect()
}

pub(crate) fn structural_grid(envelope: &Envelope, max_span_m: f64) -> StructuralGrid {
    let span = if max_span_m > 0.0 { max_span_m } else { envelope.width_m };
    let bays = ((envelope.width_m / span) - 1e-9).ceil().max(1.0) as usize;
    StructuralGrid { bays, bay_width_m: envelope.width_m / bays as f64 }
}

pub(crate) fn check_floor(floor: &Floor, envelope: &Envelope) -> Result<(), GeometryError> {
    let bounds = envelope.rect();
    for room in &floor.rooms {
        if !room.rect.is_finite() {
            return Err(GeometryError::NonFinite(room.id.clone()));
        }
        if !bounds.contains(&room.rect) {
            return Err(GeometryError::RoomOutsideEnvelope {
                room: room.name.clone(),
                floor: floor.index,
            });
        }
    }
    for (i, a) in floor.rooms.iter().enumerate() {
        for b in &floor.rooms[i + 1..] {
            if a.rect.overlaps(&b.rect) {
                return Err(GeometryError::Overlap {
                    a: a.name.clone(),
                    b: b.name.clone(),
                    floor: floor.index,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::tests::three_room_spec;
    use crate::spec::Footprint;

    fn room(name: &str, area: f64) -> RoomSpec {
        RoomSpec { name: name.to_string(), area_m2: area, floor: 0, orientation: None }
    }

    #[test]
    fn test_snap_up_to_grid() {
        assert_eq!(snap_up(12.0, 0.6), 12.0);
        assert_eq!(snap_up(12.01, 0.6), 12.6);
        assert_eq!(snap_up(0.1, 0.6), 0.6);
    }

    #[test]
    fn test_grid_is_ceil_sqrt_columns() {
        let specs: Vec<RoomSpec> = (0..5).map(|i| room(&format!("R{}", i), 10.0)).collect();
        let env = Envelope { width_m: 10.0, depth_m: 10.0 };
        let packed = pack_floor(0, specs.iter(), &env, &[]);
        let rows: std::collections::BTreeSet<i64> =
            packed.rooms.iter().map(|r| (r.rect.y * 1000.0).round() as i64).collect();
        // 5 rooms, 3 columns, 2 rows
        assert_eq!(rows.len(), 2);
        assert_eq!(packed.rooms.iter().filter(|r| r.rect.y == 0.0).count(), 3);
    }

    #[test]
    fn test_rooms_sorted_by_area_descending() {
        let specs = vec![room("Small", 5.0), room("Big", 20.0), room("Mid", 10.0)];
        let env = Envelope { width_m: 6.0, depth_m: 6.0 };
        let packed = pack_floor(0, specs.iter(), &env, &[]);
        let names: Vec<_> = packed.rooms.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Big", "Mid", "Small"]);
        assert_eq!(packed.rooms[0].id, "L0-R01");
    }

    #[test]
    fn test_oversized_floor_scaled_into_envelope() {
        let specs = vec![room("A", 40.0), room("B", 40.0)];
        let env = Envelope { width_m: 5.0, depth_m: 8.0 };
        let packed = pack_floor(0, specs.iter(), &env, &[]);
        let total: f64 = packed.rooms.iter().map(|r| r.rect.area()).sum();
        assert!((total - 40.0).abs() < 1e-9);
        let floor = Floor {
            index: 0,
            elevation_m: 0.0,
            height_m: 3.0,
            rooms: packed.rooms,
            walls: vec![],
            openings: vec![],
        };
        assert!(check_floor(&floor, &env).is_ok());
    }

    #[test]
    fn test_rooms_never_overlap() {
        let specs: Vec<RoomSpec> = [31.0, 17.5, 12.0, 9.0, 7.5, 4.0, 3.2]
            .iter()
            .enumerate()
            .map(|(i, a)| room(&format!("R{}", i), *a))
            .collect();
        let env = Envelope { width_m: 9.0, depth_m: 10.2 };
        let packed = pack_floor(0, specs.iter(), &env, &[]);
        for (i, a) in packed.rooms.iter().enumerate() {
            for b in &packed.rooms[i + 1..] {
                assert!(!a.rect.overlaps(&b.rect), "{} overlaps {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_required_pair_resolved_by_swap() {
        let specs = vec![room("A", 30.0), room("B", 20.0), room("C", 15.0), room("D", 10.0)];
        let env = Envelope { width_m: 10.8, depth_m: 7.2 };

        let plain = pack_floor(0, specs.iter(), &env, &[]);
        assert_eq!(unmet_count(&plain.rooms, &[("A", "D")]), 1);

        let resolved = pack_floor(0, specs.iter(), &env, &[("A", "D")]);
        assert_eq!(unmet_count(&resolved.rooms, &[("A", "D")]), 0);
        for spec in &specs {
            let placed = resolved.rooms.iter().find(|r| r.name == spec.name).unwrap();
            assert!((placed.rect.area() - spec.area_m2).abs() < 1e-6, "{} lost area", spec.name);
        }
        for (i, a) in resolved.rooms.iter().enumerate() {
            for b in &resolved.rooms[i + 1..] {
                assert!(!a.rect.overlaps(&b.rect), "{} overlaps {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_unsatisfiable_pairs_keep_area_order() {
        // The two rooms sharing the top row touch along less than the minimum wall.
        let specs = vec![room("A", 10.0), room("B", 10.0), room("C", 10.0)];
        let env = Envelope { width_m: 30.0, depth_m: 1.0 };
        let packed = pack_floor(0, specs.iter(), &env, &[("A", "B"), ("B", "C"), ("A", "C")]);
        assert_eq!(packed.rooms.len(), 3);
        assert_eq!(unmet_count(&packed.rooms, &[("A", "B"), ("B", "C"), ("A", "C")]), 1);
        let names: Vec<_> = packed.rooms.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_exterior_walls_run_counter_clockwise() {
        let walls = exterior_walls(0, &Envelope { width_m: 10.0, depth_m: 6.0 });
        assert_eq!(walls.len(), 4);
        assert_eq!(walls[0].facade, Some(Facade::South));
        assert_eq!(walls[0].segment.end, Point2::new(10.0, 0.0));
        assert_eq!(walls[2].facade, Some(Facade::North));
        assert_eq!(walls[2].segment.start, Point2::new(10.0, 6.0));
    }

    #[test]
    fn test_footprint_used_when_present() {
        let mut spec = three_room_spec();
        spec.geometry_rules.footprint = Some(Footprint { width_m: 8.0, depth_m: 7.0 });
        let env = envelope(&spec, None).unwrap();
        assert_eq!(env, Envelope { width_m: 8.0, depth_m: 7.0 });
    }

    #[test]
    fn test_structural_bays() {
        let grid = structural_grid(&Envelope { width_m: 13.0, depth_m: 6.0 }, 6.0);
        assert_eq!(grid.bays, 3);
        let grid = structural_grid(&Envelope { width_m: 12.0, depth_m: 6.0 }, 6.0);
        assert_eq!(grid.bays, 2);
    }
}
