//! Facade elevations and building sections.

use super::svg::{SvgCanvas, Viewport};
use crate::geometry::{BuildingModel, Facade, OpeningKind};

const SLAB_M: f64 = 0.25;
const GROUND_OVERHANG_M: f64 = 1.5;

/// Cut direction of a section drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cut {
    /// Along the width at mid-depth, looking north.
    Longitudinal,
    /// Along the depth at mid-width, looking west.
    Transverse,
}

fn viewport(canvas: (u32, u32), length: f64, height: f64) -> Viewport {
    Viewport::fit(canvas, -GROUND_OVERHANG_M, -0.5, length + GROUND_OVERHANG_M, height + 0.5)
}

pub(crate) fn render_elevation(model: &BuildingModel, facade: Facade, canvas: (u32, u32)) -> String {
    let length = model.envelope.facade_length(facade);
    let profile = model.roof_profile(facade);
    let vp = viewport(canvas, length, profile.peak_m());
    let mut svg = SvgCanvas::new(canvas);

    svg.line(vp.px(-GROUND_OVERHANG_M, 0.0), vp.px(length + GROUND_OVERHANG_M, 0.0), 3.0);
    svg.rect(vp.px(0.0, 0.0), vp.px(length, model.roof.eave_height_m), 4.0, None);

    let roof: Vec<(f64, f64)> = profile.points.iter().map(|p| vp.px(p.x, p.z)).collect();
    svg.polyline(&roof, false, 4.0);

    for floor in model.floors.iter().skip(1) {
        svg.dashed(vp.px(0.0, floor.elevation_m), vp.px(length, floor.elevation_m), 1.0);
    }

    for opening in model.openings_for_facade(facade) {
        let a = vp.px(opening.x_m, opening.z_m);
        let b = vp.px(opening.x_m + opening.width_m, opening.z_m + opening.height_m);
        svg.rect(a, b, 2.0, None);
        if opening.kind == OpeningKind::Window {
            let mid = opening.x_m + opening.width_m / 2.0;
            svg.line(vp.px(mid, opening.z_m), vp.px(mid, opening.z_m + opening.height_m), 1.0);
        }
    }

    svg.finish()
}

pub(crate) fn render_section(model: &BuildingModel, cut: Cut, canvas: (u32, u32)) -> String {
    let env = model.envelope;
    let (length, facade) = match cut {
        Cut::Longitudinal => (env.width_m, Facade::South),
        Cut::Transverse => (env.depth_m, Facade::East),
    };
    let profile = model.roof_profile(facade);
    let eave = model.roof.eave_height_m;
    let vp = viewport(canvas, length, profile.peak_m());
    let mut svg = SvgCanvas::new(canvas);

    svg.line(vp.px(-GROUND_OVERHANG_M, 0.0), vp.px(length + GROUND_OVERHANG_M, 0.0), 3.0);
    svg.line(vp.px(0.0, 0.0), vp.px(0.0, eave), 6.0);
    svg.line(vp.px(length, 0.0), vp.px(length, eave), 6.0);

    // Slabs at every level plus the roof deck.
    for floor in &model.floors {
        svg.rect(vp.px(0.0, floor.elevation_m), vp.px(length, floor.elevation_m + SLAB_M), 1.0, Some("#000000"));
    }
    svg.rect(vp.px(0.0, eave - SLAB_M), vp.px(length, eave), 1.0, Some("#000000"));

    let roof: Vec<(f64, f64)> = profile.points.iter().map(|p| vp.px(p.x, p.z)).collect();
    svg.polyline(&roof, false, 4.0);

    for floor in &model.floors {
        let top = floor.elevation_m + floor.height_m;
        for position in cut_walls(model, floor.index, cut) {
            svg.line(vp.px(position, floor.elevation_m + SLAB_M), vp.px(position, top), 3.0);
        }
    }

    if cut == Cut::Longitudinal {
        for bay in 1..model.structure.bays {
            let x = bay as f64 * model.structure.bay_width_m;
            svg.dashed(vp.px(x, 0.0), vp.px(x, eave), 1.0);
        }
    }

    svg.finish()
}

/// Positions along the cut where interior walls are sliced.
fn cut_walls(model: &BuildingModel, floor: usize, cut: Cut) -> Vec<f64> {
    let Some(floor) = model.floor(floor) else {
        return vec![];
    };
    let env = model.envelope;
    floor
        .walls
        .iter()
        .filter(|w| !w.exterior)
        .filter_map(|w| {
            let s = w.segment;
            match cut {
                Cut::Longitudinal if !s.is_horizontal() => {
                    let mid = env.depth_m / 2.0;
                    let (lo, hi) = (s.start.y.min(s.end.y), s.start.y.max(s.end.y));
                    (lo <= mid && mid <= hi).then_some(s.start.x)
                }
                Cut::Transverse if s.is_horizontal() => {
                    let mid = env.width_m / 2.0;
                    let (lo, hi) = (s.start.x.min(s.end.x), s.start.x.max(s.end.x));
                    (lo <= mid && mid <= hi).then_some(s.start.y)
                }
                _ => None,
            }
        })
        .collect()
}
