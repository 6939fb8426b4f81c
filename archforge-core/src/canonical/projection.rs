//! Wireframe 3D views of the building massing.

use super::svg::{SvgCanvas, Viewport};
use crate::geometry::{BuildingModel, RidgeAxis};
use crate::spec::RoofType;

type P3 = [f64; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    /// Eye-level perspective from the south-east.
    Hero,
    /// 30 degree isometric from the south-west.
    Axonometric,
}

const EYE_HEIGHT_M: f64 = 1.7;

pub(crate) fn render(model: &BuildingModel, view: View, canvas: (u32, u32)) -> String {
    let edges = wireframe(model);
    let projected: Vec<((f64, f64), (f64, f64))> = edges
        .iter()
        .map(|(a, b)| (project(model, view, *a), project(model, view, *b)))
        .collect();

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for (a, b) in &projected {
        for p in [a, b] {
            min_x = min_x.min(p.0);
            min_y = min_y.min(p.1);
            max_x = max_x.max(p.0);
            max_y = max_y.max(p.1);
        }
    }
    let vp = Viewport::fit(canvas, min_x, min_y, max_x, max_y);
    let mut svg = SvgCanvas::new(canvas);
    for (a, b) in projected {
        svg.line(vp.px(a.0, a.1), vp.px(b.0, b.1), 2.0);
    }
    svg.finish()
}

fn project(model: &BuildingModel, view: View, [x, y, z]: P3) -> (f64, f64) {
    let env = model.envelope;
    match view {
        View::Axonometric => {
            let (s, c) = 30f64.to_radians().sin_cos();
            ((x - y) * c, (x + y) * s + z)
        }
        View::Hero => {
            let (cx, cy) = (x - env.width_m / 2.0, y - env.depth_m / 2.0);
            let (s, c) = (-35f64).to_radians().sin_cos();
            let right = cx * c - cy * s;
            let depth = cx * s + cy * c;
            let distance = 2.5 * env.width_m.max(env.depth_m).max(model.roof.ridge_height_m);
            let f = distance / (distance + depth).max(1e-3);
            (right * f, (z - EYE_HEIGHT_M) * f)
        }
    }
}

/// Box edges, floor lines and roof edges in world coordinates.
pub(crate) fn wireframe(model: &BuildingModel) -> Vec<(P3, P3)> {
    let (w, d) = (model.envelope.width_m, model.envelope.depth_m);
    let eave = model.roof.eave_height_m;
    let corners = [[0.0, 0.0], [w, 0.0], [w, d], [0.0, d]];
    let mut edges = vec![];

    for i in 0..4 {
        let [x0, y0] = corners[i];
        let [x1, y1] = corners[(i + 1) % 4];
        edges.push(([x0, y0, 0.0], [x1, y1, 0.0]));
        edges.push(([x0, y0, eave], [x1, y1, eave]));
        edges.push(([x0, y0, 0.0], [x0, y0, eave]));
        for floor in model.floors.iter().skip(1) {
            let z = floor.elevation_m;
            edges.push(([x0, y0, z], [x1, y1, z]));
        }
    }
    edges.extend(roof_edges(model));
    edges
}

fn roof_edges(model: &BuildingModel) -> Vec<(P3, P3)> {
    let roof = &model.roof;
    let (w, d) = (model.envelope.width_m, model.envelope.depth_m);
    let (eave, top) = (roof.eave_height_m, roof.ridge_height_m);
    // `a` runs along the ridge, `c` across it.
    let (long, short) = match roof.ridge_axis {
        RidgeAxis::EastWest => (w, d),
        RidgeAxis::NorthSouth => (d, w),
    };
    let at = |a: f64, c: f64, z: f64| -> P3 {
        match roof.ridge_axis {
            RidgeAxis::EastWest => [a, c, z],
            RidgeAxis::NorthSouth => [c, a, z],
        }
    };

    match roof.roof_type {
        RoofType::Flat => {
            let corners = [(0.0, 0.0), (long, 0.0), (long, short), (0.0, short)];
            let mut edges = vec![];
            for i in 0..4 {
                let (a0, c0) = corners[i];
                let (a1, c1) = corners[(i + 1) % 4];
                edges.push((at(a0, c0, top), at(a1, c1, top)));
                edges.push((at(a0, c0, eave), at(a0, c0, top)));
            }
            edges
        }
        RoofType::Gable => {
            let mid = short / 2.0;
            vec![
                (at(0.0, mid, top), at(long, mid, top)),
                (at(0.0, 0.0, eave), at(0.0, mid, top)),
                (at(0.0, short, eave), at(0.0, mid, top)),
                (at(long, 0.0, eave), at(long, mid, top)),
                (at(long, short, eave), at(long, mid, top)),
            ]
        }
        RoofType::Hip => {
            let mid = short / 2.0;
            let inset = (long - roof.ridge_length_m) / 2.0;
            let (r0, r1) = (at(inset, mid, top), at(long - inset, mid, top));
            vec![
                (r0, r1),
                (at(0.0, 0.0, eave), r0),
                (at(0.0, short, eave), r0),
                (at(long, 0.0, eave), r1),
                (at(long, short, eave), r1),
            ]
        }
        RoofType::Mono => vec![
            (at(0.0, short, top), at(long, short, top)),
            (at(0.0, short, eave), at(0.0, short, top)),
            (at(long, short, eave), at(long, short, top)),
            (at(0.0, 0.0, eave), at(0.0, short, top)),
            (at(long, 0.0, eave), at(long, short, top)),
        ],
    }
}
