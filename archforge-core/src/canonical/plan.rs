//! Top-down floor plan: walls, openings and room labels.

use super::svg::{SvgCanvas, Viewport};
use crate::geometry::{BuildingModel, Floor, Opening, OpeningKind};

const EXTERIOR_STROKE_PX: f64 = 6.0;
const INTERIOR_STROKE_PX: f64 = 2.5;
const WALL_THICKNESS_M: f64 = 0.3;

pub(crate) fn render(model: &BuildingModel, floor: &Floor, canvas: (u32, u32)) -> String {
    let env = model.envelope;
    let vp = Viewport::fit(canvas, -1.0, -1.0, env.width_m + 1.0, env.depth_m + 1.0);
    let mut svg = SvgCanvas::new(canvas);

    for wall in &floor.walls {
        let stroke = if wall.exterior { EXTERIOR_STROKE_PX } else { INTERIOR_STROKE_PX };
        let a = vp.px(wall.segment.start.x, wall.segment.start.y);
        let b = vp.px(wall.segment.end.x, wall.segment.end.y);
        svg.line(a, b, stroke);
    }

    for opening in &floor.openings {
        draw_opening(&mut svg, &vp, opening);
    }

    let label_px = (vp.len(0.35)).clamp(10.0, 22.0);
    for room in &floor.rooms {
        let c = room.rect.center();
        let (x, y) = vp.px(c.x, c.y);
        svg.text((x, y), label_px, &room.name);
        svg.text((x, y + label_px * 1.2), label_px * 0.8, &format!("{:.1} m2", room.realized_area_m2()));
    }

    // North arrow in the top-right margin.
    let (nx, ny) = vp.px(env.width_m + 0.5, env.depth_m + 0.5);
    svg.line((nx, ny + 18.0), (nx, ny - 6.0), 2.0);
    svg.text((nx, ny - 10.0), 14.0, "N");

    svg.finish()
}

fn draw_opening(svg: &mut SvgCanvas, vp: &Viewport, opening: &Opening) {
    let half = opening.width_m / 2.0;
    let t = WALL_THICKNESS_M / 2.0;
    let c = opening.center;
    let (a, b) = if opening.horizontal {
        (vp.px(c.x - half, c.y - t), vp.px(c.x + half, c.y + t))
    } else {
        (vp.px(c.x - t, c.y - half), vp.px(c.x + t, c.y + half))
    };

    match opening.kind {
        OpeningKind::Window => {
            svg.rect(a, b, 1.5, Some("#ffffff"));
            let (m1, m2) = if opening.horizontal {
                (vp.px(c.x - half, c.y), vp.px(c.x + half, c.y))
            } else {
                (vp.px(c.x, c.y - half), vp.px(c.x, c.y + half))
            };
            svg.line(m1, m2, 1.0);
        }
        OpeningKind::Door | OpeningKind::Entrance => {
            svg.rect(a, b, 0.0, Some("#ffffff"));
            let w = opening.width_m;
            let (hinge, leaf, tip) = if opening.horizontal {
                (
                    vp.px(c.x - half, c.y),
                    vp.px(c.x - half, c.y + w),
                    vp.px(c.x + half, c.y),
                )
            } else {
                (
                    vp.px(c.x, c.y - half),
                    vp.px(c.x + w, c.y - half),
                    vp.px(c.x, c.y + half),
                )
            };
            svg.line(hinge, leaf, 1.5);
            svg.arc(leaf, tip, vp.len(w));
        }
    }
}
