//! Minimal SVG writer for control drawings.
//!
//! Coordinates are formatted with two decimals so identical geometry always
//! yields byte-identical documents.

pub(crate) const INK: &str = "#000000";
const PAPER: &str = "#ffffff";
const MARGIN_PX: f64 = 48.0;

/// Maps world coordinates (meters, `y` up) onto the canvas (pixels, `y` down).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Viewport {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    canvas_height: f64,
}

impl Viewport {
    /// Fit the world box `[min_x, max_x] x [min_y, max_y]` centered on the canvas.
    pub fn fit(canvas: (u32, u32), min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let (cw, ch) = (canvas.0 as f64, canvas.1 as f64);
        let span_x = (max_x - min_x).max(1e-6);
        let span_y = (max_y - min_y).max(1e-6);
        let scale = ((cw - 2.0 * MARGIN_PX) / span_x).min((ch - 2.0 * MARGIN_PX) / span_y);
        let offset_x = (cw - span_x * scale) / 2.0 - min_x * scale;
        let offset_y = (ch - span_y * scale) / 2.0 - min_y * scale;
        Self { scale, offset_x, offset_y, canvas_height: ch }
    }

    pub fn px(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.offset_x + x * self.scale,
            self.canvas_height - (self.offset_y + y * self.scale),
        )
    }

    pub fn len(&self, meters: f64) -> f64 {
        meters * self.scale
    }
}

pub(crate) struct SvgCanvas {
    width: u32,
    height: u32,
    body: String,
}

impl SvgCanvas {
    pub fn new((width, height): (u32, u32)) -> Self {
        let mut canvas = Self { width, height, body: String::new() };
        canvas.body.push_str(&format!(
            r#"<rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
            width, height, PAPER
        ));
        canvas
    }

    pub fn line(&mut self, a: (f64, f64), b: (f64, f64), stroke_px: f64) {
        self.body.push_str(&format!(
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{:.2}"/>"#,
            a.0, a.1, b.0, b.1, INK, stroke_px
        ));
    }

    pub fn dashed(&mut self, a: (f64, f64), b: (f64, f64), stroke_px: f64) {
        self.body.push_str(&format!(
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{:.2}" stroke-dasharray="8 6"/>"#,
            a.0, a.1, b.0, b.1, INK, stroke_px
        ));
    }

    /// Axis-aligned box given two opposite pixel corners.
    pub fn rect(&mut self, a: (f64, f64), b: (f64, f64), stroke_px: f64, fill: Option<&str>) {
        let (x, y) = (a.0.min(b.0), a.1.min(b.1));
        let (w, h) = ((a.0 - b.0).abs(), (a.1 - b.1).abs());
        self.body.push_str(&format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="{}" stroke-width="{:.2}"/>"#,
            x,
            y,
            w,
            h,
            fill.unwrap_or("none"),
            INK,
            stroke_px
        ));
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], closed: bool, stroke_px: f64) {
        if points.len() < 2 {
            return;
        }
        let coords: Vec<String> = points.iter().map(|(x, y)| format!("{:.2},{:.2}", x, y)).collect();
        let tag = if closed { "polygon" } else { "polyline" };
        self.body.push_str(&format!(
            r#"<{} points="{}" fill="none" stroke="{}" stroke-width="{:.2}" stroke-linejoin="round"/>"#,
            tag,
            coords.join(" "),
            INK,
            stroke_px
        ));
    }

    /// Quarter-circle door swing from `hinge` with `radius_px`.
    pub fn arc(&mut self, from: (f64, f64), to: (f64, f64), radius_px: f64) {
        self.body.push_str(&format!(
            r#"<path d="M {:.2} {:.2} A {:.2} {:.2} 0 0 1 {:.2} {:.2}" fill="none" stroke="{}" stroke-width="1.00"/>"#,
            from.0, from.1, radius_px, radius_px, to.0, to.1, INK
        ));
    }

    pub fn text(&mut self, at: (f64, f64), size_px: f64, content: &str) {
        self.body.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="monospace" font-size="{:.1}" text-anchor="middle" fill="{}">{}</text>"#,
            at.0,
            at.1,
            size_px,
            INK,
            escape(content)
        ));
    }

    pub fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{body}</svg>"#,
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_flips_y_and_centers() {
        let vp = Viewport::fit((200, 200), 0.0, 0.0, 10.0, 10.0);
        let (x0, y0) = vp.px(0.0, 0.0);
        let (x1, y1) = vp.px(10.0, 10.0);
        assert!((x0 - 48.0).abs() < 1e-9);
        assert!((y0 - 152.0).abs() < 1e-9);
        assert!((x1 - 152.0).abs() < 1e-9);
        assert!((y1 - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_is_escaped() {
        let mut c = SvgCanvas::new((10, 10));
        c.text((1.0, 1.0), 8.0, "Bath & <WC>");
        let svg = c.finish();
        assert!(svg.contains("Bath &amp; &lt;WC&gt;"));
        assert!(svg.starts_with("<svg"));
    }
}
