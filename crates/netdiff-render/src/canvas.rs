#![forbid(unsafe_code)]

//! Braille raster preview of a scene.
//!
//! Each text cell maps to a 2 × 4 grid of sub-pixels rendered with the
//! Unicode Braille block (U+2800..U+28FF). [`Painter`] accumulates dots and
//! their colors; [`paint_scene`] draws a [`Scene`] through a [`Viewport`]
//! sized in sub-pixels.
//!
//! ```
//! use netdiff_render::canvas::Painter;
//!
//! let mut painter = Painter::for_cells(4, 2);
//! painter.line(0, 0, 7, 7, None);
//! assert_eq!(painter.to_text().lines().count(), 2);
//! ```

use std::fmt::Write as _;

use netdiff_core::geometry::{LatLon, PixelPoint};
use netdiff_model::Geometry;
use tracing::debug_span;

use crate::scene::Scene;
use crate::style::{Rgba, Shape};
use crate::viewport::Viewport;

/// Sub-pixel columns per text cell.
pub const DOTS_PER_COL: u16 = 2;
/// Sub-pixel rows per text cell.
pub const DOTS_PER_ROW: u16 = 4;
/// Marker radius in sub-pixels.
pub const MARKER_RADIUS: i32 = 2;
/// Sub-pixels beyond the grid edge that segments are clipped to.
pub const CLIP_MARGIN: f64 = 8.0;

/// Dot grid with optional per-dot color.
#[derive(Debug, Clone)]
pub struct Painter {
    width: u16,
    height: u16,
    dots: Vec<bool>,
    colors: Vec<Option<Rgba>>,
}

impl Painter {
    /// Painter with the given sub-pixel dimensions.
    pub fn new(width: u16, height: u16) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            dots: vec![false; len],
            colors: vec![None; len],
        }
    }

    /// Painter covering `cols × rows` text cells.
    pub fn for_cells(cols: u16, rows: u16) -> Self {
        Self::new(
            cols.saturating_mul(DOTS_PER_COL),
            rows.saturating_mul(DOTS_PER_ROW),
        )
    }

    pub fn clear(&mut self) {
        self.dots.fill(false);
        self.colors.fill(None);
    }

    /// Sub-pixel dimensions.
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Text-cell dimensions.
    pub fn cell_size(&self) -> (u16, u16) {
        (
            self.width.div_ceil(DOTS_PER_COL),
            self.height.div_ceil(DOTS_PER_ROW),
        )
    }

    pub fn point(&mut self, x: i32, y: i32, color: Option<Rgba>) {
        if let Some(idx) = self.index(x, y) {
            self.dots[idx] = true;
            if color.is_some() {
                self.colors[idx] = color;
            }
        }
    }

    pub fn get(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|i| self.dots[i])
    }

    pub fn color_at(&self, x: i32, y: i32) -> Option<Rgba> {
        self.index(x, y).and_then(|i| self.colors[i])
    }

    /// Straight line between integer sub-pixels.
    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Option<Rgba>) {
        self.segment(
            PixelPoint::new(x0 as f64, y0 as f64),
            PixelPoint::new(x1 as f64, y1 as f64),
            color,
        );
    }

    /// Straight line between fractional sub-pixels, clipped to the grid.
    pub fn segment(&mut self, a: PixelPoint, b: PixelPoint, color: Option<Rgba>) {
        if let Some((a, b)) = self.clip(a, b) {
            let (x0, y0) = dot(a);
            let (x1, y1) = dot(b);
            self.bresenham(x0, y0, x1, y1, color);
        }
    }

    /// Liang-Barsky clip against the grid grown by [`CLIP_MARGIN`].
    fn clip(&self, a: PixelPoint, b: PixelPoint) -> Option<(PixelPoint, PixelPoint)> {
        if ![a.x, a.y, b.x, b.y].iter().all(|v| v.is_finite()) {
            return None;
        }
        let (min_x, min_y) = (-CLIP_MARGIN, -CLIP_MARGIN);
        let max_x = self.width as f64 + CLIP_MARGIN;
        let max_y = self.height as f64 + CLIP_MARGIN;
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
        for (p, q) in [
            (-dx, a.x - min_x),
            (dx, max_x - a.x),
            (-dy, a.y - min_y),
            (dy, max_y - a.y),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
        Some((a.lerp(b, t0), a.lerp(b, t1)))
    }

    /// Whether `p` lies on the grid grown by [`CLIP_MARGIN`].
    fn near(&self, p: PixelPoint) -> bool {
        p.x >= -CLIP_MARGIN
            && p.y >= -CLIP_MARGIN
            && p.x <= self.width as f64 + CLIP_MARGIN
            && p.y <= self.height as f64 + CLIP_MARGIN
    }

    fn bresenham(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Option<Rgba>) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx: i32 = if x0 < x1 { 1 } else { -1 };
        let sy: i32 = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut cx, mut cy) = (x0, y0);

        loop {
            self.point(cx, cy, color);
            if cx == x1 && cy == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                if cx == x1 {
                    break;
                }
                err += dy;
                cx += sx;
            }
            if e2 <= dx {
                if cy == y1 {
                    break;
                }
                err += dx;
                cy += sy;
            }
        }
    }

    /// Midpoint circle outline.
    pub fn circle(&mut self, cx: i32, cy: i32, radius: i32, color: Option<Rgba>) {
        if radius <= 0 {
            self.point(cx, cy, color);
            return;
        }
        let (mut x, mut y, mut d) = (radius, 0, 1 - radius);
        while x >= y {
            for (ox, oy) in [(x, y), (y, x)] {
                self.point(cx + ox, cy + oy, color);
                self.point(cx - ox, cy + oy, color);
                self.point(cx + ox, cy - oy, color);
                self.point(cx - ox, cy - oy, color);
            }
            y += 1;
            if d < 0 {
                d += 2 * y + 1;
            } else {
                x -= 1;
                d += 2 * (y - x) + 1;
            }
        }
    }

    /// Closed outline through `vertices`.
    pub fn outline(&mut self, vertices: &[PixelPoint], color: Option<Rgba>) {
        let Some(&last) = vertices.last() else {
            return;
        };
        let mut prev = last;
        for &v in vertices {
            self.segment(prev, v, color);
            prev = v;
        }
    }

    /// Open polyline through `vertices`.
    pub fn polyline(&mut self, vertices: &[PixelPoint], color: Option<Rgba>) {
        if let [only] = vertices {
            self.segment(*only, *only, color);
        }
        for seg in vertices.windows(2) {
            self.segment(seg[0], seg[1], color);
        }
    }

    /// Point marker of `shape` centered on `(x, y)`.
    pub fn marker(&mut self, shape: Shape, x: i32, y: i32, color: Option<Rgba>) {
        let center = PixelPoint::new(x as f64, y as f64);
        if !self.near(center) {
            return;
        }
        let r = MARKER_RADIUS;
        let px = |dx: i32, dy: i32| PixelPoint::new((x + dx) as f64, (y + dy) as f64);
        match shape {
            Shape::Square => {
                self.outline(&[px(-r, -r), px(r, -r), px(r, r), px(-r, r)], color)
            }
            Shape::TriangleUp => self.outline(&[px(0, -r), px(r, r), px(-r, r)], color),
            Shape::Diamond => self.outline(&[px(0, -r), px(r, 0), px(0, r), px(-r, 0)], color),
            Shape::Circle | Shape::Polyline | Shape::Polygon => self.circle(x, y, r, color),
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Braille character and first dot color of the cell whose top-left
    /// sub-pixel is `(px, py)`.
    fn braille_cell(&self, px: i32, py: i32) -> (char, Option<Rgba>) {
        // Dots 1-2-3-7 down the left column, 4-5-6-8 down the right.
        const DOT_BITS: [[u8; 4]; 2] = [[0, 1, 2, 6], [3, 4, 5, 7]];

        let mut bits: u8 = 0;
        let mut color = None;
        for (col, column_bits) in DOT_BITS.iter().enumerate() {
            for (row, bit) in column_bits.iter().enumerate() {
                let (x, y) = (px + col as i32, py + row as i32);
                if self.get(x, y) {
                    bits |= 1 << *bit;
                    if color.is_none() {
                        color = self.color_at(x, y);
                    }
                }
            }
        }
        if bits == 0 {
            (' ', None)
        } else {
            (char::from_u32(0x2800 + bits as u32).unwrap_or(' '), color)
        }
    }

    fn cells(&self) -> impl Iterator<Item = Vec<(char, Option<Rgba>)>> + '_ {
        let (cols, rows) = self.cell_size();
        (0..rows as i32).map(move |cy| {
            (0..cols as i32)
                .map(|cx| {
                    self.braille_cell(cx * DOTS_PER_COL as i32, cy * DOTS_PER_ROW as i32)
                })
                .collect()
        })
    }

    /// Plain text, one line per cell row.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for row in self.cells() {
            out.extend(row.into_iter().map(|(ch, _)| ch));
            out.push('\n');
        }
        out
    }

    /// Text with 24-bit ANSI foreground colors. Alpha is composited over
    /// black.
    pub fn to_ansi(&self) -> String {
        let mut out = String::new();
        for row in self.cells() {
            let mut active: Option<Rgba> = None;
            for (ch, color) in row {
                if ch != ' ' && color != active {
                    match color {
                        Some(c) => {
                            let (r, g, b) = over_black(c);
                            let _ = write!(out, "\x1b[38;2;{r};{g};{b}m");
                        }
                        None => out.push_str("\x1b[39m"),
                    }
                    active = color;
                }
                out.push(ch);
            }
            if active.is_some() {
                out.push_str("\x1b[39m");
            }
            out.push('\n');
        }
        out
    }
}

fn over_black(c: Rgba) -> (u8, u8, u8) {
    let a = c.a() as u32;
    let f = |v: u8| ((v as u32 * a + 127) / 255) as u8;
    (f(c.r()), f(c.g()), f(c.b()))
}

fn dot(p: PixelPoint) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

fn pixels(viewport: &Viewport, coords: &[LatLon]) -> Vec<PixelPoint> {
    coords.iter().map(|c| viewport.to_pixel(*c)).collect()
}

fn paint_geometry(
    painter: &mut Painter,
    viewport: &Viewport,
    geometry: &Geometry,
    shape: Shape,
    color: Rgba,
) {
    match geometry {
        Geometry::Point(c) => {
            let p = viewport.to_pixel(*c);
            if painter.near(p) {
                let (x, y) = dot(p);
                painter.marker(shape, x, y, Some(color));
            }
        }
        Geometry::Line(parts) => {
            for part in parts {
                painter.polyline(&pixels(viewport, part), Some(color));
            }
        }
        Geometry::Area(rings) => {
            for ring in rings {
                painter.outline(&pixels(viewport, ring), Some(color));
            }
        }
    }
}

/// Draw every visible sub-layer in paint order, then the selection overlay.
///
/// `viewport` must be sized in sub-pixels of `painter`.
pub fn paint_scene(painter: &mut Painter, scene: &Scene, viewport: &Viewport) {
    let _span = debug_span!("paint_scene", features = scene.features().len()).entered();
    for (domain, sublayer) in scene.draw_order() {
        if !scene.layer(domain).visible || !sublayer.visible {
            continue;
        }
        let color = sublayer.style.color.with_opacity(sublayer.style.opacity);
        for &key in sublayer.keys() {
            if let Some(feature) = scene.feature(key) {
                let shape = Shape::for_feature(feature.domain, feature.subtype);
                paint_geometry(painter, viewport, &feature.geometry, shape, color);
            }
        }
    }
    if let Some(overlay) = scene.overlay() {
        paint_geometry(painter, viewport, &overlay.geometry, overlay.shape, overlay.color);
    }
}

/// Viewport covering `painter`, fitted to the scene's bounds.
pub fn fitted_viewport(painter: &Painter, scene: &Scene, padding: f64) -> Viewport {
    let (w, h) = painter.size();
    let mut viewport = Viewport::new(w as f64, h as f64);
    viewport.fit(&scene.bounds(), padding);
    viewport
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Palette;
    use netdiff_model::{FeatureSet, Payload, Projector, classify};
    use serde_json::json;

    #[test]
    fn empty_painter_is_blank() {
        let p = Painter::for_cells(3, 2);
        assert_eq!(p.cell_size(), (3, 2));
        assert_eq!(p.to_text(), "   \n   \n");
    }

    #[test]
    fn single_dot_maps_to_braille_bit() {
        let mut p = Painter::for_cells(1, 1);
        p.point(0, 0, None);
        assert_eq!(p.to_text(), "\u{2801}\n");
        p.clear();
        p.point(1, 3, None);
        assert_eq!(p.to_text(), "\u{2880}\n");
    }

    #[test]
    fn full_cell() {
        let mut p = Painter::for_cells(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                p.point(x, y, None);
            }
        }
        assert_eq!(p.to_text(), "\u{28ff}\n");
    }

    #[test]
    fn line_endpoints_set() {
        let mut p = Painter::new(20, 20);
        p.line(1, 2, 15, 9, None);
        assert!(p.get(1, 2));
        assert!(p.get(15, 9));
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut p = Painter::new(4, 4);
        p.point(-1, 0, None);
        p.point(4, 4, None);
        assert!(!p.get(-1, 0));
        assert_eq!(p.to_text().trim(), "");
    }

    #[test]
    fn far_off_segments_are_clipped() {
        let mut p = Painter::new(20, 10);
        p.segment(PixelPoint::new(-1e15, 5.0), PixelPoint::new(1e15, 5.0), None);
        assert!((0..20).all(|x| p.get(x, 5)));

        p.clear();
        p.line(i32::MIN, 0, i32::MAX, 0, None);
        assert!(p.get(0, 0) && p.get(19, 0));

        p.clear();
        p.segment(PixelPoint::new(-50.0, -50.0), PixelPoint::new(-40.0, 100.0), None);
        p.segment(PixelPoint::new(f64::NAN, 0.0), PixelPoint::new(5.0, 5.0), None);
        p.marker(Shape::Square, i32::MAX, 0, None);
        assert_eq!(p.to_text().trim(), "");
    }

    #[test]
    fn huge_model_extent_previews_without_panicking() {
        let payload = Payload::from_value(json!({
            "geometry": {
                "nodes2": {"N": [0, 0]},
                "links2": {"C": [[0, 0], [1e12, 0]]}
            }
        }))
        .unwrap();
        let set = FeatureSet::build(&payload, &classify(&payload), &Projector::identity());
        let scene = Scene::render(set, Palette::DEFAULT);
        let mut painter = Painter::for_cells(20, 10);
        let viewport = fitted_viewport(&painter, &scene, 4.0);
        paint_scene(&mut painter, &scene, &viewport);
        assert_eq!(painter.to_text().lines().count(), 10);
    }

    #[test]
    fn circle_is_symmetric() {
        let mut p = Painter::new(20, 20);
        p.circle(10, 10, 3, None);
        for (x, y) in [(13, 10), (7, 10), (10, 13), (10, 7)] {
            assert!(p.get(x, y), "({x}, {y})");
        }
        assert!(!p.get(10, 10));
    }

    #[test]
    fn ansi_carries_color() {
        let mut p = Painter::for_cells(1, 1);
        p.point(0, 0, Some(Rgba::rgb(46, 204, 113)));
        assert_eq!(p.to_ansi(), "\x1b[38;2;46;204;113m\u{2801}\x1b[39m\n");
    }

    #[test]
    fn scene_preview_draws_status_colors() {
        let payload = Payload::from_value(json!({
            "geometry": {
                "nodes2": {"N": [0, 0], "M": [10, 10]},
                "links2": {"L": [[0, 0], [10, 10]]}
            },
            "diffs": {"JUNCTIONS": {"added": {"N": []}}}
        }))
        .unwrap();
        let set = FeatureSet::build(&payload, &classify(&payload), &Projector::identity());
        let scene = Scene::render(set, Palette::DEFAULT);
        let mut painter = Painter::for_cells(20, 10);
        let viewport = fitted_viewport(&painter, &scene, 4.0);
        paint_scene(&mut painter, &scene, &viewport);

        let (x, y) = dot(viewport.to_pixel(LatLon::new(0.0, 0.0)));
        // Marker ring around the added node, drawn over the line.
        assert_eq!(
            painter.color_at(x + MARKER_RADIUS, y),
            Some(Palette::DEFAULT.added)
        );
        assert!(!painter.to_text().trim().is_empty());
    }
}
