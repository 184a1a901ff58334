#![forbid(unsafe_code)]

//! Web-mercator camera.
//!
//! Maps geographic coordinates to device pixels for a camera described by
//! a center, a fractional zoom level, and the surface size. At zoom `z`
//! the world is `256 · 2^z` pixels wide.

use std::f64::consts::PI;

use netdiff_core::geometry::{Bounds, LatLon, PixelPoint};

/// Pixel width of the world at zoom 0.
pub const TILE_SIZE: f64 = 256.0;
/// Latitude limit of the mercator square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;
/// Zoom used when fitting a single coordinate.
pub const POINT_FIT_ZOOM: f64 = 19.0;

/// Camera state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    center: LatLon,
    zoom: f64,
    width: f64,
    height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// World-pixel coordinates at zoom `zoom`.
fn world(c: LatLon, zoom: f64) -> (f64, f64) {
    let scale = TILE_SIZE * zoom.exp2();
    let lat = c.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (c.lon + 180.0) / 360.0 * scale;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale;
    (x, y)
}

fn unworld(x: f64, y: f64, zoom: f64) -> LatLon {
    let scale = TILE_SIZE * zoom.exp2();
    let lon = x / scale * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / scale);
    let lat = n.sinh().atan().to_degrees();
    LatLon::new(lat, lon)
}

impl Viewport {
    /// Camera over the whole world for a `width × height` surface.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            center: LatLon::default(),
            zoom: MIN_ZOOM,
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    #[must_use]
    pub fn with_center(mut self, center: LatLon, zoom: f64) -> Self {
        self.center = center;
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self
    }

    pub fn center(&self) -> LatLon {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Geographic → device pixels.
    pub fn to_pixel(&self, c: LatLon) -> PixelPoint {
        let (cx, cy) = world(self.center, self.zoom);
        let (x, y) = world(c, self.zoom);
        PixelPoint::new(x - cx + self.width / 2.0, y - cy + self.height / 2.0)
    }

    /// Device pixels → geographic.
    pub fn to_latlon(&self, p: PixelPoint) -> LatLon {
        let (cx, cy) = world(self.center, self.zoom);
        unworld(
            cx + p.x - self.width / 2.0,
            cy + p.y - self.height / 2.0,
            self.zoom,
        )
    }

    /// Geographic extent of the surface.
    pub fn visible_bounds(&self) -> Bounds {
        let nw = self.to_latlon(PixelPoint::new(0.0, 0.0));
        let se = self.to_latlon(PixelPoint::new(self.width, self.height));
        Bounds::new(se.lat, nw.lon, nw.lat, se.lon)
    }

    /// Center `bounds` and pick the largest zoom that fits it inside the
    /// surface minus `padding` pixels on each side. Empty bounds leave the
    /// camera untouched.
    pub fn fit(&mut self, bounds: &Bounds, padding: f64) {
        self.fit_capped(bounds, padding, POINT_FIT_ZOOM);
    }

    /// [`fit`](Self::fit) with an explicit zoom cap.
    pub fn fit_capped(&mut self, bounds: &Bounds, padding: f64, max_zoom: f64) {
        if bounds.is_empty() {
            return;
        }
        let (x0, y0) = world(LatLon::new(bounds.north, bounds.west), MIN_ZOOM);
        let (x1, y1) = world(LatLon::new(bounds.south, bounds.east), MIN_ZOOM);
        let span_x = (x1 - x0).abs();
        let span_y = (y1 - y0).abs();
        let avail_w = (self.width - 2.0 * padding).max(1.0);
        let avail_h = (self.height - 2.0 * padding).max(1.0);

        // Use the tighter axis.
        let zoom_x = if span_x > 0.0 { (avail_w / span_x).log2() } else { f64::INFINITY };
        let zoom_y = if span_y > 0.0 { (avail_h / span_y).log2() } else { f64::INFINITY };
        let zoom = zoom_x.min(zoom_y).min(max_zoom).clamp(MIN_ZOOM, MAX_ZOOM);

        self.zoom = zoom;
        self.center = unworld((x0 + x1) / 2.0, (y0 + y1) / 2.0, MIN_ZOOM);
    }

    /// Zoom onto `bounds` without zooming out past `min_zoom`.
    pub fn fly_to(&mut self, bounds: &Bounds, padding: f64, min_zoom: f64) {
        self.fit(bounds, padding);
        if self.zoom < min_zoom {
            self.zoom = min_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Move the camera by a pixel delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.center = self.to_latlon(PixelPoint::new(
            self.width / 2.0 + dx,
            self.height / 2.0 + dy,
        ));
    }

    /// Set the zoom level, keeping the coordinate under `anchor` fixed.
    pub fn zoom_to(&mut self, zoom: f64, anchor: PixelPoint) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let fixed = self.to_latlon(anchor);
        self.zoom = zoom;
        // Re-center so that `fixed` lands back on `anchor`.
        let (fx, fy) = world(fixed, zoom);
        self.center = unworld(
            fx - (anchor.x - self.width / 2.0),
            fy - (anchor.y - self.height / 2.0),
            zoom,
        );
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }
}
