#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Three coordinate spaces show up across netdiff:
//!
//! | Space   | Type           | Units                                  |
//! |---------|----------------|----------------------------------------|
//! | Model   | [`ModelPoint`] | Projected CRS units (usually feet)     |
//! | Display | [`LatLon`]     | Geographic degrees                     |
//! | Device  | [`PixelPoint`] | Screen pixels, origin at top-left      |
//!
//! [`Bounds`] is a geographic bounding box; [`PixelRect`] is its device-space
//! counterpart used by hit testing.

/// A coordinate pair in model space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelPoint {
    pub x: f64,
    pub y: f64,
}

impl ModelPoint {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A geographic display coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// A point in device-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance_to(&self, other: PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear interpolation towards `other` (`t = 0` is `self`).
    #[inline]
    pub fn lerp(&self, other: PixelPoint, t: f64) -> PixelPoint {
        PixelPoint::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Closest point to `p` on segment `a`–`b`.
///
/// Returns the point and its parameter `t ∈ [0, 1]` along the segment.
/// Degenerate segments (`a == b`) return `a` with `t = 0`.
pub fn closest_point_on_segment(p: PixelPoint, a: PixelPoint, b: PixelPoint) -> (PixelPoint, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return (a, 0.0);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    (a.lerp(b, t), t)
}

/// A geographic bounding box.
///
/// The default value is *empty* (inverted infinities) so that extending it
/// with the first coordinate yields a zero-area box around that coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds {
    /// A box containing nothing.
    pub const EMPTY: Self = Self {
        south: f64::INFINITY,
        west: f64::INFINITY,
        north: f64::NEG_INFINITY,
        east: f64::NEG_INFINITY,
    };

    /// Create a box from its edges.
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Smallest box containing every coordinate in `coords`.
    pub fn from_coords<'a>(coords: impl IntoIterator<Item = &'a LatLon>) -> Self {
        let mut bounds = Self::EMPTY;
        for c in coords {
            bounds.extend(*c);
        }
        bounds
    }

    /// True when no coordinate has been added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.south > self.north || self.west > self.east
    }

    /// Grow the box to include `c`. Non-finite coordinates are ignored.
    pub fn extend(&mut self, c: LatLon) {
        if !c.is_finite() {
            return;
        }
        self.south = self.south.min(c.lat);
        self.north = self.north.max(c.lat);
        self.west = self.west.min(c.lon);
        self.east = self.east.max(c.lon);
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Bounds {
            south: self.south.min(other.south),
            west: self.west.min(other.west),
            north: self.north.max(other.north),
            east: self.east.max(other.east),
        }
    }

    /// Inclusive containment test.
    #[inline]
    pub fn contains(&self, c: LatLon) -> bool {
        c.lat >= self.south && c.lat <= self.north && c.lon >= self.west && c.lon <= self.east
    }

    /// Inclusive overlap test.
    pub fn intersects(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.south <= other.north
            && other.south <= self.north
            && self.west <= other.east
            && other.west <= self.east
    }

    /// Center of the box, or `None` when empty.
    pub fn center(&self) -> Option<LatLon> {
        if self.is_empty() {
            return None;
        }
        Some(LatLon::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        ))
    }

    /// Grow each side by `ratio` of the box's span.
    pub fn pad(&self, ratio: f64) -> Bounds {
        if self.is_empty() {
            return *self;
        }
        let dlat = (self.north - self.south) * ratio;
        let dlon = (self.east - self.west) * ratio;
        Bounds {
            south: self.south - dlat,
            west: self.west - dlon,
            north: self.north + dlat,
            east: self.east + dlon,
        }
    }
}

/// An axis-aligned rectangle in device pixels (inclusive edges).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PixelRect {
    /// A rectangle containing nothing.
    pub const EMPTY: Self = Self {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Rectangle from origin and size.
    pub const fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Smallest rectangle containing every point.
    pub fn from_points(points: impl IntoIterator<Item = PixelPoint>) -> Self {
        let mut rect = Self::EMPTY;
        for p in points {
            rect.min_x = rect.min_x.min(p.x);
            rect.min_y = rect.min_y.min(p.y);
            rect.max_x = rect.max_x.max(p.x);
            rect.max_y = rect.max_y.max(p.y);
        }
        rect
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    #[inline]
    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    /// Grow every edge outward by `margin` pixels.
    pub fn expand(&self, margin: f64) -> PixelRect {
        if self.is_empty() {
            return *self;
        }
        PixelRect::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    #[inline]
    pub fn contains(&self, p: PixelPoint) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn intersects(&self, other: &PixelRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_projection_interior() {
        let (p, t) = closest_point_on_segment(
            PixelPoint::new(5.0, 3.0),
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(10.0, 0.0),
        );
        assert_eq!(p, PixelPoint::new(5.0, 0.0));
        assert!((t - 0.5).abs() < 1e-12);
    }

    #[test]
    fn segment_projection_clamps_to_endpoints() {
        let a = PixelPoint::new(0.0, 0.0);
        let b = PixelPoint::new(10.0, 0.0);
        let (p, t) = closest_point_on_segment(PixelPoint::new(-4.0, 1.0), a, b);
        assert_eq!(p, a);
        assert_eq!(t, 0.0);
        let (p, t) = closest_point_on_segment(PixelPoint::new(14.0, 1.0), a, b);
        assert_eq!(p, b);
        assert_eq!(t, 1.0);
    }

    #[test]
    fn degenerate_segment_returns_start() {
        let a = PixelPoint::new(3.0, 3.0);
        let (p, t) = closest_point_on_segment(PixelPoint::new(9.0, 9.0), a, a);
        assert_eq!(p, a);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn empty_bounds_extend_once() {
        let mut b = Bounds::default();
        assert!(b.is_empty());
        b.extend(LatLon::new(39.0, -82.0));
        assert!(!b.is_empty());
        assert_eq!(b.center(), Some(LatLon::new(39.0, -82.0)));
    }

    #[test]
    fn bounds_ignore_non_finite() {
        let mut b = Bounds::default();
        b.extend(LatLon::new(f64::NAN, 1.0));
        assert!(b.is_empty());
    }

    #[test]
    fn bounds_union_with_empty_is_identity() {
        let b = Bounds::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(b.union(&Bounds::EMPTY), b);
        assert_eq!(Bounds::EMPTY.union(&b), b);
    }

    #[test]
    fn bounds_pad_grows_each_side() {
        let b = Bounds::new(0.0, 0.0, 10.0, 20.0).pad(0.1);
        assert_eq!(b, Bounds::new(-1.0, -2.0, 11.0, 22.0));
    }

    #[test]
    fn pixel_rect_expand_and_contains() {
        let r = PixelRect::from_points([PixelPoint::new(10.0, 10.0), PixelPoint::new(20.0, 15.0)]);
        assert!(!r.contains(PixelPoint::new(8.0, 12.0)));
        assert!(r.expand(3.0).contains(PixelPoint::new(8.0, 12.0)));
    }

    #[test]
    fn empty_pixel_rect_never_intersects() {
        let r = PixelRect::from_size(100.0, 100.0);
        assert!(!PixelRect::EMPTY.intersects(&r));
        assert!(!r.intersects(&PixelRect::EMPTY));
    }
}
