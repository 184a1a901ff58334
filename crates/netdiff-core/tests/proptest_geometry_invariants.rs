//! Property-based invariant tests for geometry primitives.
//!
//! 1. Segment projection parameter stays in [0, 1].
//! 2. The projected point is no farther than either endpoint.
//! 3. Bounds built from coordinates contain every coordinate.
//! 4. Bounds union is commutative and contains both inputs.
//! 5. Expanded pixel rects contain the original rect's corners.

use netdiff_core::geometry::{Bounds, LatLon, PixelPoint, PixelRect, closest_point_on_segment};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn pixel() -> impl Strategy<Value = PixelPoint> {
    (-2000.0f64..2000.0, -2000.0f64..2000.0).prop_map(|(x, y)| PixelPoint::new(x, y))
}

fn latlon() -> impl Strategy<Value = LatLon> {
    (-80.0f64..80.0, -179.0f64..179.0).prop_map(|(lat, lon)| LatLon::new(lat, lon))
}

fn bounds() -> impl Strategy<Value = Bounds> {
    prop::collection::vec(latlon(), 1..8).prop_map(|v| Bounds::from_coords(&v))
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Projection parameter range
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn segment_parameter_in_unit_range(p in pixel(), a in pixel(), b in pixel()) {
        let (_, t) = closest_point_on_segment(p, a, b);
        prop_assert!((0.0..=1.0).contains(&t), "t={} out of range", t);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Projection is the closest point
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn projection_not_farther_than_endpoints(p in pixel(), a in pixel(), b in pixel()) {
        let (q, _) = closest_point_on_segment(p, a, b);
        let d = p.distance_to(q);
        prop_assert!(d <= p.distance_to(a) + 1e-6);
        prop_assert!(d <= p.distance_to(b) + 1e-6);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Bounds contain their inputs
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn bounds_contain_inputs(coords in prop::collection::vec(latlon(), 1..16)) {
        let b = Bounds::from_coords(&coords);
        prop_assert!(!b.is_empty());
        for c in &coords {
            prop_assert!(b.contains(*c), "{:?} not in {:?}", c, b);
        }
        let center = b.center().unwrap();
        prop_assert!(b.contains(center));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Union
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn union_commutative_and_covering(a in bounds(), b in bounds()) {
        let u = a.union(&b);
        prop_assert_eq!(u, b.union(&a));
        prop_assert!(u.intersects(&a));
        prop_assert!(u.intersects(&b));
        prop_assert!(u.south <= a.south && u.north >= a.north);
        prop_assert!(u.west <= b.west && u.east >= b.east);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Expansion
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn expanded_rect_contains_corners(a in pixel(), b in pixel(), margin in 0.0f64..50.0) {
        let r = PixelRect::from_points([a, b]);
        let e = r.expand(margin);
        prop_assert!(e.contains(PixelPoint::new(r.min_x, r.min_y)));
        prop_assert!(e.contains(PixelPoint::new(r.max_x, r.max_y)));
        prop_assert!(e.width() >= r.width());
    }
}
