//! Property-based tests for hit ordering and cycling.
//!
//! 1. Hit results never interleave domain groups: points, lines, areas.
//! 2. Hits never contain duplicates.
//! 3. Clicking the same list `k` times selects index `(k - 1) mod n`.

use netdiff_core::geometry::PixelPoint;
use netdiff_model::{Domain, FeatureKey, FeatureSet, Payload, Projector, classify};
use netdiff_render::hit_test::{DEFAULT_TOLERANCE, HitTester};
use netdiff_render::{Palette, Scene, SelectionCycler, Viewport};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

// ── Helpers ─────────────────────────────────────────────────────────────

fn scene(nodes: &[(f64, f64)], links: &[((f64, f64), (f64, f64))]) -> Scene {
    let nodes: Map<String, Value> = nodes
        .iter()
        .enumerate()
        .map(|(i, (x, y))| (format!("J{i}"), json!([x, y])))
        .collect();
    let links: Map<String, Value> = links
        .iter()
        .enumerate()
        .map(|(i, (a, b))| (format!("C{i}"), json!([[a.0, a.1], [b.0, b.1]])))
        .collect();
    let payload = Payload::from_value(json!({
        "geometry": {
            "nodes2": nodes,
            "links2": links,
            "subs2": {"S": [[0, 0], [10, 0], [10, 10], [0, 10]]}
        }
    }))
    .unwrap();
    let set = FeatureSet::build(&payload, &classify(&payload), &Projector::identity());
    Scene::render(set, Palette::DEFAULT)
}

fn coord() -> impl Strategy<Value = (f64, f64)> {
    (0.0..10.0f64, 0.0..10.0f64)
}

fn group(domain: Domain) -> u8 {
    match domain {
        Domain::Point => 0,
        Domain::Line => 1,
        Domain::Area => 2,
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Group order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn groups_never_interleave(
        nodes in prop::collection::vec(coord(), 0..20),
        links in prop::collection::vec((coord(), coord()), 0..10),
        probe in (0.0..800.0f64, 0.0..600.0f64),
    ) {
        let s = scene(&nodes, &links);
        let mut vp = Viewport::new(800.0, 600.0);
        vp.fit(&s.bounds(), 20.0);
        let tester = HitTester::build(&s, &vp, DEFAULT_TOLERANCE);
        let hits = tester.hit_test(PixelPoint::new(probe.0, probe.1));

        let groups: Vec<u8> = hits
            .iter()
            .map(|k| group(s.feature(*k).unwrap().domain))
            .collect();
        prop_assert!(groups.windows(2).all(|w| w[0] <= w[1]), "{:?}", groups);

        let mut dedup = hits.clone();
        dedup.sort();
        dedup.dedup();
        prop_assert_eq!(dedup.len(), hits.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Cycling
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn repeated_clicks_walk_the_list(n in 1usize..8, clicks in 1usize..20) {
        let nodes: Vec<(f64, f64)> = (0..n).map(|_| (5.0, 5.0)).collect();
        let s = scene(&nodes, &[]);
        let keys: Vec<FeatureKey> = s.traverse(Domain::Point).collect();
        let mut cycler = SelectionCycler::new();
        let at = PixelPoint::new(1.0, 1.0);
        let mut last = None;
        for _ in 0..clicks {
            last = cycler.select(at, keys.clone(), true);
        }
        prop_assert_eq!(last, Some(keys[(clicks - 1) % n]));
    }
}
