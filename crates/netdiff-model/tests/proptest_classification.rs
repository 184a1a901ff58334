//! Property-based tests for change classification.
//!
//! 1. The four sets of each domain are pairwise disjoint.
//! 2. Their union is every geometry ID with rename targets folded away.
//! 3. Rename sources with geometry are always changed.
//! 4. Classification is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use netdiff_model::{Domain, Payload, Status, classify};
use proptest::prelude::*;
use serde_json::{Value, json};

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Case {
    pre: BTreeSet<String>,
    post: BTreeSet<String>,
    added: BTreeSet<String>,
    removed: BTreeSet<String>,
    changed: BTreeSet<String>,
    renames: BTreeMap<String, String>,
}

fn id() -> impl Strategy<Value = String> {
    (0u8..24).prop_map(|n| format!("J{n}"))
}

fn ids() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(id(), 0..12)
}

fn case() -> impl Strategy<Value = Case> {
    (
        ids(),
        ids(),
        ids(),
        ids(),
        ids(),
        prop::collection::btree_map(id(), (24u8..30).prop_map(|n| format!("J{n}")), 0..3),
    )
        .prop_map(|(pre, post, added, removed, changed, renames)| Case {
            pre,
            post,
            added,
            removed,
            changed,
            renames,
        })
}

fn points(ids: &BTreeSet<String>) -> Value {
    ids.iter().map(|id| (id.clone(), json!([0.0, 0.0]))).collect::<serde_json::Map<_, _>>().into()
}

fn records(ids: &BTreeSet<String>) -> Value {
    ids.iter().map(|id| (id.clone(), json!([]))).collect::<serde_json::Map<_, _>>().into()
}

fn pairs(ids: &BTreeSet<String>) -> Value {
    ids.iter().map(|id| (id.clone(), json!([[], []]))).collect::<serde_json::Map<_, _>>().into()
}

fn payload(c: &Case) -> Payload {
    Payload::from_value(json!({
        "geometry": {"nodes1": points(&c.pre), "nodes2": points(&c.post)},
        "diffs": {"JUNCTIONS": {
            "added": records(&c.added),
            "removed": records(&c.removed),
            "changed": pairs(&c.changed)
        }},
        "renames": {"JUNCTIONS": c.renames}
    }))
    .unwrap()
}

/// Expected universe: geometry IDs with rename targets mapped to sources.
fn expected_universe(c: &Case) -> BTreeSet<String> {
    let back: BTreeMap<&String, &String> = c.renames.iter().map(|(o, n)| (n, o)).collect();
    c.pre
        .iter()
        .chain(c.post.iter())
        .map(|id| back.get(id).map_or(id.clone(), |o| (*o).clone()))
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Partition
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn sets_partition_the_universe(c in case()) {
        let classification = classify(&payload(&c));
        let sets = classification.sets(Domain::Point);

        let mut seen = BTreeSet::new();
        for status in Status::ALL {
            for id in sets.get(status) {
                prop_assert!(seen.insert(id.clone()), "{} in more than one set", id);
            }
        }
        prop_assert_eq!(seen, expected_universe(&c));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Rename folding
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn rename_sources_are_changed(c in case()) {
        let classification = classify(&payload(&c));
        let universe = expected_universe(&c);
        for (old, new) in &c.renames {
            if universe.contains(old) {
                prop_assert_eq!(classification.status_of(Domain::Point, old), Some(Status::Changed));
            }
            prop_assert_eq!(classification.status_of(Domain::Point, new), None);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn classification_is_deterministic(c in case()) {
        let p = payload(&c);
        prop_assert_eq!(classify(&p), classify(&p));
    }
}
