#![forbid(unsafe_code)]

//! Change classification.
//!
//! Every ID with geometry in either snapshot lands in exactly one of four
//! sets per domain. Renames are folded first: the new ID merges into the old
//! one, which is then always "changed". Conflicting claims from malformed
//! payloads resolve through [`Claims::resolve`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::payload::{FeatureId, Payload};
use crate::section::Domain;

/// Change status of a feature.
///
/// Declaration order is the default stacking inside a domain layer,
/// bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unchanged,
    Removed,
    Changed,
    Added,
}

impl Status {
    /// All statuses, bottom to top.
    pub const ALL: [Status; 4] = [
        Status::Unchanged,
        Status::Removed,
        Status::Changed,
        Status::Added,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Unchanged => "unchanged",
            Status::Removed => "removed",
            Status::Changed => "changed",
            Status::Added => "added",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which payload maps claim an ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Claims {
    pub added: bool,
    pub removed: bool,
    pub changed: bool,
}

impl Claims {
    /// changed > added/removed > unchanged; added together with removed is
    /// changed.
    pub const fn resolve(self) -> Status {
        match (self.changed, self.added, self.removed) {
            (true, _, _) | (false, true, true) => Status::Changed,
            (false, true, false) => Status::Added,
            (false, false, true) => Status::Removed,
            (false, false, false) => Status::Unchanged,
        }
    }

    pub const fn any(self) -> bool {
        self.added || self.removed || self.changed
    }
}

/// Four disjoint ID sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSets {
    sets: [BTreeSet<FeatureId>; 4],
}

impl StatusSets {
    pub fn get(&self, status: Status) -> &BTreeSet<FeatureId> {
        &self.sets[status.index()]
    }

    pub fn added(&self) -> &BTreeSet<FeatureId> {
        self.get(Status::Added)
    }

    pub fn removed(&self) -> &BTreeSet<FeatureId> {
        self.get(Status::Removed)
    }

    pub fn changed(&self) -> &BTreeSet<FeatureId> {
        self.get(Status::Changed)
    }

    pub fn unchanged(&self) -> &BTreeSet<FeatureId> {
        self.get(Status::Unchanged)
    }

    pub fn status_of(&self, id: &str) -> Option<Status> {
        Status::ALL
            .into_iter()
            .find(|s| self.sets[s.index()].contains(id))
    }

    pub fn len(&self) -> usize {
        self.sets.iter().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(BTreeSet::is_empty)
    }

    /// `(id, status)` pairs, grouped by status.
    pub fn iter(&self) -> impl Iterator<Item = (&FeatureId, Status)> {
        Status::ALL
            .into_iter()
            .flat_map(move |s| self.sets[s.index()].iter().map(move |id| (id, s)))
    }

    fn insert(&mut self, id: FeatureId, status: Status) {
        self.sets[status.index()].insert(id);
    }
}

/// Rename bookkeeping for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RenameFold {
    /// old → new
    forward: BTreeMap<FeatureId, FeatureId>,
    /// new → old
    backward: BTreeMap<FeatureId, FeatureId>,
}

impl RenameFold {
    fn canonical<'a>(&'a self, id: &'a str) -> &'a str {
        self.backward.get(id).map_or(id, String::as_str)
    }
}

/// Result of classifying a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    domains: [StatusSets; 3],
    orphans: [StatusSets; 3],
    renames: [RenameFold; 3],
}

impl Classification {
    /// Sets for features with geometry.
    pub fn sets(&self, domain: Domain) -> &StatusSets {
        &self.domains[domain.index()]
    }

    /// Payload IDs of `domain` with no geometry in either snapshot.
    pub fn orphans(&self, domain: Domain) -> &StatusSets {
        &self.orphans[domain.index()]
    }

    pub fn status_of(&self, domain: Domain, id: &str) -> Option<Status> {
        self.sets(domain).status_of(id)
    }

    /// New ID a feature was renamed to.
    pub fn rename_target(&self, domain: Domain, old: &str) -> Option<&FeatureId> {
        self.renames[domain.index()].forward.get(old)
    }

    /// ID a rename target was folded into.
    pub fn folded_into(&self, domain: Domain, new: &str) -> Option<&FeatureId> {
        self.renames[domain.index()].backward.get(new)
    }

    /// Number of classified features per status across all domains.
    pub fn counts(&self) -> [usize; 4] {
        let mut out = [0; 4];
        for sets in &self.domains {
            for s in Status::ALL {
                out[s.index()] += sets.get(s).len();
            }
        }
        out
    }
}

/// Classify every geometric feature of `payload`.
pub fn classify(payload: &Payload) -> Classification {
    let _span = debug_span!("classify").entered();
    let mut out = Classification::default();
    for domain in Domain::ALL {
        let fold = rename_fold(payload, domain);
        let (sets, orphans) = classify_domain(payload, domain, &fold);
        debug!(
            %domain,
            features = sets.len(),
            orphans = orphans.len(),
            renames = fold.forward.len(),
            "classified domain"
        );
        out.domains[domain.index()] = sets;
        out.orphans[domain.index()] = orphans;
        out.renames[domain.index()] = fold;
    }
    out
}

fn rename_fold(payload: &Payload, domain: Domain) -> RenameFold {
    let mut fold = RenameFold::default();
    for (old, new) in payload.renames_in(domain) {
        if old == new {
            continue;
        }
        fold.forward.insert(old.clone(), new.clone());
        fold.backward.insert(new.clone(), old.clone());
    }
    fold
}

fn classify_domain(payload: &Payload, domain: Domain, fold: &RenameFold) -> (StatusSets, StatusSets) {
    let mut universe: BTreeSet<&str> = BTreeSet::new();
    for id in payload.pre.ids(domain).chain(payload.post.ids(domain)) {
        universe.insert(fold.canonical(id));
    }

    let mut claims: BTreeMap<&str, Claims> = BTreeMap::new();
    for (_, diff) in payload.diffs_in(domain) {
        for id in diff.added.keys() {
            claims.entry(fold.canonical(id)).or_default().added = true;
        }
        for id in diff.removed.keys() {
            claims.entry(fold.canonical(id)).or_default().removed = true;
        }
        for id in diff.changed.keys() {
            claims.entry(fold.canonical(id)).or_default().changed = true;
        }
    }
    for old in fold.forward.keys() {
        claims.entry(old.as_str()).or_default().changed = true;
    }

    let mut sets = StatusSets::default();
    let mut orphans = StatusSets::default();
    for (id, claim) in &claims {
        let status = claim.resolve();
        if universe.contains(id) {
            sets.insert((*id).to_string(), status);
        } else {
            debug!(%domain, id, %status, "claimed id has no geometry");
            orphans.insert((*id).to_string(), status);
        }
    }
    for id in universe {
        if !claims.contains_key(id) {
            sets.insert(id.to_string(), Status::Unchanged);
        }
    }
    (sets, orphans)
}
