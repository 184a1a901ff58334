#![forbid(unsafe_code)]

//! Feature arena.
//!
//! One owned `Vec<Feature>` per build, addressed by [`FeatureKey`], with
//! secondary indices by domain and status. The set is rebuilt from scratch
//! whenever the payload or the projection changes; nothing mutates a feature
//! after construction.
//!
//! # Snapshot selection
//!
//! | Status              | Geometry drawn                      |
//! |---------------------|-------------------------------------|
//! | removed             | pre only                            |
//! | added/changed/unch. | post, falling back to pre           |
//!
//! A renamed feature whose old ID is missing from the post snapshot borrows
//! the post geometry stored under its new ID.

use std::collections::HashMap;

use netdiff_core::geometry::{Bounds, LatLon, ModelPoint};
use smallvec::SmallVec;
use tracing::{debug, debug_span, info};

use crate::classify::{Classification, Status};
use crate::payload::{FeatureId, Membership, Payload, SnapshotGeometry};
use crate::projection::Projector;
use crate::section::Domain;

/// Index of a feature in its [`FeatureSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureKey(u32);

impl FeatureKey {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which model version a feature's geometry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Snapshot {
    Pre,
    Post,
}

/// Polyline parts or polygon rings in display coordinates.
pub type Paths = SmallVec<[Vec<LatLon>; 1]>;

/// Display-space geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(LatLon),
    /// One or more contiguous chains.
    Line(Paths),
    /// One or more rings, unioned.
    Area(Paths),
}

impl Geometry {
    pub fn domain(&self) -> Domain {
        match self {
            Geometry::Point(_) => Domain::Point,
            Geometry::Line(_) => Domain::Line,
            Geometry::Area(_) => Domain::Area,
        }
    }

    /// Every vertex.
    pub fn coords(&self) -> Box<dyn Iterator<Item = &LatLon> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(p)),
            Geometry::Line(parts) | Geometry::Area(parts) => Box::new(parts.iter().flatten()),
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_coords(self.coords())
    }

    /// Stable reference point used for selection and labels.
    ///
    /// Points use their location. Lines use the point halfway along their
    /// total length. Areas use the mean of all ring vertices.
    pub fn anchor(&self) -> LatLon {
        match self {
            Geometry::Point(p) => *p,
            Geometry::Line(parts) => line_anchor(parts),
            Geometry::Area(rings) => vertex_mean(rings.iter().flatten()),
        }
    }
}

fn line_anchor(parts: &Paths) -> LatLon {
    let segments = || {
        parts
            .iter()
            .flat_map(|part| part.windows(2))
            .map(|seg| {
                let (a, b) = (seg[0], seg[1]);
                (a, b, (b.lat - a.lat).hypot(b.lon - a.lon))
            })
    };
    let total: f64 = segments().map(|(_, _, len)| len).sum();
    if total <= 0.0 {
        return vertex_mean(parts.iter().flatten());
    }
    let mut remaining = total / 2.0;
    let mut last = None;
    for (a, b, len) in segments() {
        if len > 0.0 && remaining <= len {
            let t = remaining / len;
            return LatLon::new(a.lat + (b.lat - a.lat) * t, a.lon + (b.lon - a.lon) * t);
        }
        remaining -= len;
        last = Some(b);
    }
    // Rounding left a sliver past the final segment.
    last.unwrap_or_else(|| vertex_mean(parts.iter().flatten()))
}

fn vertex_mean<'a>(coords: impl Iterator<Item = &'a LatLon>) -> LatLon {
    let (mut lat, mut lon, mut n) = (0.0, 0.0, 0usize);
    for c in coords {
        lat += c.lat;
        lon += c.lon;
        n += 1;
    }
    if n == 0 {
        return LatLon::default();
    }
    LatLon::new(lat / n as f64, lon / n as f64)
}

/// A classified, projected feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub domain: Domain,
    /// Model section the feature belongs to (selects point shapes).
    pub subtype: Option<&'static str>,
    pub status: Status,
    pub geometry: Geometry,
    pub source: Snapshot,
    /// New ID when the feature was renamed.
    pub renamed_to: Option<FeatureId>,
}

impl Feature {
    #[inline]
    pub fn anchor(&self) -> LatLon {
        self.geometry.anchor()
    }
}

/// Owned collection of features with domain/status indices.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    features: Vec<Feature>,
    index: [[Vec<FeatureKey>; 4]; 3],
    by_id: HashMap<(Domain, FeatureId), FeatureKey>,
    bounds: Bounds,
    projection: String,
}

impl FeatureSet {
    /// Build the arena for `classification` using `projector`.
    ///
    /// IDs with no usable geometry in the selected snapshot are skipped.
    pub fn build(payload: &Payload, classification: &Classification, projector: &Projector) -> Self {
        let _span = debug_span!("build_features", projection = projector.name()).entered();
        let mut set = FeatureSet {
            projection: projector.name().to_string(),
            ..Self::default()
        };

        for domain in Domain::ALL {
            for (id, status) in classification.sets(domain).iter() {
                let renamed_to = classification.rename_target(domain, id);
                let Some((geometry, source)) =
                    select_geometry(payload, domain, id, status, renamed_to, projector)
                else {
                    debug!(%domain, id = %id, %status, "no geometry in selected snapshot, skipping");
                    continue;
                };
                let subtype = subtype(payload, domain, id, renamed_to, source);
                set.push(Feature {
                    id: id.clone(),
                    domain,
                    subtype,
                    status,
                    geometry,
                    source,
                    renamed_to: renamed_to.cloned(),
                });
            }
        }

        set.bounds = plotted_bounds(payload, classification, projector);
        info!(
            features = set.len(),
            projection = %set.projection,
            "feature set rebuilt"
        );
        set
    }

    fn push(&mut self, feature: Feature) {
        let key = FeatureKey(self.features.len() as u32);
        self.index[feature.domain.index()][feature.status.index()].push(key);
        self.by_id.insert((feature.domain, feature.id.clone()), key);
        self.features.push(feature);
    }

    pub fn get(&self, key: FeatureKey) -> Option<&Feature> {
        self.features.get(key.index())
    }

    pub fn find(&self, domain: Domain, id: &str) -> Option<FeatureKey> {
        self.by_id.get(&(domain, id.to_string())).copied()
    }

    /// Keys of one status sub-layer, in feature order.
    pub fn keys(&self, domain: Domain, status: Status) -> &[FeatureKey] {
        &self.index[domain.index()][status.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKey, &Feature)> {
        self.features
            .iter()
            .enumerate()
            .map(|(i, f)| (FeatureKey(i as u32), f))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding box over every plotted coordinate of both snapshots.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Name of the projection the set was built with.
    pub fn projection(&self) -> &str {
        &self.projection
    }
}

fn select_geometry(
    payload: &Payload,
    domain: Domain,
    id: &str,
    status: Status,
    renamed_to: Option<&FeatureId>,
    projector: &Projector,
) -> Option<(Geometry, Snapshot)> {
    let post = || {
        project(&payload.post, domain, id, projector)
            .or_else(|| renamed_to.and_then(|new| project(&payload.post, domain, new, projector)))
    };
    let pre = || project(&payload.pre, domain, id, projector);
    match status {
        Status::Removed => pre().map(|g| (g, Snapshot::Pre)),
        Status::Added | Status::Changed | Status::Unchanged => post()
            .map(|g| (g, Snapshot::Post))
            .or_else(|| pre().map(|g| (g, Snapshot::Pre))),
    }
}

fn project(
    snapshot: &SnapshotGeometry,
    domain: Domain,
    id: &str,
    projector: &Projector,
) -> Option<Geometry> {
    let path = |pts: &[ModelPoint]| pts.iter().map(|p| projector.project(*p)).collect::<Vec<_>>();
    match domain {
        Domain::Point => snapshot
            .nodes
            .get(id)
            .map(|p| Geometry::Point(projector.project(*p))),
        Domain::Line => snapshot
            .links
            .get(id)
            .map(|pts| Geometry::Line(SmallVec::from_elem(path(pts.as_slice()), 1))),
        Domain::Area => snapshot
            .areas
            .get(id)
            .map(|rings| Geometry::Area(rings.iter().map(|r| path(r.as_slice())).collect())),
    }
}

fn subtype(
    payload: &Payload,
    domain: Domain,
    id: &str,
    renamed_to: Option<&FeatureId>,
    source: Snapshot,
) -> Option<&'static str> {
    let (first, second): (&Membership, &Membership) = match source {
        Snapshot::Pre => (&payload.pre_sections, &payload.post_sections),
        Snapshot::Post => (&payload.post_sections, &payload.pre_sections),
    };
    first
        .section_of(domain, id)
        .or_else(|| second.section_of(domain, id))
        .or_else(|| renamed_to.and_then(|new| payload.post_sections.section_of(domain, new)))
}

fn plotted_bounds(payload: &Payload, classification: &Classification, projector: &Projector) -> Bounds {
    let mut bounds = Bounds::EMPTY;
    for domain in Domain::ALL {
        for (id, _) in classification.sets(domain).iter() {
            let mut ids: SmallVec<[&str; 2]> = SmallVec::new();
            ids.push(id.as_str());
            if let Some(new) = classification.rename_target(domain, id) {
                ids.push(new.as_str());
            }
            for snapshot in [&payload.pre, &payload.post] {
                for id in &ids {
                    if let Some(g) = project(snapshot, domain, id, projector) {
                        bounds = bounds.union(&g.bounds());
                    }
                }
            }
        }
    }
    bounds
}
