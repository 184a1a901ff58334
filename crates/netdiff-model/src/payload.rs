#![forbid(unsafe_code)]

//! Comparison payload: wire schema and one-shot normalization.
//!
//! The wire format is loose. `changed` entries come either as a flat
//! `[old, new]` pair or as `{"values": [old, new], "diff_values": {..}}`, and
//! area geometry may be a single ring or a list of rings. [`Payload`] holds
//! the normalized form; nothing downstream sees the raw shapes.
//!
//! Entries with unusable geometry are dropped here with a debug log so that
//! later passes can assume every stored coordinate is finite and every
//! polyline/ring has enough vertices.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use netdiff_core::geometry::ModelPoint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{PayloadError, Result};
use crate::section::Domain;

/// Feature identifier as it appears in the model.
pub type FeatureId = String;

/// Field values of one model record.
pub type FieldValues = Vec<String>;

/// A closed ring of model coordinates.
pub type Ring = Vec<ModelPoint>;

/// Rings of one area feature. Almost every area has exactly one.
pub type Rings = SmallVec<[Ring; 1]>;

/// Minimum vertex count for a polyline.
pub const MIN_LINE_VERTICES: usize = 2;
/// Minimum vertex count for a ring.
pub const MIN_RING_VERTICES: usize = 3;

// ── Normalized schema ───────────────────────────────────────────────────

/// A record present in both models with differing values.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangedEntry {
    /// Old and new values only.
    Pair { old: FieldValues, new: FieldValues },
    /// Old and new values with numeric per-field deltas.
    Detailed {
        old: FieldValues,
        new: FieldValues,
        deltas: BTreeMap<String, f64>,
    },
}

impl ChangedEntry {
    pub fn old(&self) -> &[String] {
        match self {
            Self::Pair { old, .. } | Self::Detailed { old, .. } => old,
        }
    }

    pub fn new_values(&self) -> &[String] {
        match self {
            Self::Pair { new, .. } | Self::Detailed { new, .. } => new,
        }
    }

    pub fn deltas(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            Self::Pair { .. } => None,
            Self::Detailed { deltas, .. } => Some(deltas),
        }
    }

    fn empty() -> Self {
        Self::Pair {
            old: Vec::new(),
            new: Vec::new(),
        }
    }
}

/// Added/removed/changed records of one section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionDiff {
    pub added: BTreeMap<FeatureId, FieldValues>,
    pub removed: BTreeMap<FeatureId, FieldValues>,
    pub changed: BTreeMap<FeatureId, ChangedEntry>,
}

impl SectionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Geometry of one model version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotGeometry {
    pub nodes: BTreeMap<FeatureId, ModelPoint>,
    pub links: BTreeMap<FeatureId, Vec<ModelPoint>>,
    pub areas: BTreeMap<FeatureId, Rings>,
}

impl SnapshotGeometry {
    /// IDs with geometry in `domain`.
    pub fn ids(&self, domain: Domain) -> Box<dyn Iterator<Item = &FeatureId> + '_> {
        match domain {
            Domain::Point => Box::new(self.nodes.keys()),
            Domain::Line => Box::new(self.links.keys()),
            Domain::Area => Box::new(self.areas.keys()),
        }
    }

    pub fn contains(&self, domain: Domain, id: &str) -> bool {
        match domain {
            Domain::Point => self.nodes.contains_key(id),
            Domain::Line => self.links.contains_key(id),
            Domain::Area => self.areas.contains_key(id),
        }
    }

    pub fn len(&self, domain: Domain) -> usize {
        match domain {
            Domain::Point => self.nodes.len(),
            Domain::Line => self.links.len(),
            Domain::Area => self.areas.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty() && self.areas.is_empty()
    }
}

/// Section membership of one model version (section → IDs).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Membership {
    sections: BTreeMap<String, BTreeSet<FeatureId>>,
}

impl Membership {
    pub fn contains(&self, section: &str, id: &str) -> bool {
        self.sections.get(section).is_some_and(|ids| ids.contains(id))
    }

    /// First section of `domain` listing `id`.
    pub fn section_of(&self, domain: Domain, id: &str) -> Option<&'static str> {
        domain
            .sections()
            .iter()
            .copied()
            .find(|section| self.contains(section, id))
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn insert(&mut self, section: impl Into<String>, id: impl Into<FeatureId>) {
        self.sections
            .entry(section.into())
            .or_default()
            .insert(id.into());
    }
}

/// Per-section counts for the summary panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSummary {
    pub section: String,
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
}

/// A fully normalized comparison payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub diffs: BTreeMap<String, SectionDiff>,
    /// Section → old ID → new ID.
    pub renames: BTreeMap<String, BTreeMap<FeatureId, FeatureId>>,
    /// Projection name the payload was produced in, if any.
    pub crs: Option<String>,
    pub pre: SnapshotGeometry,
    pub post: SnapshotGeometry,
    pub pre_sections: Membership,
    pub post_sections: Membership,
    pub headers: BTreeMap<String, Vec<String>>,
}

impl Payload {
    /// Parse a payload from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(PayloadError::Syntax)?;
        Self::from_value(value)
    }

    /// Parse a payload from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let value: Value = serde_json::from_reader(reader).map_err(PayloadError::read)?;
        Self::from_value(value)
    }

    /// Normalize an already-parsed JSON document.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(PayloadError::not_an_object(&value));
        }
        let raw: RawPayload = serde_json::from_value(value).map_err(PayloadError::Schema)?;
        Ok(raw.normalize())
    }

    /// Rename entries of every geometric section in `domain` (old → new).
    pub fn renames_in(&self, domain: Domain) -> impl Iterator<Item = (&FeatureId, &FeatureId)> {
        self.renames
            .iter()
            .filter(move |(section, _)| Domain::of_section(section) == Some(domain))
            .flat_map(|(_, map)| map.iter())
    }

    /// Geometric sections of `domain` present in the diff maps.
    pub fn diffs_in(&self, domain: Domain) -> impl Iterator<Item = (&String, &SectionDiff)> {
        self.diffs
            .iter()
            .filter(move |(section, _)| Domain::of_section(section) == Some(domain))
    }

    /// Per-section counts ordered by section name. Renamed IDs count as
    /// changed even when the diff map omits them.
    pub fn summary(&self) -> Vec<SectionSummary> {
        let sections: BTreeSet<&String> = self.diffs.keys().chain(self.renames.keys()).collect();
        sections
            .into_iter()
            .map(|section| {
                let diff = self.diffs.get(section);
                let mut changed: BTreeSet<&str> = diff
                    .map(|d| d.changed.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                if let Some(renames) = self.renames.get(section) {
                    changed.extend(renames.keys().map(String::as_str));
                }
                SectionSummary {
                    section: section.clone(),
                    added: diff.map_or(0, |d| d.added.len()),
                    removed: diff.map_or(0, |d| d.removed.len()),
                    changed: changed.len(),
                }
            })
            .collect()
    }
}

// ── Wire schema ─────────────────────────────────────────────────────────

/// `null` or a mistyped value deserializes to the default value.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_else(|err| {
        debug!(error = %err, "ignoring mistyped payload key");
        T::default()
    }))
}

/// Decode one section value, skipping it when it is `null` or mistyped.
fn decode_section<T: DeserializeOwned>(
    kind: &'static str,
    section: &str,
    value: Value,
) -> Option<T> {
    if value.is_null() {
        debug!(kind, section, "section is null, skipping");
        return None;
    }
    serde_json::from_value(value)
        .inspect_err(|err| debug!(kind, section, error = %err, "malformed section, skipping"))
        .ok()
}

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    #[serde(default, deserialize_with = "lenient")]
    diffs: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    renames: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    geometry: RawGeometry,
    #[serde(default, deserialize_with = "lenient")]
    sections1: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    sections2: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    headers: BTreeMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSectionDiff {
    #[serde(default, deserialize_with = "lenient")]
    added: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    removed: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    changed: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawChanged {
    Detailed {
        values: (Vec<Value>, Vec<Value>),
        #[serde(default)]
        diff_values: BTreeMap<String, Value>,
    },
    Pair(Vec<Value>, Vec<Value>),
}

#[derive(Debug, Default, Deserialize)]
struct RawGeometry {
    #[serde(default, deserialize_with = "lenient")]
    crs: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    nodes1: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    links1: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    subs1: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    nodes2: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    links2: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient")]
    subs2: BTreeMap<String, Value>,
}

impl RawPayload {
    fn normalize(self) -> Payload {
        let diffs = self
            .diffs
            .into_iter()
            .filter_map(|(name, value)| {
                let raw: RawSectionDiff = decode_section("diffs", &name, value)?;
                let diff = raw.normalize(&name);
                Some((name, diff))
            })
            .collect();

        let renames = self
            .renames
            .into_iter()
            .filter_map(|(section, value)| {
                let map: BTreeMap<String, Value> = decode_section("renames", &section, value)?;
                let map = map
                    .into_iter()
                    .filter_map(|(old, new)| match field_text(&new) {
                        text if !text.is_empty() => Some((old, text)),
                        _ => {
                            debug!(%section, id = %old, "dropping rename without a target");
                            None
                        }
                    })
                    .collect();
                Some((section, map))
            })
            .collect();

        let geometry = self.geometry;
        let pre = snapshot("pre", geometry.nodes1, geometry.links1, geometry.subs1);
        let post = snapshot("post", geometry.nodes2, geometry.links2, geometry.subs2);

        Payload {
            diffs,
            renames,
            crs: geometry.crs.filter(|c| !c.trim().is_empty()),
            pre,
            post,
            pre_sections: membership(self.sections1),
            post_sections: membership(self.sections2),
            headers: self
                .headers
                .into_iter()
                .filter_map(|(name, value)| {
                    let cols: Vec<Value> = decode_section("headers", &name, value)?;
                    Some((name, cols.iter().map(field_text).collect()))
                })
                .collect(),
        }
    }
}

impl RawSectionDiff {
    fn normalize(self, section: &str) -> SectionDiff {
        let changed = self
            .changed
            .into_iter()
            .map(|(id, value)| {
                let entry = match serde_json::from_value::<RawChanged>(value) {
                    Ok(raw) => raw.normalize(),
                    Err(err) => {
                        debug!(section, %id, error = %err, "malformed changed entry, keeping id only");
                        ChangedEntry::empty()
                    }
                };
                (id, entry)
            })
            .collect();
        SectionDiff {
            added: field_map(self.added),
            removed: field_map(self.removed),
            changed,
        }
    }
}

impl RawChanged {
    fn normalize(self) -> ChangedEntry {
        match self {
            RawChanged::Pair(old, new) => ChangedEntry::Pair {
                old: old.iter().map(field_text).collect(),
                new: new.iter().map(field_text).collect(),
            },
            RawChanged::Detailed {
                values: (old, new),
                diff_values,
            } => ChangedEntry::Detailed {
                old: old.iter().map(field_text).collect(),
                new: new.iter().map(field_text).collect(),
                deltas: diff_values
                    .into_iter()
                    .filter_map(|(field, v)| number(&v).map(|n| (field, n)))
                    .collect(),
            },
        }
    }
}

fn field_map(raw: BTreeMap<String, Value>) -> BTreeMap<FeatureId, FieldValues> {
    raw.into_iter()
        .map(|(id, value)| {
            let values = match value {
                Value::Array(items) => items.iter().map(field_text).collect(),
                Value::Null => Vec::new(),
                other => vec![field_text(&other)],
            };
            (id, values)
        })
        .collect()
}

fn membership(raw: BTreeMap<String, Value>) -> Membership {
    let mut out = Membership::default();
    for (section, records) in raw {
        match records {
            Value::Object(map) => {
                for id in map.keys() {
                    out.insert(section.as_str(), id.as_str());
                }
            }
            _ => debug!(%section, "section membership is not an object, skipping"),
        }
    }
    out
}

fn snapshot(
    label: &'static str,
    nodes: BTreeMap<String, Value>,
    links: BTreeMap<String, Value>,
    subs: BTreeMap<String, Value>,
) -> SnapshotGeometry {
    let mut out = SnapshotGeometry::default();
    for (id, value) in nodes {
        match coord(&value) {
            Some(p) => {
                out.nodes.insert(id, p);
            }
            None => debug!(snapshot = label, %id, "dropping node with unusable coordinates"),
        }
    }
    for (id, value) in links {
        match path(&value).filter(|p| p.len() >= MIN_LINE_VERTICES) {
            Some(p) => {
                out.links.insert(id, p);
            }
            None => debug!(snapshot = label, %id, "dropping link with unusable vertices"),
        }
    }
    for (id, value) in subs {
        match rings(&value) {
            Some(r) => {
                out.areas.insert(id, r);
            }
            None => debug!(snapshot = label, %id, "dropping area with no usable ring"),
        }
    }
    out
}

// ── Value coercion ──────────────────────────────────────────────────────

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn coord(value: &Value) -> Option<ModelPoint> {
    let pair = value.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    Some(ModelPoint::new(number(&pair[0])?, number(&pair[1])?))
}

fn is_coord(value: &Value) -> bool {
    value
        .as_array()
        .and_then(|a| a.first())
        .is_some_and(|first| number(first).is_some())
}

/// All vertices must be usable; one bad vertex drops the path.
fn path(value: &Value) -> Option<Vec<ModelPoint>> {
    value.as_array()?.iter().map(coord).collect()
}

fn rings(value: &Value) -> Option<Rings> {
    let items = value.as_array()?;
    let first = items.first()?;
    let out: Rings = if is_coord(first) {
        path(value)
            .filter(|r| r.len() >= MIN_RING_VERTICES)
            .into_iter()
            .collect()
    } else {
        items
            .iter()
            .filter_map(|ring| path(ring).filter(|r| r.len() >= MIN_RING_VERTICES))
            .collect()
    };
    (!out.is_empty()).then_some(out)
}
