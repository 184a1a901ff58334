#![forbid(unsafe_code)]

//! Click cycling through overlapping candidates.
//!
//! Repeated fresh clicks that produce the same candidate list step through
//! it; any different list starts over at its first entry.
//!
//! ```text
//!   click → [J1, C4, S2]  → J1   (index 0)
//!   click → [J1, C4, S2]  → C4   (index 1)
//!   click → [J1, C4, S2]  → S2   (index 2)
//!   click → [J1, C4, S2]  → J1   (index 0)
//!   click → [C4]          → C4   (reset)
//!   click → []            → none (cleared)
//! ```

use netdiff_core::event::CycleDirection;
use netdiff_core::geometry::{Bounds, LatLon, PixelPoint};
use netdiff_model::{Domain, Feature, FeatureId, FeatureKey, Geometry, Status};
use tracing::debug;

use crate::style::{Palette, Rgba, Shape};

/// Outline copy of the selected feature, drawn above every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub key: FeatureKey,
    pub shape: Shape,
    pub geometry: Geometry,
    pub color: Rgba,
}

impl Overlay {
    pub fn for_feature(key: FeatureKey, feature: &Feature, palette: &Palette) -> Self {
        Self {
            key,
            shape: Shape::for_feature(feature.domain, feature.subtype),
            geometry: feature.geometry.clone(),
            color: palette.selection,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.geometry.bounds()
    }
}

/// What collaborators learn about the current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub key: FeatureKey,
    pub id: FeatureId,
    pub domain: Domain,
    pub status: Status,
    pub anchor: LatLon,
    pub bounds: Bounds,
    /// Position in the candidate list.
    pub index: usize,
    pub of: usize,
}

impl Selection {
    pub fn describe(key: FeatureKey, feature: &Feature, index: usize, of: usize) -> Self {
        Self {
            key,
            id: feature.id.clone(),
            domain: feature.domain,
            status: feature.status,
            anchor: feature.anchor(),
            bounds: feature.geometry.bounds(),
            index,
            of,
        }
    }
}

/// Candidate list, cursor, and last click location.
#[derive(Debug, Clone, Default)]
pub struct SelectionCycler {
    last_candidates: Vec<FeatureKey>,
    last_index: usize,
    last_location: Option<PixelPoint>,
}

impl SelectionCycler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a pointer interaction.
    ///
    /// Fresh clicks either advance through an unchanged candidate list or
    /// start over on a new one; an empty list clears the selection. Events
    /// that are not fresh clicks leave the state alone.
    pub fn select(
        &mut self,
        location: PixelPoint,
        candidates: Vec<FeatureKey>,
        fresh: bool,
    ) -> Option<FeatureKey> {
        self.select_toward(location, candidates, fresh, CycleDirection::Next)
    }

    /// [`select`](Self::select) stepping in `direction` when the candidate
    /// list is unchanged. A new list always starts at the topmost candidate.
    pub fn select_toward(
        &mut self,
        location: PixelPoint,
        candidates: Vec<FeatureKey>,
        fresh: bool,
        direction: CycleDirection,
    ) -> Option<FeatureKey> {
        if !fresh {
            return self.current();
        }
        self.last_location = Some(location);
        if candidates.is_empty() {
            debug!("no candidates; selection cleared");
            self.last_candidates.clear();
            self.last_index = 0;
            return None;
        }
        if candidates == self.last_candidates {
            self.step(direction);
        } else {
            self.last_candidates = candidates;
            self.last_index = 0;
        }
        debug!(
            index = self.last_index,
            of = self.last_candidates.len(),
            "selection"
        );
        self.current()
    }

    /// Step through the current list without hit testing again.
    pub fn cycle(&mut self, direction: CycleDirection) -> Option<FeatureKey> {
        if self.last_candidates.is_empty() {
            return None;
        }
        self.step(direction);
        self.current()
    }

    fn step(&mut self, direction: CycleDirection) {
        let len = self.last_candidates.len() as isize;
        self.last_index = (self.last_index as isize + direction.step()).rem_euclid(len) as usize;
    }

    pub fn current(&self) -> Option<FeatureKey> {
        self.last_candidates.get(self.last_index).copied()
    }

    pub fn index(&self) -> usize {
        self.last_index
    }

    pub fn candidates(&self) -> &[FeatureKey] {
        &self.last_candidates
    }

    pub fn last_location(&self) -> Option<PixelPoint> {
        self.last_location
    }

    /// Forget everything; keys from an older feature set are meaningless.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
