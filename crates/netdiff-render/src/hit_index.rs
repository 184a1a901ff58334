#![forbid(unsafe_code)]

//! Uniform-grid bucket index over pixel bounding boxes.
//!
//! Prunes hit-test candidates before the exact geometric tests run.
//!
//! # Design
//!
//! - **Uniform grid**: the surface is divided into square cells
//!   (default 32 px).
//! - **Bucket lists**: each cell stores the entries whose box overlaps it,
//!   in registration order.
//! - **Registration order is result order**: callers register features in
//!   the order they want candidates back, so queries never sort.
//!
//! # Invariants
//!
//! 1. A query returns every entry whose box contains the point.
//! 2. Results are in registration order, without duplicates.
//! 3. Boxes partly off-surface are clamped to the edge buckets; boxes
//!    entirely off-surface are not stored.

use netdiff_core::geometry::{PixelPoint, PixelRect};
use netdiff_model::FeatureKey;
use smallvec::SmallVec;
use tracing::warn;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for [`SpatialHitIndex`].
#[derive(Debug, Clone)]
pub struct SpatialHitConfig {
    /// Grid cell size in pixels (default: 32).
    pub cell_size: f64,

    /// Bucket length above which a warning is logged (default: 512).
    pub bucket_warn_threshold: usize,
}

impl Default for SpatialHitConfig {
    fn default() -> Self {
        Self {
            cell_size: 32.0,
            bucket_warn_threshold: 512,
        }
    }
}

// ---------------------------------------------------------------------------
// Entries and buckets
// ---------------------------------------------------------------------------

/// A registered feature's pixel footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEntry {
    pub key: FeatureKey,
    /// Registration position, for callers keeping parallel storage.
    pub slot: usize,
    /// Bounding box, already grown by any hit tolerance.
    pub rect: PixelRect,
}

#[derive(Debug, Clone, Default)]
struct Bucket {
    entries: Vec<u32>,
}

// ---------------------------------------------------------------------------
// SpatialHitIndex
// ---------------------------------------------------------------------------

/// Bucket grid over a `width × height` pixel surface.
#[derive(Debug, Clone)]
pub struct SpatialHitIndex {
    config: SpatialHitConfig,
    width: f64,
    height: f64,
    grid_width: usize,
    grid_height: usize,
    entries: Vec<HitEntry>,
    buckets: Vec<Bucket>,
    warned: bool,
}

impl SpatialHitIndex {
    pub fn new(width: f64, height: f64, config: SpatialHitConfig) -> Self {
        let cell = config.cell_size.max(1.0);
        let width = width.max(1.0);
        let height = height.max(1.0);
        let grid_width = (width / cell).ceil() as usize;
        let grid_height = (height / cell).ceil() as usize;
        Self {
            config: SpatialHitConfig {
                cell_size: cell,
                ..config
            },
            width,
            height,
            grid_width,
            grid_height,
            entries: Vec::new(),
            buckets: vec![Bucket::default(); grid_width * grid_height],
            warned: false,
        }
    }

    pub fn with_defaults(width: f64, height: f64) -> Self {
        Self::new(width, height, SpatialHitConfig::default())
    }

    /// Register a footprint. Returns `false` when it lies entirely
    /// off-surface or is empty.
    pub fn register(&mut self, key: FeatureKey, rect: PixelRect) -> bool {
        if rect.is_empty() || !rect.intersects(&self.surface()) {
            return false;
        }
        let slot = self.entries.len();
        let idx = slot as u32;
        self.entries.push(HitEntry { key, slot, rect });

        let (bx0, by0, bx1, by1) = self.bucket_range(&rect);
        for by in by0..=by1 {
            for bx in bx0..=bx1 {
                let bucket = &mut self.buckets[by * self.grid_width + bx];
                bucket.entries.push(idx);
                if bucket.entries.len() > self.config.bucket_warn_threshold && !self.warned {
                    warn!(
                        bucket_len = bucket.entries.len(),
                        cell_size = self.config.cell_size,
                        "hit index bucket overflow; consider a smaller cell size"
                    );
                    self.warned = true;
                }
            }
        }
        true
    }

    /// Entries whose box contains `p`, in registration order.
    pub fn query(&self, p: PixelPoint) -> SmallVec<[&HitEntry; 16]> {
        let Some(bucket) = self.bucket_index(p) else {
            return SmallVec::new();
        };
        self.buckets[bucket]
            .entries
            .iter()
            .map(|&i| &self.entries[i as usize])
            .filter(|e| e.rect.contains(p))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        for bucket in &mut self.buckets {
            bucket.entries.clear();
        }
        self.warned = false;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn surface(&self) -> PixelRect {
        PixelRect::from_size(self.width, self.height)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn cell_of(&self, v: f64, cells: usize) -> usize {
        let c = (v / self.config.cell_size).floor();
        if c <= 0.0 {
            0
        } else {
            (c as usize).min(cells.saturating_sub(1))
        }
    }

    fn bucket_index(&self, p: PixelPoint) -> Option<usize> {
        if !self.surface().contains(p) {
            return None;
        }
        let bx = self.cell_of(p.x, self.grid_width);
        let by = self.cell_of(p.y, self.grid_height);
        Some(by * self.grid_width + bx)
    }

    fn bucket_range(&self, rect: &PixelRect) -> (usize, usize, usize, usize) {
        (
            self.cell_of(rect.min_x, self.grid_width),
            self.cell_of(rect.min_y, self.grid_height),
            self.cell_of(rect.max_x, self.grid_width),
            self.cell_of(rect.max_y, self.grid_height),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
