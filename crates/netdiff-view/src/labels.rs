#![forbid(unsafe_code)]

//! Zoom-gated feature labels.
//!
//! Below the zoom threshold nothing is labeled. Above it every feature that
//! is drawn, lies inside the viewport, belongs to an enabled domain, and is
//! not dimmed gets exactly one label at its anchor. Points label to the
//! right of the marker; lines and areas center on the anchor.
//!
//! Camera changes go through a [`TrailingThrottle`] so that a burst of
//! pan/zoom events triggers a single placement pass.

use std::time::Duration;

use bitflags::bitflags;
use netdiff_core::geometry::{LatLon, PixelPoint};
use netdiff_core::throttle::TrailingThrottle;
use netdiff_model::{Domain, FeatureKey};
use netdiff_render::{Scene, Viewport};
use tracing::{debug, debug_span, trace};
use web_time::Instant;

/// Zoom level at which labels appear.
pub const DEFAULT_LABEL_ZOOM: f64 = 17.0;

/// Horizontal gap between a point marker and its label, in pixels.
pub const POINT_LABEL_OFFSET: f64 = 8.0;

bitflags! {
    /// Domains whose features are labeled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LabelToggles: u8 {
        const POINTS = 0b001;
        const LINES  = 0b010;
        const AREAS  = 0b100;
    }
}

impl Default for LabelToggles {
    fn default() -> Self {
        Self::all()
    }
}

impl LabelToggles {
    pub const fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Point => Self::POINTS,
            Domain::Line => Self::LINES,
            Domain::Area => Self::AREAS,
        }
    }

    pub fn shows(self, domain: Domain) -> bool {
        self.contains(Self::for_domain(domain))
    }
}

/// Placement of the label text relative to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Text starts at the position (right of a marker).
    Right,
    /// Text is centered on the position.
    Center,
}

impl Alignment {
    pub const fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Point => Alignment::Right,
            Domain::Line | Domain::Area => Alignment::Center,
        }
    }
}

/// A placed label.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub key: FeatureKey,
    pub text: String,
    pub anchor: LatLon,
    pub position: PixelPoint,
    pub align: Alignment,
}

/// Places labels and throttles camera-driven recomputation.
#[derive(Debug, Clone)]
pub struct LabelDecimator {
    zoom_threshold: f64,
    toggles: LabelToggles,
    throttle: TrailingThrottle<Viewport>,
    labels: Vec<Label>,
}

impl Default for LabelDecimator {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_ZOOM, LabelToggles::default())
    }
}

impl LabelDecimator {
    pub fn new(zoom_threshold: f64, toggles: LabelToggles) -> Self {
        Self {
            zoom_threshold,
            toggles,
            throttle: TrailingThrottle::default(),
            labels: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.throttle = TrailingThrottle::new(window);
        self
    }

    pub fn zoom_threshold(&self) -> f64 {
        self.zoom_threshold
    }

    pub fn toggles(&self) -> LabelToggles {
        self.toggles
    }

    pub fn set_toggles(&mut self, toggles: LabelToggles) {
        self.toggles = toggles;
    }

    /// Current labels.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Recompute immediately and drop any pending camera update.
    pub fn place(&mut self, scene: &Scene, viewport: &Viewport) -> &[Label] {
        self.throttle.flush();
        self.labels = place_labels(scene, viewport, self.zoom_threshold, self.toggles);
        &self.labels
    }

    /// Record a camera change; placement waits for the window to close.
    pub fn viewport_changed(&mut self, viewport: Viewport, now: Instant) {
        self.throttle.push(viewport, now);
    }

    /// Run a throttled placement if one is due. Returns whether labels were
    /// recomputed.
    pub fn poll(&mut self, scene: &Scene, now: Instant) -> bool {
        let coalesced = self.throttle.coalesced();
        let Some(viewport) = self.throttle.poll(now) else {
            return false;
        };
        trace!(coalesced, "label throttle fired");
        self.labels = place_labels(scene, &viewport, self.zoom_threshold, self.toggles);
        true
    }

    /// When the next throttled placement is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }
}

/// One label per eligible feature; empty below `zoom_threshold`.
pub fn place_labels(
    scene: &Scene,
    viewport: &Viewport,
    zoom_threshold: f64,
    toggles: LabelToggles,
) -> Vec<Label> {
    if viewport.zoom() < zoom_threshold {
        return Vec::new();
    }
    let _span = debug_span!("place_labels", zoom = viewport.zoom()).entered();
    let visible = viewport.visible_bounds();
    let mut labels = Vec::new();
    for domain in Domain::ALL {
        if !toggles.shows(domain) {
            continue;
        }
        for key in scene.traverse(domain) {
            let (Some(feature), Some(style)) = (scene.feature(key), scene.style_of(key)) else {
                continue;
            };
            if style.is_dimmed() {
                continue;
            }
            let anchor = feature.anchor();
            if !visible.contains(anchor) {
                continue;
            }
            let align = Alignment::for_domain(domain);
            let mut position = viewport.to_pixel(anchor);
            if align == Alignment::Right {
                position.x += POINT_LABEL_OFFSET;
            }
            labels.push(Label {
                key,
                text: feature.id.clone(),
                anchor,
                position,
                align,
            });
        }
    }
    debug!(labels = labels.len(), "labels placed");
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::{FocusMode, apply_focus};
    use netdiff_model::{FeatureSet, Payload, Projector, classify};
    use netdiff_render::Palette;
    use serde_json::json;

    fn scene() -> Scene {
        let payload = Payload::from_value(json!({
            "geometry": {
                "nodes2": {"J1": [0.0, 0.0], "J2": [0.0005, 0.0], "far": [5.0, 5.0]},
                "links2": {"C1": [[0.0, 0.0], [0.0005, 0.0]]},
                "subs2": {"S1": [[0.0, 0.0], [0.0004, 0.0], [0.0004, 0.0004]]}
            },
            "diffs": {"JUNCTIONS": {"added": {"J2": []}}}
        }))
        .unwrap();
        let set = FeatureSet::build(&payload, &classify(&payload), &Projector::identity());
        Scene::render(set, Palette::DEFAULT)
    }

    fn close_up() -> Viewport {
        Viewport::new(800.0, 600.0).with_center(LatLon::new(0.0001, 0.00025), 18.0)
    }

    fn texts(labels: &[Label]) -> Vec<&str> {
        let mut out: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn nothing_below_threshold() {
        let s = scene();
        let vp = close_up().with_center(LatLon::new(0.0, 0.0), 16.9);
        assert!(place_labels(&s, &vp, DEFAULT_LABEL_ZOOM, LabelToggles::all()).is_empty());
    }

    #[test]
    fn one_label_per_visible_feature() {
        let s = scene();
        let labels = place_labels(&s, &close_up(), DEFAULT_LABEL_ZOOM, LabelToggles::all());
        assert_eq!(texts(&labels), vec!["C1", "J1", "J2", "S1"]);
    }

    #[test]
    fn alignment_by_domain() {
        let s = scene();
        let vp = close_up();
        let labels = place_labels(&s, &vp, DEFAULT_LABEL_ZOOM, LabelToggles::all());
        for l in &labels {
            let expected = if l.text.starts_with('J') {
                Alignment::Right
            } else {
                Alignment::Center
            };
            assert_eq!(l.align, expected, "{}", l.text);
        }
        let j1 = labels.iter().find(|l| l.text == "J1").unwrap();
        let marker = vp.to_pixel(j1.anchor);
        assert!((j1.position.x - marker.x - POINT_LABEL_OFFSET).abs() < 1e-9);
    }

    #[test]
    fn domain_toggles() {
        let s = scene();
        let labels = place_labels(&s, &close_up(), DEFAULT_LABEL_ZOOM, LabelToggles::POINTS);
        assert_eq!(texts(&labels), vec!["J1", "J2"]);
    }

    #[test]
    fn dimmed_features_suppressed() {
        let mut s = scene();
        apply_focus(&mut s, FocusMode::Added);
        let labels = place_labels(&s, &close_up(), DEFAULT_LABEL_ZOOM, LabelToggles::all());
        assert_eq!(texts(&labels), vec!["J2"]);
    }

    #[test]
    fn throttle_collapses_burst() {
        let s = scene();
        let mut d = LabelDecimator::default().with_window(Duration::from_millis(150));
        let t0 = Instant::now();
        d.viewport_changed(close_up().with_center(LatLon::new(0.0, 0.0), 10.0), t0);
        d.viewport_changed(close_up(), t0 + Duration::from_millis(40));
        assert!(!d.poll(&s, t0 + Duration::from_millis(100)));
        assert!(d.labels().is_empty());
        assert!(d.poll(&s, t0 + Duration::from_millis(150)));
        assert_eq!(d.labels().len(), 4);
        assert!(!d.poll(&s, t0 + Duration::from_millis(500)));
    }

    #[test]
    fn toggle_defaults() {
        assert_eq!(LabelToggles::default(), LabelToggles::all());
        assert!(LabelToggles::LINES.shows(Domain::Line));
        assert!(!LabelToggles::LINES.shows(Domain::Area));
    }
}
