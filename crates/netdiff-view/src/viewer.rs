#![forbid(unsafe_code)]

//! Viewer orchestration.
//!
//! [`Viewer`] owns one payload and everything derived from it: the
//! classification, the projected scene, the camera, the hit-test snapshot,
//! the selection cycler, labels, legend, and table. It is driven from a
//! single event loop:
//!
//! ```text
//!   Event::Pointer  ─▶ hit test ─▶ cycler ─▶ overlay + SelectionEvent
//!   Event::Viewport ─▶ camera   ─▶ label throttle (placed on tick)
//!   Event::Cycle    ─▶ cycler   ─▶ overlay + SelectionEvent
//!   set_focus       ─▶ restyle  ─▶ legend + labels (synchronous)
//!   set_projection  ─▶ full rebuild
//! ```
//!
//! Selection changes are broadcast as [`SelectionEvent`]s to every
//! subscriber; the table follows them the same way external views do.

use std::sync::mpsc;

use netdiff_core::event::{Event, Modifiers, PointerEvent, PointerEventKind, ViewportEvent};
use netdiff_model::{
    Classification, Domain, FeatureKey, FeatureSet, Payload, Projector, classify, projection,
};
use netdiff_render::canvas::{self, Painter};
use netdiff_render::{HitTester, Overlay, Palette, Scene, Selection, SelectionCycler, Viewport};
use tracing::{debug, info, info_span};
use web_time::Instant;

use crate::config::{ConfigError, ViewerConfig};
use crate::engine::{EngineError, EngineHandle, EnginePoll};
use crate::focus::{FocusMode, Legend, apply_focus};
use crate::labels::{Label, LabelDecimator, LabelToggles};
use crate::table::TableModel;

/// Pixels kept free around fitted content.
pub const FIT_PADDING: f64 = 20.0;

/// Selection change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    Selected(Selection),
    Cleared,
}

/// Fan-out of selection events to independent consumers.
#[derive(Debug, Default)]
pub struct SelectionBus {
    subscribers: Vec<mpsc::Sender<SelectionEvent>>,
}

impl SelectionBus {
    pub fn subscribe(&mut self) -> mpsc::Receiver<SelectionEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Deliver to every live subscriber; dropped receivers are pruned.
    pub fn publish(&mut self, event: &SelectionEvent) {
        self.subscribers
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Active projection: explicit configuration, then the payload's CRS when
/// it is in the catalog, then the default.
fn resolve_projector(config: &ViewerConfig, payload: &Payload) -> Projector {
    if let Some(name) = &config.projection {
        return Projector::by_name(name);
    }
    match payload.crs.as_deref() {
        Some(crs) if projection::lookup(crs).is_some() => Projector::by_name(crs),
        _ => Projector::default(),
    }
}

/// Interactive state over one comparison payload.
#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    payload: Payload,
    classification: Classification,
    projector: Projector,
    scene: Scene,
    viewport: Viewport,
    hit: Option<HitTester>,
    cycler: SelectionCycler,
    selection: Option<Selection>,
    labels: LabelDecimator,
    legend: Legend,
    table: TableModel,
    bus: SelectionBus,
}

impl Viewer {
    /// Build every view of `payload` on an 800 × 600 surface.
    pub fn new(payload: Payload, config: ViewerConfig) -> Result<Self, ConfigError> {
        Self::with_surface(payload, config, Viewport::default())
    }

    /// Build on a caller-sized camera; the camera is refitted to the data.
    pub fn with_surface(
        payload: Payload,
        config: ViewerConfig,
        viewport: Viewport,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let labels =
            LabelDecimator::new(config.label_zoom, config.labels).with_window(config.label_window());
        let scene = Scene::render(FeatureSet::default(), Palette::DEFAULT);
        let mut viewer = Self {
            projector: resolve_projector(&config, &payload),
            classification: Classification::default(),
            legend: Legend::from_scene(&scene, config.focus),
            scene,
            table: TableModel::default(),
            viewport,
            hit: None,
            cycler: SelectionCycler::new(),
            selection: None,
            labels,
            bus: SelectionBus::default(),
            payload,
            config,
        };
        viewer.reclassify();
        Ok(viewer)
    }

    // ── Rebuilds ────────────────────────────────────────────────────────

    /// Replace the payload and rebuild everything.
    pub fn load(&mut self, payload: Payload) {
        self.payload = payload;
        if self.config.projection.is_none() {
            self.projector = resolve_projector(&self.config, &self.payload);
        }
        self.reclassify();
    }

    /// Switch projection; every display coordinate is recomputed. Unknown
    /// names fall back to the identity transform.
    pub fn set_projection(&mut self, name: &str) {
        self.config.projection = Some(name.to_string());
        self.projector = Projector::by_name(name);
        self.rebuild_scene();
    }

    fn reclassify(&mut self) {
        let _span = info_span!("reclassify").entered();
        self.classification = classify(&self.payload);
        self.table = TableModel::build(&self.payload, &self.classification);
        self.rebuild_scene();
    }

    fn rebuild_scene(&mut self) {
        let features = FeatureSet::build(&self.payload, &self.classification, &self.projector);
        info!(
            features = features.len(),
            projection = self.projector.name(),
            "scene rebuilt"
        );
        self.scene = Scene::render(features, Palette::DEFAULT);
        apply_focus(&mut self.scene, self.config.focus);
        self.legend = Legend::from_scene(&self.scene, self.config.focus);
        self.cycler.reset();
        self.set_selection(None);
        self.fit();
    }

    // ── Configuration surface ───────────────────────────────────────────

    /// Switch focus; legend and labels follow immediately.
    pub fn set_focus(&mut self, mode: FocusMode) {
        self.config.focus = mode;
        apply_focus(&mut self.scene, mode);
        self.legend = Legend::from_scene(&self.scene, mode);
        self.hit = None;
        self.place_labels();
    }

    pub fn set_label_toggles(&mut self, toggles: LabelToggles) {
        self.config.labels = toggles;
        self.labels.set_toggles(toggles);
        self.place_labels();
    }

    pub fn set_domain_visible(&mut self, domain: Domain, visible: bool) {
        self.scene.set_domain_visible(domain, visible);
        self.hit = None;
        self.place_labels();
    }

    // ── Camera ──────────────────────────────────────────────────────────

    /// Fit the camera to everything plotted.
    pub fn fit(&mut self) {
        self.viewport.fit(&self.scene.bounds(), FIT_PADDING);
        self.hit = None;
        self.place_labels();
    }

    /// Move the camera onto the selected feature, close enough for labels.
    pub fn fly_to_selection(&mut self) -> bool {
        let Some(selection) = &self.selection else {
            return false;
        };
        self.viewport
            .fly_to(&selection.bounds, FIT_PADDING, self.config.label_zoom);
        self.hit = None;
        self.place_labels();
        true
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Dispatch one input event.
    pub fn handle(&mut self, event: Event, now: Instant) {
        match event {
            Event::Pointer(pointer) => self.pointer(pointer),
            Event::Viewport(change) => self.camera(change, now),
            Event::Cycle(direction) => {
                let picked = self.cycler.cycle(direction);
                self.set_selection(picked);
            }
        }
    }

    /// Run a throttled label pass if one is due.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.labels.poll(&self.scene, now)
    }

    /// Poll a running engine; rebuilds when the payload arrives.
    pub fn poll_engine(&mut self, handle: &mut EngineHandle) -> Result<bool, EngineError> {
        match handle.poll() {
            EnginePoll::Done(payload) => {
                self.load(payload);
                Ok(true)
            }
            EnginePoll::Failed(err) => Err(err),
            EnginePoll::Pending | EnginePoll::Progress { .. } => Ok(false),
        }
    }

    /// Convenience for a fresh click at `(x, y)`.
    pub fn click(&mut self, x: f64, y: f64) -> Option<&Selection> {
        self.click_with(x, y, Modifiers::NONE)
    }

    /// Fresh click with modifier keys held; shift cycles backward.
    pub fn click_with(&mut self, x: f64, y: f64, modifiers: Modifiers) -> Option<&Selection> {
        self.pointer(PointerEvent::click(x, y).with_modifiers(modifiers));
        self.selection.as_ref()
    }

    fn pointer(&mut self, pointer: PointerEvent) {
        let candidates = match pointer.kind {
            PointerEventKind::Click => self.hit_tester().hit_test(pointer.position),
            PointerEventKind::DragEnd => Vec::new(),
            PointerEventKind::Moved => return,
        };
        let picked = self.cycler.select_toward(
            pointer.position,
            candidates,
            pointer.is_fresh_click(),
            pointer.cycle_direction(),
        );
        self.set_selection(picked);
    }

    fn camera(&mut self, change: ViewportEvent, now: Instant) {
        match change {
            ViewportEvent::Pan { dx, dy } => self.viewport.pan(dx, dy),
            ViewportEvent::Zoom { zoom, anchor } => self.viewport.zoom_to(zoom, anchor),
            ViewportEvent::Resize { width, height } => self.viewport.resize(width, height),
        }
        self.hit = None;
        self.labels.viewport_changed(self.viewport, now);
    }

    fn hit_tester(&mut self) -> &HitTester {
        let (scene, viewport, tolerance) = (&self.scene, &self.viewport, self.config.hit_tolerance);
        self.hit
            .get_or_insert_with(|| HitTester::build(scene, viewport, tolerance))
    }

    fn set_selection(&mut self, picked: Option<FeatureKey>) {
        let next = picked.and_then(|key| {
            let feature = self.scene.feature(key)?;
            Some(Selection::describe(
                key,
                feature,
                self.cycler.index(),
                self.cycler.candidates().len(),
            ))
        });
        if next == self.selection {
            return;
        }
        let event = match &next {
            Some(selection) => {
                if let Some(feature) = self.scene.feature(selection.key) {
                    let overlay = Overlay::for_feature(selection.key, feature, self.scene.palette());
                    self.scene.set_overlay(overlay);
                }
                debug!(id = %selection.id, domain = %selection.domain, status = %selection.status, "selected");
                SelectionEvent::Selected(selection.clone())
            }
            None => {
                self.scene.clear_overlay();
                SelectionEvent::Cleared
            }
        };
        self.selection = next;
        self.table.on_selection(&event);
        self.bus.publish(&event);
    }

    fn place_labels(&mut self) {
        self.labels.place(&self.scene, &self.viewport);
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn subscribe(&mut self) -> mpsc::Receiver<SelectionEvent> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn projection(&self) -> &str {
        self.projector.name()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn focus(&self) -> FocusMode {
        self.config.focus
    }

    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    pub fn labels(&self) -> &[Label] {
        self.labels.labels()
    }

    pub fn table(&self) -> &TableModel {
        &self.table
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Key of a feature by domain and ID.
    pub fn find(&self, domain: Domain, id: &str) -> Option<FeatureKey> {
        self.scene.features().find(domain, id)
    }

    /// Braille preview of the whole scene at the configured size.
    pub fn preview(&self, ansi: bool) -> String {
        let mut painter = Painter::for_cells(self.config.preview.cols, self.config.preview.rows);
        let viewport = canvas::fitted_viewport(&painter, &self.scene, 2.0);
        canvas::paint_scene(&mut painter, &self.scene, &viewport);
        if ansi {
            painter.to_ansi()
        } else {
            painter.to_text()
        }
    }
}
