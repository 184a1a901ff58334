#![forbid(unsafe_code)]

//! Tracing instrumentation tests.
//!
//! Verifies that the load, click, and label paths emit the spans and events
//! operators rely on when running with `NETDIFF_LOG=debug`.
//!
//!   cargo test -p netdiff-view --test tracing_tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use netdiff_core::geometry::LatLon;
use netdiff_model::Payload;
use netdiff_view::{Viewer, ViewerConfig};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Test Infrastructure
// ============================================================================

/// A captured span with its fields and parent.
#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
    parent_name: Option<String>,
}

/// A captured event with its fields (`message` included).
#[derive(Debug, Clone)]
struct CapturedEvent {
    fields: HashMap<String, String>,
}

/// Layer that records span creation and events.
struct SpanCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

/// Read side of a [`SpanCapture`].
struct CaptureHandle {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl SpanCapture {
    fn new() -> (Self, CaptureHandle) {
        let spans = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let handle = CaptureHandle {
            spans: spans.clone(),
            events: events.clone(),
        };
        (Self { spans, events }, handle)
    }
}

impl CaptureHandle {
    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn named(&self, name: &str) -> Vec<CapturedSpan> {
        self.spans()
            .into_iter()
            .filter(|s| s.name == name)
            .collect()
    }

    fn event_with_message(&self, message: &str) -> Option<CapturedEvent> {
        self.events()
            .into_iter()
            .find(|e| e.fields.get("message").map(String::as_str) == Some(message))
    }
}

/// Visitor that extracts fields as strings.
struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for SpanCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        let parent_name = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span_ref| span_ref.name().to_string());
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
            parent_name,
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured<R>(f: impl FnOnce() -> R) -> (R, CaptureHandle) {
    let (layer, handle) = SpanCapture::new();
    let subscriber = tracing_subscriber::registry().with(layer);
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, handle)
}

fn payload() -> Payload {
    Payload::from_value(json!({
        "geometry": {
            "nodes2": {"J1": [0.0, 0.0], "J5": [0.002, 0.002]},
            "links1": {"C12": [[0.0, 0.0], [0.002, 0.0]]}
        },
        "diffs": {
            "JUNCTIONS": {"added": {"J5": []}},
            "CONDUITS": {"removed": {"C12": []}}
        }
    }))
    .unwrap()
}

fn config() -> ViewerConfig {
    ViewerConfig {
        projection: Some("identity".into()),
        ..ViewerConfig::default()
    }
}

// ============================================================================
// Load path
// ============================================================================

#[test]
fn load_emits_pipeline_spans() {
    let (_viewer, capture) = with_captured(|| Viewer::new(payload(), config()).unwrap());

    let classify = capture.named("classify");
    assert_eq!(classify.len(), 1);
    assert_eq!(classify[0].parent_name.as_deref(), Some("reclassify"));

    let build = capture.named("build_features");
    assert_eq!(build.len(), 1);
    assert_eq!(build[0].fields.get("projection").map(String::as_str), Some("identity"));

    let render: Vec<_> = capture
        .named("render_scene")
        .into_iter()
        .filter(|s| s.parent_name.as_deref() == Some("reclassify"))
        .collect();
    assert_eq!(render.len(), 1);
    assert_eq!(render[0].fields.get("features").map(String::as_str), Some("3"));

    assert_eq!(capture.named("table_build").len(), 1);
}

#[test]
fn scene_rebuild_event_reports_projection() {
    let (_viewer, capture) = with_captured(|| Viewer::new(payload(), config()).unwrap());
    let event = capture
        .event_with_message("scene rebuilt")
        .expect("scene rebuilt event");
    assert_eq!(event.fields.get("features").map(String::as_str), Some("3"));
    assert_eq!(event.fields.get("projection").map(String::as_str), Some("identity"));
}

// ============================================================================
// Interaction path
// ============================================================================

#[test]
fn click_builds_index_once_per_camera() {
    let mut viewer = Viewer::new(payload(), config()).unwrap();
    let p = viewer.viewport().to_pixel(LatLon::new(0.002, 0.002));

    let (_, capture) = with_captured(|| {
        viewer.click(p.x, p.y);
        viewer.click(p.x, p.y);
    });
    assert_eq!(capture.named("hit_index_build").len(), 1);
    assert_eq!(capture.named("hit_test").len(), 2);
    assert!(capture.event_with_message("selected").is_some());
}

#[test]
fn labels_placed_after_fly_to() {
    let mut viewer = Viewer::new(payload(), config()).unwrap();
    let p = viewer.viewport().to_pixel(LatLon::new(0.002, 0.002));
    viewer.click(p.x, p.y);

    let (moved, capture) = with_captured(|| viewer.fly_to_selection());
    assert!(moved);
    let spans = capture.named("place_labels");
    assert_eq!(spans.len(), 1);
    let event = capture
        .event_with_message("labels placed")
        .expect("labels placed event");
    assert!(event.fields.contains_key("labels"));
}
