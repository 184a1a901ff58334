#![forbid(unsafe_code)]

//! Layered scene.
//!
//! The scene owns the feature arena and its layer assignment. Each domain
//! has one layer with four status sub-layers; domains always draw areas,
//! then lines, then points, with the selection overlay on top.
//!
//! ```text
//!   overlay            ← selection outline
//!   point  [added, changed, removed, unchanged]   (top → bottom, default)
//!   line   [...]
//!   area   [...]
//! ```
//!
//! Sub-layer stacking inside a domain can be changed with
//! [`Scene::bring_to_front`]; styling with [`Scene::restyle`]. Neither
//! touches feature identity or classification.

use netdiff_core::geometry::Bounds;
use netdiff_model::{Domain, Feature, FeatureKey, FeatureSet, Status};
use tracing::{debug, debug_span};

use crate::selection::Overlay;
use crate::style::{FeatureStyle, Palette, Rgba, Shape};

/// Paint shared by every feature of a sub-layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    pub color: Rgba,
    pub opacity: f32,
}

/// One status sub-layer of a domain layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SubLayer {
    pub status: Status,
    pub style: LayerStyle,
    pub visible: bool,
    keys: Vec<FeatureKey>,
}

impl SubLayer {
    /// Features in feature order.
    pub fn keys(&self) -> &[FeatureKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// All sub-layers of one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainLayer {
    pub domain: Domain,
    pub visible: bool,
    sublayers: [SubLayer; 4],
    /// Bottom → top.
    stack: [Status; 4],
}

impl DomainLayer {
    pub fn sublayer(&self, status: Status) -> &SubLayer {
        &self.sublayers[status.index()]
    }

    /// Statuses bottom → top.
    pub fn stack(&self) -> [Status; 4] {
        self.stack
    }

    /// Sub-layers bottom → top.
    pub fn bottom_up(&self) -> impl Iterator<Item = &SubLayer> {
        self.stack.iter().map(|s| &self.sublayers[s.index()])
    }

    /// Sub-layers front-most first.
    pub fn front_to_back(&self) -> impl Iterator<Item = &SubLayer> {
        self.stack.iter().rev().map(|s| &self.sublayers[s.index()])
    }

    /// Whether features of `status` are currently drawn.
    pub fn is_drawn(&self, status: Status) -> bool {
        self.visible && self.sublayers[status.index()].visible
    }
}

/// Default stacking, bottom → top.
pub const DEFAULT_STACK: [Status; 4] = Status::ALL;

/// Rendered scene: features, layer assignment, styling, overlay.
#[derive(Debug, Clone)]
pub struct Scene {
    features: FeatureSet,
    palette: Palette,
    layers: [DomainLayer; 3],
    overlay: Option<Overlay>,
}

impl Scene {
    /// Assign every feature to its (domain, status) sub-layer with the
    /// default palette styling.
    pub fn render(features: FeatureSet, palette: Palette) -> Self {
        let _span = debug_span!("render_scene", features = features.len()).entered();
        let layers = Domain::ALL.map(|domain| DomainLayer {
            domain,
            visible: true,
            sublayers: Status::ALL.map(|status| SubLayer {
                status,
                style: LayerStyle {
                    color: palette.color(status),
                    opacity: 1.0,
                },
                visible: true,
                keys: features.keys(domain, status).to_vec(),
            }),
            stack: DEFAULT_STACK,
        });
        for layer in &layers {
            debug!(
                domain = %layer.domain,
                added = layer.sublayer(Status::Added).len(),
                removed = layer.sublayer(Status::Removed).len(),
                changed = layer.sublayer(Status::Changed).len(),
                unchanged = layer.sublayer(Status::Unchanged).len(),
                "layer assigned"
            );
        }
        Self {
            features,
            palette,
            layers,
            overlay: None,
        }
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn feature(&self, key: FeatureKey) -> Option<&Feature> {
        self.features.get(key)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn layer(&self, domain: Domain) -> &DomainLayer {
        &self.layers[domain.index()]
    }

    pub fn sublayer(&self, domain: Domain, status: Status) -> &SubLayer {
        self.layer(domain).sublayer(status)
    }

    /// Resolved style of a feature.
    pub fn style_of(&self, key: FeatureKey) -> Option<FeatureStyle> {
        let feature = self.features.get(key)?;
        let style = self.sublayer(feature.domain, feature.status).style;
        Some(FeatureStyle {
            color: style.color,
            opacity: style.opacity,
            shape: Shape::for_feature(feature.domain, feature.subtype),
        })
    }

    /// Whether the feature's layer is drawn (dimmed features still are).
    pub fn is_visible(&self, key: FeatureKey) -> bool {
        self.features
            .get(key)
            .is_some_and(|f| self.layer(f.domain).is_drawn(f.status))
    }

    /// Sub-layers in paint order: areas, lines, points; each bottom → top.
    pub fn draw_order(&self) -> impl Iterator<Item = (Domain, &SubLayer)> {
        self.layers
            .iter()
            .flat_map(|layer| layer.bottom_up().map(move |s| (layer.domain, s)))
    }

    /// Visible features of `domain`, front-most sub-layer first.
    pub fn traverse(&self, domain: Domain) -> impl Iterator<Item = FeatureKey> + '_ {
        let layer = self.layer(domain);
        layer
            .front_to_back()
            .filter(move |s| layer.visible && s.visible)
            .flat_map(|s| s.keys.iter().copied())
    }

    /// Bounding box over every plotted coordinate of both snapshots.
    pub fn bounds(&self) -> Bounds {
        self.features.bounds()
    }

    // ── Mutation of presentation only ───────────────────────────────────

    /// Replace the style of one sub-layer in every domain.
    pub fn restyle(&mut self, status: Status, color: Rgba, opacity: f32) {
        for layer in &mut self.layers {
            layer.sublayers[status.index()].style = LayerStyle {
                color,
                opacity: opacity.clamp(0.0, 1.0),
            };
        }
    }

    /// Restore palette colors at full opacity.
    pub fn reset_styles(&mut self) {
        for status in Status::ALL {
            self.restyle(status, self.palette.color(status), 1.0);
        }
    }

    /// Move `status` to the top of every domain's stack.
    pub fn bring_to_front(&mut self, status: Status) {
        for layer in &mut self.layers {
            let mut stack: Vec<Status> = layer.stack.iter().copied().filter(|s| *s != status).collect();
            stack.push(status);
            for (slot, s) in layer.stack.iter_mut().zip(stack) {
                *slot = s;
            }
        }
    }

    /// Restore the default stacking.
    pub fn reset_stacking(&mut self) {
        for layer in &mut self.layers {
            layer.stack = DEFAULT_STACK;
        }
    }

    pub fn set_domain_visible(&mut self, domain: Domain, visible: bool) {
        self.layers[domain.index()].visible = visible;
    }

    pub fn set_sublayer_visible(&mut self, domain: Domain, status: Status, visible: bool) {
        self.layers[domain.index()].sublayers[status.index()].visible = visible;
    }

    // ── Overlay ─────────────────────────────────────────────────────────

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn set_overlay(&mut self, overlay: Overlay) {
        self.overlay = Some(overlay);
    }

    pub fn clear_overlay(&mut self) {
        self.overlay = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdiff_model::{Payload, Projector, classify};
    use serde_json::json;

    fn scene() -> Scene {
        let payload = Payload::from_value(json!({
            "geometry": {
                "nodes1": {"A": [0, 0], "R": [1, 1]},
                "nodes2": {"A": [0, 0], "N": [2, 2], "C": [3, 3]},
                "subs2": {"S": [[0, 0], [4, 0], [4, 4]]}
            },
            "diffs": {"JUNCTIONS": {
                "added": {"N": []}, "removed": {"R": []}, "changed": {"C": [[], []]}
            }}
        }))
        .unwrap();
        let c = classify(&payload);
        Scene::render(
            FeatureSet::build(&payload, &c, &Projector::identity()),
            Palette::default(),
        )
    }

    fn key(scene: &Scene, domain: Domain, id: &str) -> FeatureKey {
        scene.features().find(domain, id).unwrap()
    }

    #[test]
    fn features_land_in_status_sublayers() {
        let s = scene();
        assert_eq!(s.sublayer(Domain::Point, Status::Added).len(), 1);
        assert_eq!(s.sublayer(Domain::Point, Status::Removed).len(), 1);
        assert_eq!(s.sublayer(Domain::Point, Status::Changed).len(), 1);
        assert_eq!(s.sublayer(Domain::Point, Status::Unchanged).len(), 1);
        assert_eq!(s.sublayer(Domain::Area, Status::Unchanged).len(), 1);
    }

    #[test]
    fn style_follows_palette() {
        let s = scene();
        let style = s.style_of(key(&s, Domain::Point, "N")).unwrap();
        assert_eq!(style.color, Palette::DEFAULT.added);
        assert_eq!(style.opacity, 1.0);
        assert_eq!(style.shape, Shape::Circle);
    }

    #[test]
    fn draw_order_areas_lines_points() {
        let s = scene();
        let domains: Vec<Domain> = s.draw_order().map(|(d, _)| d).collect();
        assert_eq!(&domains[0..4], &[Domain::Area; 4]);
        assert_eq!(&domains[4..8], &[Domain::Line; 4]);
        assert_eq!(&domains[8..12], &[Domain::Point; 4]);
        let statuses: Vec<Status> = s.draw_order().take(4).map(|(_, l)| l.status).collect();
        assert_eq!(statuses, DEFAULT_STACK.to_vec());
    }

    #[test]
    fn bring_to_front_moves_status_on_top() {
        let mut s = scene();
        s.bring_to_front(Status::Removed);
        assert_eq!(
            s.layer(Domain::Point).stack(),
            [Status::Unchanged, Status::Changed, Status::Added, Status::Removed]
        );
        let first = s.traverse(Domain::Point).next().unwrap();
        assert_eq!(s.feature(first).unwrap().id, "R");
        s.reset_stacking();
        assert_eq!(s.layer(Domain::Point).stack(), DEFAULT_STACK);
    }

    #[test]
    fn traverse_skips_hidden_sublayers() {
        let mut s = scene();
        s.set_sublayer_visible(Domain::Point, Status::Added, false);
        let ids: Vec<String> = s
            .traverse(Domain::Point)
            .map(|k| s.feature(k).unwrap().id.clone())
            .collect();
        assert_eq!(ids, vec!["C", "R", "A"]);
        assert!(!s.is_visible(key(&s, Domain::Point, "N")));

        s.set_domain_visible(Domain::Point, false);
        assert_eq!(s.traverse(Domain::Point).count(), 0);
    }

    #[test]
    fn restyle_and_reset() {
        let mut s = scene();
        s.restyle(Status::Changed, Palette::DEFAULT.unchanged, 0.35);
        let style = s.style_of(key(&s, Domain::Point, "C")).unwrap();
        assert!(style.is_dimmed());
        assert_eq!(style.color, Palette::DEFAULT.unchanged);
        s.reset_styles();
        let style = s.style_of(key(&s, Domain::Point, "C")).unwrap();
        assert!(!style.is_dimmed());
        assert_eq!(style.color, Palette::DEFAULT.changed);
    }

    #[test]
    fn bounds_cover_both_snapshots() {
        let s = scene();
        let b = s.bounds();
        assert_eq!((b.south, b.west, b.north, b.east), (0.0, 0.0, 4.0, 4.0));
    }
}
