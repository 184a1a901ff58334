#![forbid(unsafe_code)]

//! Viewer configuration.
//!
//! Values are layered: defaults, then an optional serde document supplied by
//! an embedding host, then `NETDIFF_*` environment variables, then whatever
//! the caller sets explicitly (CLI flags). Every layer is validated the same
//! way. Projection names are the exception: an unknown name resolves to the
//! identity transform with a warning when the viewer builds its projector.
//!
//! | Variable                | Field           | Example            |
//! |-------------------------|-----------------|--------------------|
//! | `NETDIFF_PROJECTION`    | `projection`    | `EPSG:3733`        |
//! | `NETDIFF_FOCUS`         | `focus`         | `added`            |
//! | `NETDIFF_LABELS`        | `labels`        | `point,line`       |
//! | `NETDIFF_HIT_TOLERANCE` | `hit_tolerance` | `12`               |
//! | `NETDIFF_LABEL_ZOOM`    | `label_zoom`    | `16.5`             |

use std::time::Duration;

use netdiff_core::throttle::DEFAULT_WINDOW;
use netdiff_model::Domain;
use netdiff_render::hit_test::DEFAULT_TOLERANCE;
use netdiff_render::viewport::{MAX_ZOOM, MIN_ZOOM};
use serde::{Deserialize, Deserializer};

use crate::focus::{FocusMode, UnknownFocusMode};
use crate::labels::{DEFAULT_LABEL_ZOOM, LabelToggles};

pub const PROJECTION_ENV: &str = "NETDIFF_PROJECTION";
pub const FOCUS_ENV: &str = "NETDIFF_FOCUS";
pub const LABELS_ENV: &str = "NETDIFF_LABELS";
pub const HIT_TOLERANCE_ENV: &str = "NETDIFF_HIT_TOLERANCE";
pub const LABEL_ZOOM_ENV: &str = "NETDIFF_LABEL_ZOOM";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Focus(#[from] UnknownFocusMode),

    #[error("unknown label domain `{0}` (expected point, line, area, all, or none)")]
    UnknownDomain(String),

    #[error("{field}: `{value}` is not a number")]
    NotANumber { field: &'static str, value: String },

    #[error("{field}: {value} is out of range ({expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// Size of the braille preview in text cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreviewSize {
    pub cols: u16,
    pub rows: u16,
}

impl Default for PreviewSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// Runtime-switchable viewer settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Projection name; `None` follows the payload's CRS, then the default.
    pub projection: Option<String>,
    pub focus: FocusMode,
    #[serde(deserialize_with = "toggles_from_domains")]
    pub labels: LabelToggles,
    /// Pointer tolerance in device pixels.
    pub hit_tolerance: f64,
    /// Zoom level at which labels appear.
    pub label_zoom: f64,
    /// Trailing throttle window for label placement, in milliseconds.
    pub label_throttle_ms: u64,
    pub preview: PreviewSize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            projection: None,
            focus: FocusMode::Default,
            labels: LabelToggles::all(),
            hit_tolerance: DEFAULT_TOLERANCE,
            label_zoom: DEFAULT_LABEL_ZOOM,
            label_throttle_ms: DEFAULT_WINDOW.as_millis() as u64,
            preview: PreviewSize::default(),
        }
    }
}

fn toggles_from_domains<'de, D>(deserializer: D) -> Result<LabelToggles, D::Error>
where
    D: Deserializer<'de>,
{
    let domains = Vec::<Domain>::deserialize(deserializer)?;
    Ok(domains
        .into_iter()
        .fold(LabelToggles::empty(), |acc, d| acc | LabelToggles::for_domain(d)))
}

/// Parse `point,line`, `all`, or `none`.
pub fn parse_label_toggles(s: &str) -> Result<LabelToggles, ConfigError> {
    let mut toggles = LabelToggles::empty();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        toggles |= match part.to_ascii_lowercase().as_str() {
            "all" => LabelToggles::all(),
            "none" => LabelToggles::empty(),
            "point" | "points" => LabelToggles::POINTS,
            "line" | "lines" => LabelToggles::LINES,
            "area" | "areas" => LabelToggles::AREAS,
            _ => return Err(ConfigError::UnknownDomain(part.to_string())),
        };
    }
    Ok(toggles)
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::NotANumber {
        field,
        value: value.to_string(),
    })
}

impl ViewerConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay `NETDIFF_*` values produced by `lookup`, then validate.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(name) = lookup(PROJECTION_ENV) {
            self.projection = Some(name);
        }
        if let Some(focus) = lookup(FOCUS_ENV) {
            self.focus = focus.parse()?;
        }
        if let Some(labels) = lookup(LABELS_ENV) {
            self.labels = parse_label_toggles(&labels)?;
        }
        if let Some(tol) = lookup(HIT_TOLERANCE_ENV) {
            self.hit_tolerance = parse_number("hit_tolerance", &tol)?;
        }
        if let Some(zoom) = lookup(LABEL_ZOOM_ENV) {
            self.label_zoom = parse_number("label_zoom", &zoom)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.hit_tolerance.is_finite() && self.hit_tolerance > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "hit_tolerance",
                value: self.hit_tolerance,
                expected: "> 0",
            });
        }
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.label_zoom) {
            return Err(ConfigError::OutOfRange {
                field: "label_zoom",
                value: self.label_zoom,
                expected: "0 to 22",
            });
        }
        Ok(())
    }

    pub fn label_window(&self) -> Duration {
        Duration::from_millis(self.label_throttle_ms)
    }
}
