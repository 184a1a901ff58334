#![forbid(unsafe_code)]

//! Focus modes and the legend.
//!
//! A focus mode highlights one change kind. The focused status keeps its
//! accent color at full opacity and moves to the top of every domain's
//! stack; every other status is recolored neutral and dimmed. Nothing is
//! removed from the scene, so dimmed features remain hit-testable.
//!
//! The [`Legend`] is derived from the scene after every mode change and
//! therefore always matches what is drawn.

use std::fmt;
use std::str::FromStr;

use netdiff_model::{Domain, Status};
use netdiff_render::{DIM_OPACITY, Rgba, Scene};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which change kind is emphasized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusMode {
    /// Normal palette, full opacity, default stacking.
    #[default]
    Default,
    Added,
    Removed,
    Changed,
}

impl FocusMode {
    pub const ALL: [FocusMode; 4] = [
        FocusMode::Default,
        FocusMode::Added,
        FocusMode::Removed,
        FocusMode::Changed,
    ];

    /// Status emphasized by this mode.
    pub const fn focused(self) -> Option<Status> {
        match self {
            FocusMode::Default => None,
            FocusMode::Added => Some(Status::Added),
            FocusMode::Removed => Some(Status::Removed),
            FocusMode::Changed => Some(Status::Changed),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FocusMode::Default => "default",
            FocusMode::Added => "added",
            FocusMode::Removed => "removed",
            FocusMode::Changed => "changed",
        }
    }
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized focus mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown focus mode `{0}` (expected default, added, removed, or changed)")]
pub struct UnknownFocusMode(pub String);

impl FromStr for FocusMode {
    type Err = UnknownFocusMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FocusMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownFocusMode(s.to_string()))
    }
}

/// Restyle and restack `scene` for `mode`.
pub fn apply_focus(scene: &mut Scene, mode: FocusMode) {
    scene.reset_styles();
    scene.reset_stacking();
    let Some(focused) = mode.focused() else {
        debug!(%mode, "focus cleared");
        return;
    };
    let neutral = scene.palette().neutral();
    for status in Status::ALL {
        if status != focused {
            scene.restyle(status, neutral, DIM_OPACITY);
        }
    }
    scene.bring_to_front(focused);
    debug!(%mode, "focus applied");
}

/// One legend row.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub status: Status,
    pub color: Rgba,
    pub opacity: f32,
    /// Features of this status across all domains.
    pub count: usize,
    /// Whether this row is the focused status.
    pub emphasized: bool,
}

impl LegendEntry {
    pub fn is_dimmed(&self) -> bool {
        self.opacity < 1.0
    }
}

/// Legend mirroring the scene's current sub-layer styling.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub mode: FocusMode,
    /// Top → bottom in the order features stack.
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn from_scene(scene: &Scene, mode: FocusMode) -> Self {
        // Every domain shares the same stack and styles; read the point layer.
        let layer = scene.layer(Domain::Point);
        let entries = layer
            .front_to_back()
            .map(|sub| LegendEntry {
                status: sub.status,
                color: sub.style.color,
                opacity: sub.style.opacity,
                count: Domain::ALL
                    .iter()
                    .map(|d| scene.sublayer(*d, sub.status).len())
                    .sum(),
                emphasized: mode.focused() == Some(sub.status),
            })
            .collect();
        Self { mode, entries }
    }

    pub fn entry(&self, status: Status) -> Option<&LegendEntry> {
        self.entries.iter().find(|e| e.status == status)
    }
}

impl fmt::Display for Legend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "focus: {}", self.mode)?;
        for e in &self.entries {
            let marker = if e.emphasized { '*' } else { ' ' };
            write!(f, "{marker} {:<9} {:>6}  {}", e.status.as_str(), e.count, e.color)?;
            if e.is_dimmed() {
                write!(f, " (dim)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
