#![forbid(unsafe_code)]

//! Canonical input events for the map view.
//!
//! Pointer coordinates are device pixels with the origin at the top-left
//! corner of the map surface. Viewport events carry the *result* of a camera
//! move so that consumers never need to replay deltas.

use bitflags::bitflags;

use crate::geometry::PixelPoint;

/// Input event delivered to the viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A pointer interaction on the map surface.
    Pointer(PointerEvent),

    /// The camera moved or the surface was resized.
    Viewport(ViewportEvent),

    /// Explicit selection cycling without a new hit test.
    Cycle(CycleDirection),
}

/// A pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub position: PixelPoint,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    #[must_use]
    pub const fn new(kind: PointerEventKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            position: PixelPoint::new(x, y),
            modifiers: Modifiers::NONE,
        }
    }

    /// Shorthand for a primary-button click.
    #[must_use]
    pub const fn click(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Click, x, y)
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Cycling direction for repeated clicks: shift steps backward.
    #[inline]
    pub fn cycle_direction(&self) -> CycleDirection {
        if self.modifiers.contains(Modifiers::SHIFT) {
            CycleDirection::Previous
        } else {
            CycleDirection::Next
        }
    }

    /// A click that starts a new hit test (as opposed to a drag end).
    #[inline]
    pub fn is_fresh_click(&self) -> bool {
        matches!(self.kind, PointerEventKind::Click)
    }
}

/// Kind of pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    /// Primary button pressed and released without movement.
    Click,
    /// Pointer moved without buttons (hover).
    Moved,
    /// Drag finished; never triggers a hit test.
    DragEnd,
}

bitflags! {
    /// Modifier keys held during a pointer event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const NONE  = 0b0000;
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// Camera change notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    /// Camera panned by a pixel delta.
    Pan { dx: f64, dy: f64 },
    /// Zoom changed to `zoom` around a pixel anchor.
    Zoom { zoom: f64, anchor: PixelPoint },
    /// Map surface resized.
    Resize { width: f64, height: f64 },
}

/// Direction for explicit selection cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleDirection {
    Next,
    Previous,
}

impl CycleDirection {
    /// Signed step applied to the candidate index.
    #[inline]
    pub const fn step(self) -> isize {
        match self {
            Self::Next => 1,
            Self::Previous => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_is_fresh() {
        assert!(PointerEvent::click(1.0, 2.0).is_fresh_click());
        assert!(!PointerEvent::new(PointerEventKind::DragEnd, 1.0, 2.0).is_fresh_click());
        assert!(!PointerEvent::new(PointerEventKind::Moved, 1.0, 2.0).is_fresh_click());
    }

    #[test]
    fn modifiers_combine() {
        let ev = PointerEvent::click(0.0, 0.0).with_modifiers(Modifiers::SHIFT | Modifiers::CTRL);
        assert!(ev.modifiers.contains(Modifiers::SHIFT));
        assert!(!ev.modifiers.contains(Modifiers::ALT));
    }

    #[test]
    fn shift_reverses_cycling() {
        let plain = PointerEvent::click(0.0, 0.0);
        assert_eq!(plain.cycle_direction(), CycleDirection::Next);
        let shifted = plain.with_modifiers(Modifiers::SHIFT | Modifiers::ALT);
        assert_eq!(shifted.cycle_direction(), CycleDirection::Previous);
        let ctrl = plain.with_modifiers(Modifiers::CTRL);
        assert_eq!(ctrl.cycle_direction(), CycleDirection::Next);
    }

    #[test]
    fn cycle_steps() {
        assert_eq!(CycleDirection::Next.step(), 1);
        assert_eq!(CycleDirection::Previous.step(), -1);
    }
}
