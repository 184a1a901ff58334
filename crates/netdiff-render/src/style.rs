#![forbid(unsafe_code)]

//! Colors, palette, and marker shapes.

use std::fmt;

use netdiff_model::{Domain, Status};

/// Straight-alpha RGBA packed as `0xRRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct Rgba(pub u32);

impl Rgba {
    pub const TRANSPARENT: Self = Self(0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32))
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn a(self) -> u8 {
        self.0 as u8
    }

    /// Scale alpha by `opacity` in `[0.0, 1.0]`.
    #[inline]
    pub fn with_opacity(self, opacity: f32) -> Self {
        let opacity = opacity.clamp(0.0, 1.0);
        let a = ((self.a() as f32) * opacity).round().clamp(0.0, 255.0) as u8;
        Self::rgba(self.r(), self.g(), self.b(), a)
    }
}

impl fmt::Display for Rgba {
    /// `#rrggbb`, with `aa` appended when not opaque.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())?;
        if self.a() != 255 {
            write!(f, "{:02x}", self.a())?;
        }
        Ok(())
    }
}

/// Opacity applied to dimmed sub-layers.
pub const DIM_OPACITY: f32 = 0.35;

/// Status colors: one neutral plus one accent per change kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub added: Rgba,
    pub removed: Rgba,
    pub changed: Rgba,
    pub unchanged: Rgba,
    /// High-contrast outline for the selection overlay.
    pub selection: Rgba,
}

impl Palette {
    pub const DEFAULT: Self = Self {
        added: Rgba::rgb(46, 204, 113),
        removed: Rgba::rgb(231, 76, 60),
        changed: Rgba::rgb(241, 196, 15),
        unchanged: Rgba::rgb(100, 100, 100),
        selection: Rgba::rgb(0, 229, 255),
    };

    pub const fn color(&self, status: Status) -> Rgba {
        match status {
            Status::Added => self.added,
            Status::Removed => self.removed,
            Status::Changed => self.changed,
            Status::Unchanged => self.unchanged,
        }
    }

    #[inline]
    pub const fn neutral(&self) -> Rgba {
        self.unchanged
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How a feature is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Circle,
    Square,
    TriangleUp,
    Diamond,
    Polyline,
    Polygon,
}

impl Shape {
    /// Shape for a feature of `domain` in section `subtype`.
    pub fn for_feature(domain: Domain, subtype: Option<&str>) -> Shape {
        match domain {
            Domain::Line => Shape::Polyline,
            Domain::Area => Shape::Polygon,
            Domain::Point => match subtype {
                Some("STORAGE") => Shape::Square,
                Some("OUTFALLS") => Shape::TriangleUp,
                Some("DIVIDERS") => Shape::Diamond,
                _ => Shape::Circle,
            },
        }
    }

    pub const fn is_marker(self) -> bool {
        matches!(
            self,
            Shape::Circle | Shape::Square | Shape::TriangleUp | Shape::Diamond
        )
    }
}

/// Resolved paint for one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStyle {
    pub color: Rgba,
    pub opacity: f32,
    pub shape: Shape,
}

impl FeatureStyle {
    #[inline]
    pub fn is_dimmed(&self) -> bool {
        self.opacity < 1.0
    }

    /// Color with opacity folded into alpha.
    #[inline]
    pub fn paint(&self) -> Rgba {
        self.color.with_opacity(self.opacity)
    }
}
