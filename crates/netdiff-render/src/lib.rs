#![forbid(unsafe_code)]

//! Drawing and interaction over a classified feature set.
//!
//! # Role in netdiff
//! `netdiff-render` turns a [`FeatureSet`](netdiff_model::FeatureSet) into a
//! layered [`Scene`](scene::Scene), places it under a web-mercator
//! [`Viewport`](viewport::Viewport), and resolves pointer positions into
//! ordered candidates that a [`SelectionCycler`](selection::SelectionCycler)
//! steps through.
//!
//! # Key modules
//! - [`style`]: palette, opacity, marker shapes
//! - [`scene`]: domain layers with status sub-layers and the overlay slot
//! - [`viewport`]: camera math, fit/pan/zoom
//! - [`hit_index`] and [`hit_test`]: bucket pruning plus exact tests
//! - [`selection`]: click cycling, overlay, selection records
//! - [`canvas`]: braille preview

pub mod canvas;
pub mod hit_index;
pub mod scene;
pub mod selection;
pub mod style;
pub mod viewport;

pub use hit_test::HitTester;
pub use scene::Scene;
pub use selection::{Overlay, Selection, SelectionCycler};
pub use style::{DIM_OPACITY, FeatureStyle, Palette, Rgba, Shape};
pub use viewport::Viewport;
