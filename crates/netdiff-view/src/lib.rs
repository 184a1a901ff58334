#![forbid(unsafe_code)]

//! Interactive views over a comparison payload.
//!
//! # Role in netdiff
//! `netdiff-view` ties the model and the scene together into a single
//! [`Viewer`]: it applies focus modes and keeps the legend in step, places
//! zoom-gated labels behind a trailing throttle, maintains the tabular
//! view, and broadcasts selection changes to subscribers. Payloads may be
//! produced off-thread by a [`DiffEngine`](engine::DiffEngine).
//!
//! # Key modules
//! - [`config`]: layered viewer settings
//! - [`focus`]: focus modes and the legend
//! - [`labels`]: label placement and throttling
//! - [`table`]: per-entry rows and section summary
//! - [`engine`]: worker-thread payload handoff
//! - [`viewer`]: orchestration and selection events

pub mod config;
pub mod engine;
pub mod focus;
pub mod labels;
pub mod table;
pub mod viewer;

pub use config::{ConfigError, ViewerConfig};
pub use engine::{DiffEngine, EngineError, EngineHandle, EnginePoll, JsonFileEngine};
pub use focus::{FocusMode, Legend, apply_focus};
pub use labels::{Label, LabelDecimator, LabelToggles};
pub use table::{TableModel, TableRow};
pub use viewer::{SelectionEvent, Viewer};
