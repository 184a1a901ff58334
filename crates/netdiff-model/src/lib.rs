#![forbid(unsafe_code)]

//! Comparison model: payload ingestion, projection, classification, and the
//! feature arena.
//!
//! - [`payload`] - wire schema normalized once at ingestion
//! - [`projection`] - model → display coordinates with identity fallback
//! - [`classify`] - four disjoint status sets per geometry domain
//! - [`feature`] - projected features with domain/status indices
//!
//! ```
//! use netdiff_model::{Payload, Projector, classify, FeatureSet};
//!
//! let payload = Payload::from_json(r#"{"geometry": {"nodes2": {"J5": [1968500, 0]}},
//!     "diffs": {"JUNCTIONS": {"added": {"J5": []}}}}"#).unwrap();
//! let classification = classify(&payload);
//! let features = FeatureSet::build(&payload, &classification, &Projector::default());
//! assert_eq!(features.len(), 1);
//! ```

pub mod classify;
pub mod error;
pub mod feature;
pub mod payload;
pub mod projection;
pub mod section;

pub use classify::{Classification, Status, StatusSets, classify};
pub use error::PayloadError;
pub use feature::{Feature, FeatureKey, FeatureSet, Geometry, Snapshot};
pub use payload::{FeatureId, Payload};
pub use projection::Projector;
pub use section::Domain;
