#![forbid(unsafe_code)]

//! Core: geometry primitives, pointer/viewport events, throttling, and logging setup.

pub mod event;
pub mod geometry;
pub mod logging;
pub mod throttle;
