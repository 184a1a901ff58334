#![forbid(unsafe_code)]

//! Subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use netdiff_model::Payload;
use netdiff_view::{EngineHandle, JsonFileEngine};
use tracing::info;

pub mod click;
pub mod preview;
pub mod summary;

/// Load a payload file through the engine worker.
pub fn load_payload(path: &Path) -> Result<Payload> {
    let handle = EngineHandle::spawn(JsonFileEngine::new(path))?;
    let payload = handle
        .wait()
        .with_context(|| format!("failed to load {}", path.display()))?;
    info!(path = %path.display(), sections = payload.diffs.len(), "payload loaded");
    Ok(payload)
}
