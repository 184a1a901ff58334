#![forbid(unsafe_code)]

//! Click command
//!
//! Usage: netdiff click <PAYLOAD> <X> <Y> [--times N] [--shift] [--fly]
//!        netdiff click <PAYLOAD> --feature <ID> [--times N] [--shift] [--fly]
//!
//! Pixel coordinates refer to a `--width` × `--height` surface with the
//! camera fitted to the whole network.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use netdiff_core::event::Modifiers;
use netdiff_model::Domain;
use netdiff_render::Viewport;
use netdiff_view::{Viewer, ViewerConfig};

#[derive(Debug, Args)]
pub struct ClickArgs {
    /// Comparison payload (JSON)
    pub payload: PathBuf,

    /// Pixel column
    #[arg(required_unless_present = "feature", requires = "y")]
    pub x: Option<f64>,

    /// Pixel row
    #[arg(required_unless_present = "feature")]
    pub y: Option<f64>,

    /// Click on the anchor of the feature with this ID instead
    #[arg(long, conflicts_with_all = ["x", "y"])]
    pub feature: Option<String>,

    /// Number of consecutive clicks at the same spot
    #[arg(long, default_value_t = 1)]
    pub times: usize,

    /// Hold shift: repeated clicks step backward through the stack
    #[arg(long)]
    pub shift: bool,

    /// Surface width in pixels
    #[arg(long, default_value_t = 800.0)]
    pub width: f64,

    /// Surface height in pixels
    #[arg(long, default_value_t = 600.0)]
    pub height: f64,

    /// Fly to the final selection and list the labels shown there
    #[arg(long)]
    pub fly: bool,
}

pub fn execute(args: ClickArgs, config: ViewerConfig) -> Result<()> {
    let payload = super::load_payload(&args.payload)?;
    let mut viewer =
        Viewer::with_surface(payload, config, Viewport::new(args.width, args.height))?;

    let (x, y) = target(&viewer, &args)?;
    let modifiers = if args.shift { Modifiers::SHIFT } else { Modifiers::NONE };
    for n in 1..=args.times {
        match viewer.click_with(x, y, modifiers) {
            Some(s) => println!(
                "click {n}: {} {} {} ({}/{})",
                s.domain,
                s.id,
                s.status,
                s.index + 1,
                s.of
            ),
            None => println!("click {n}: nothing at ({x:.1}, {y:.1})"),
        }
    }
    if let Some(row) = viewer.table().highlighted() {
        println!("table: {} {}", row.section, row.id);
    }

    if args.fly && viewer.fly_to_selection() {
        println!("zoom {:.2}", viewer.viewport().zoom());
        for label in viewer.labels() {
            println!(
                "label {} at ({:.1}, {:.1})",
                label.text, label.position.x, label.position.y
            );
        }
    }
    Ok(())
}

/// Pixel to click: explicit coordinates, or a feature's anchor.
fn target(viewer: &Viewer, args: &ClickArgs) -> Result<(f64, f64)> {
    if let Some(id) = &args.feature {
        let Some(key) = Domain::ALL
            .iter()
            .rev()
            .find_map(|d| viewer.find(*d, id))
        else {
            bail!("no feature named `{id}`");
        };
        let Some(feature) = viewer.scene().feature(key) else {
            bail!("no feature named `{id}`");
        };
        let p = viewer.viewport().to_pixel(feature.anchor());
        return Ok((p.x, p.y));
    }
    match (args.x, args.y) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => bail!("either <X> <Y> or --feature is required"),
    }
}
