#![forbid(unsafe_code)]

//! Preview command
//!
//! Usage: netdiff preview <PAYLOAD> [--cols N] [--rows N] [--ansi] [--legend]

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use netdiff_view::{Viewer, ViewerConfig};

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Comparison payload (JSON)
    pub payload: PathBuf,

    /// Width in text cells
    #[arg(long)]
    pub cols: Option<u16>,

    /// Height in text cells
    #[arg(long)]
    pub rows: Option<u16>,

    /// Emit 24-bit color escapes
    #[arg(long)]
    pub ansi: bool,

    /// Print the legend below the map
    #[arg(long)]
    pub legend: bool,
}

pub fn execute(args: PreviewArgs, mut config: ViewerConfig) -> Result<()> {
    if let Some(cols) = args.cols {
        config.preview.cols = cols;
    }
    if let Some(rows) = args.rows {
        config.preview.rows = rows;
    }
    let payload = super::load_payload(&args.payload)?;
    let viewer = Viewer::new(payload, config)?;

    print!("{}", viewer.preview(args.ansi));
    if args.legend {
        println!();
        print!("{}", viewer.legend());
    }
    Ok(())
}
