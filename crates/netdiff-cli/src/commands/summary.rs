#![forbid(unsafe_code)]

//! Summary command
//!
//! Usage: netdiff summary <PAYLOAD> [--table] [--json]

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use netdiff_model::Status;
use netdiff_view::{Viewer, ViewerConfig};
use serde_json::json;

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Comparison payload (JSON)
    pub payload: PathBuf,

    /// Also list every entry
    #[arg(long)]
    pub table: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: SummaryArgs, config: ViewerConfig) -> Result<()> {
    let payload = super::load_payload(&args.payload)?;
    let viewer = Viewer::new(payload, config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary_json(&viewer))?);
        return Ok(());
    }

    print!("{}", viewer.table().render_summary());
    println!();
    print!("{}", viewer.legend());
    if args.table {
        println!();
        print!("{}", viewer.table().render());
    }
    Ok(())
}

fn summary_json(viewer: &Viewer) -> serde_json::Value {
    let counts = viewer.classification().counts();
    let features: serde_json::Map<String, serde_json::Value> = Status::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), json!(counts[s.index()])))
        .collect();
    let sections: Vec<serde_json::Value> = viewer
        .table()
        .summary()
        .iter()
        .map(|s| {
            json!({
                "section": s.section,
                "added": s.added,
                "removed": s.removed,
                "changed": s.changed,
            })
        })
        .collect();
    json!({
        "projection": viewer.projection(),
        "focus": viewer.focus(),
        "features": features,
        "sections": sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdiff_model::Payload;

    #[test]
    fn json_shape() {
        let payload = Payload::from_value(json!({
            "geometry": {"nodes2": {"J5": [0.0, 0.0]}},
            "diffs": {"JUNCTIONS": {"added": {"J5": []}}}
        }))
        .unwrap();
        let config = ViewerConfig {
            projection: Some("identity".into()),
            ..ViewerConfig::default()
        };
        let viewer = Viewer::new(payload, config).unwrap();
        let doc = summary_json(&viewer);
        assert_eq!(doc["projection"], "identity");
        assert_eq!(doc["focus"], "default");
        assert_eq!(doc["features"]["added"], 1);
        assert_eq!(doc["sections"][0]["section"], "JUNCTIONS");
    }
}
