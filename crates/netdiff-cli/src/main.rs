#![forbid(unsafe_code)]

//! netdiff CLI
//!
//! Command-line front end over a comparison payload file.
//!
//! ```text
//! netdiff summary  model.json [--table] [--json]
//! netdiff preview  model.json [--cols N] [--rows N] [--ansi] [--legend]
//! netdiff click    model.json <X> <Y> [--times N] [--fly]
//! netdiff click    model.json --feature J5 --times 2
//! ```
//!
//! Settings come from `NETDIFF_*` environment variables, overridden by the
//! global flags below.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use netdiff_core::logging::{self, LogConfig};
use netdiff_view::config::parse_label_toggles;
use netdiff_view::{FocusMode, ViewerConfig};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "netdiff", version)]
#[command(about = "Inspect stormwater network model comparisons", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Debug, Args)]
struct GlobalArgs {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Projection name, e.g. EPSG:3735 or identity
    #[arg(long, global = true)]
    projection: Option<String>,

    /// Focus mode: default, added, removed, or changed
    #[arg(long, global = true)]
    focus: Option<FocusMode>,

    /// Labeled domains, e.g. `point,line`, `all`, or `none`
    #[arg(long, global = true)]
    labels: Option<String>,
}

impl GlobalArgs {
    /// Environment overlaid with explicit flags.
    fn viewer_config(&self) -> Result<ViewerConfig> {
        let mut config = ViewerConfig::from_env().context("invalid NETDIFF_* environment")?;
        if let Some(projection) = &self.projection {
            config.projection = Some(projection.clone());
        }
        if let Some(focus) = self.focus {
            config.focus = focus;
        }
        if let Some(labels) = &self.labels {
            config.labels = parse_label_toggles(labels)?;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Per-section change counts, legend, and optionally every entry
    Summary(commands::summary::SummaryArgs),
    /// Braille rendering of the map
    Preview(commands::preview::PreviewArgs),
    /// Hit test a pixel and cycle through overlapping features
    Click(commands::click::ClickArgs),
}

fn run(cli: Cli) -> Result<()> {
    let log = LogConfig::from_env()?.with_verbosity(cli.global.verbose);
    logging::init(&log)?;
    let config = cli.global.viewer_config()?;

    match cli.command {
        Commands::Summary(args) => commands::summary::execute(args, config),
        Commands::Preview(args) => commands::preview::execute(args, config),
        Commands::Click(args) => commands::click::execute(args, config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "netdiff", "click", "m.json", "10", "20", "--times", "3", "--focus", "Added", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.global.verbose, 2);
        assert_eq!(cli.global.focus, Some(FocusMode::Added));
        match cli.command {
            Commands::Click(args) => {
                assert_eq!(args.times, 3);
                assert_eq!((args.x, args.y), (Some(10.0), Some(20.0)));
                assert!(!args.shift);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_focus_rejected() {
        assert!(Cli::try_parse_from(["netdiff", "summary", "m.json", "--focus", "loud"]).is_err());
    }

    #[test]
    fn click_needs_a_target() {
        assert!(Cli::try_parse_from(["netdiff", "click", "m.json"]).is_err());
        assert!(Cli::try_parse_from(["netdiff", "click", "m.json", "--feature", "J5"]).is_ok());
    }

    #[test]
    fn click_shift_flag() {
        let cli =
            Cli::try_parse_from(["netdiff", "click", "m.json", "--feature", "J5", "--shift"])
                .unwrap();
        assert!(matches!(cli.command, Commands::Click(args) if args.shift));
    }
}
