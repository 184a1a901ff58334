#![forbid(unsafe_code)]

//! Logging setup.
//!
//! Library crates only emit `tracing` events; binaries call [`init`] once to
//! install a `tracing-subscriber` registry with an [`EnvFilter`] and a
//! formatting layer writing to stderr.
//!
//! | Variable             | Meaning                                   | Default |
//! |----------------------|-------------------------------------------|---------|
//! | `NETDIFF_LOG`        | `EnvFilter` directives                    | `warn`  |
//! | `NETDIFF_LOG_FORMAT` | `pretty`, `compact`, or `json`            | `pretty`|
//!
//! JSON output requires the `tracing-json` feature.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt as tfmt;
use tracing_subscriber::prelude::*;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "NETDIFF_LOG";
/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "NETDIFF_LOG_FORMAT";
/// Filter used when [`LOG_ENV`] is unset.
pub const DEFAULT_FILTER: &str = "warn";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// Single-line human-readable output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl FromStr for LogFormat {
    type Err = LogInitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(LogInitError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Errors raised while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LogInitError {
    #[error("unknown log format `{0}` (expected pretty, compact or json)")]
    UnknownFormat(String),
    #[error("invalid log filter `{directives}`: {source}")]
    Filter {
        directives: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("json log output requires the `tracing-json` feature")]
    JsonUnavailable,
    #[error("a global subscriber is already installed")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LogConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, LogInitError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LogInitError> {
        let mut config = Self::default();
        if let Some(filter) = lookup(LOG_ENV)
            && !filter.trim().is_empty()
        {
            config.filter = filter;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    /// Raise the filter to at least `debug` (`-v`) or `trace` (`-vv`).
    #[must_use]
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        match verbose {
            0 => {}
            1 => self.filter = "debug".to_string(),
            _ => self.filter = "trace".to_string(),
        }
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, LogInitError> {
        EnvFilter::try_new(&self.filter).map_err(|source| LogInitError::Filter {
            directives: self.filter.clone(),
            source,
        })
    }
}

/// Install the global subscriber described by `config`.
pub fn init(config: &LogConfig) -> Result<(), LogInitError> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Pretty => registry
            .with(tfmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Compact => registry
            .with(tfmt::layer().compact().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => return init_json(registry),
    }
    Ok(())
}

#[cfg(feature = "tracing-json")]
fn init_json<S>(registry: S) -> Result<(), LogInitError>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync + 'static,
{
    registry
        .with(tfmt::layer().json().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

#[cfg(not(feature = "tracing-json"))]
fn init_json<S>(_registry: S) -> Result<(), LogInitError> {
    Err(LogInitError::JsonUnavailable)
}
