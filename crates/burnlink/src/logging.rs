//! Logging setup on top of `tracing-subscriber`.
//!
//! Output goes to stderr; stdout carries command output only. `RUST_LOG`
//! overrides the configured level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Resolved logging choices after applying CLI flags to `[logging]`.
#[derive(Debug, PartialEq, Eq)]
pub struct LogSettings<'a> {
    pub level: &'a str,
    pub json: bool,
}

impl<'a> LogSettings<'a> {
    /// `--verbose` forces debug, `--json-logs` forces JSON.
    pub fn resolve(config: &'a burnlink_core::Config, verbose: bool, json_logs: bool) -> Self {
        Self {
            level: if verbose {
                "debug"
            } else {
                config.logging.level.as_str()
            },
            json: json_logs || config.logging.format == "json",
        }
    }
}

/// Install the global subscriber.
pub fn init(settings: &LogSettings<'_>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.level));
    let registry = tracing_subscriber::registry().with(filter);

    if settings.json {
        // One JSON object per line for log shippers
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}
