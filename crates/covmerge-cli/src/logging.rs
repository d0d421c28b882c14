//! Tracing subscriber setup
//!
//! Logs go to stderr so stdout stays clean for `summary --format json`.
//! `RUST_LOG`, when set, replaces the filter derived from `-v`/`-q`.

use crate::config::{LogFormat, Verbosity};
use tracing_subscriber::EnvFilter;

const CRATES: &[&str] = &["covmerge", "covmerge_cli"];

/// Filter directives for a verbosity level: warnings from dependencies,
/// the chosen level for our own crates
#[must_use]
pub fn filter_directives(verbosity: Verbosity) -> String {
    let level = verbosity.level_filter();
    let allowlist: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    format!("warn,{}", allowlist.join(","))
}

/// Install the global subscriber
///
/// Safe to call more than once; later calls are ignored.
pub fn init(verbosity: Verbosity, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbosity)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Text => builder.with_target(false).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
