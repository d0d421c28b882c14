//! covmerge CLI library
//!
//! Command-line interface over the `covmerge` coverage aggregation library.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    Cli, CollectArgs, ColorArg, Commands, DiffArgs, FormatArg, LogFormatArg, SummaryArgs,
};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use handlers::Outcome;
pub use output::{summary_line, OutputFormat, ProgressReporter};

/// Build the CLI configuration from parsed global flags
#[must_use]
pub fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}

/// Run a parsed command
pub fn run(config: &CliConfig, command: &Commands) -> CliResult<Outcome> {
    match command {
        Commands::Collect(args) => handlers::execute_collect(config, args),
        Commands::Diff(args) => handlers::execute_diff(config, args),
        Commands::Summary(args) => handlers::execute_summary(config, args),
    }
}
