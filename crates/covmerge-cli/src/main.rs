//! covmerge: gcov coverage collection
//!
//! ## Usage
//!
//! ```bash
//! covmerge collect --manifest m.txt --counter-root cov --output out.dat
//! covmerge diff before.dat after.dat
//! covmerge summary out.dat --format json
//! ```
//!
//! Exit status: 0 on success, 1 when entries failed or reports differ,
//! 2 on fatal errors.

use clap::Parser;
use covmerge_cli::{build_config, handlers, logging, run, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(config.verbosity, config.log_format);

    let result = run(&config, &cli.command);
    if let Err(ref e) = result {
        eprintln!("Error: {e}");
    }
    ExitCode::from(handlers::exit_code(&result))
}
