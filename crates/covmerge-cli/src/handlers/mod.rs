//! Command handlers - extracted from main.rs for testability
//!
//! Each handler module contains:
//! - The execution logic for a CLI command
//! - Pure helper functions
//! - Tests

pub mod collect;
pub mod diff;
pub mod summary;

use crate::error::CliError;

pub use collect::{build_pipeline_config, describe_outcome, execute_collect};
pub use diff::{execute_diff, render_diff, DiffReport, UnmatchedBlock};
pub use summary::{
    execute_summary, render_summary_json, render_summary_text, summarize, CoverageTotals,
};

/// How a command finished, short of a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Everything succeeded
    Success,
    /// Finished, but something needs attention (failed entries, differing reports)
    Incomplete,
}

impl Outcome {
    /// Process exit code
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Incomplete => 1,
        }
    }
}

/// Exit code for any command result
#[must_use]
pub fn exit_code(result: &Result<Outcome, CliError>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => CliError::EXIT_CODE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&Ok(Outcome::Success)), 0);
        assert_eq!(exit_code(&Ok(Outcome::Incomplete)), 1);
        assert_eq!(exit_code(&Err(CliError::report_generation("bad"))), 2);
    }
}
