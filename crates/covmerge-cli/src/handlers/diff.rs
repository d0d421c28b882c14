//! Diff command handler
//!
//! Two tracefiles are equal when they hold the same multiset of per-file
//! blocks; block order and `TN:` grouping do not matter.

use crate::commands::DiffArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::Outcome;
use covmerge::{BlockKey, Tracefile};
use serde::Serialize;
use std::fmt::Write;

/// A block present on one side only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedBlock {
    /// Test name of the block
    pub test_name: String,
    /// Source file of the block
    pub source: String,
    /// How many more times it appears on this side
    pub count: usize,
}

impl UnmatchedBlock {
    fn from_key(key: &BlockKey, count: usize) -> Self {
        Self {
            test_name: key.test_name.clone(),
            source: key.source().to_string(),
            count,
        }
    }
}

/// Block-set difference between two tracefiles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    /// Blocks only (or more often) in the left file
    pub left_only: Vec<UnmatchedBlock>,
    /// Blocks only (or more often) in the right file
    pub right_only: Vec<UnmatchedBlock>,
}

impl DiffReport {
    /// Compare two parsed tracefiles
    #[must_use]
    pub fn between(left: &Tracefile, right: &Tracefile) -> Self {
        let left_set = left.block_set();
        let right_set = right.block_set();
        Self {
            left_only: left_set
                .difference(&right_set)
                .into_iter()
                .map(|(key, n)| UnmatchedBlock::from_key(key, n))
                .collect(),
            right_only: right_set
                .difference(&left_set)
                .into_iter()
                .map(|(key, n)| UnmatchedBlock::from_key(key, n))
                .collect(),
        }
    }

    /// No block is unmatched
    #[must_use]
    pub fn is_equivalent(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty()
    }
}

/// Render a diff as text
#[must_use]
pub fn render_diff(report: &DiffReport, left: &str, right: &str) -> String {
    if report.is_equivalent() {
        return format!("{left} and {right} are equivalent\n");
    }

    let mut out = String::new();
    for (name, blocks) in [(left, &report.left_only), (right, &report.right_only)] {
        if blocks.is_empty() {
            continue;
        }
        let _ = writeln!(out, "Only in {name}:");
        for block in blocks {
            let _ = write!(out, "  TN:{} SF:{}", block.test_name, block.source);
            if block.count > 1 {
                let _ = write!(out, " (x{})", block.count);
            }
            out.push('\n');
        }
    }
    out
}

/// Execute the diff command
pub fn execute_diff(config: &CliConfig, args: &DiffArgs) -> CliResult<Outcome> {
    let left = Tracefile::load(&args.left)?;
    let right = Tracefile::load(&args.right)?;
    let report = DiffReport::between(&left, &right);

    if !config.verbosity.is_quiet() || !report.is_equivalent() {
        print!(
            "{}",
            render_diff(
                &report,
                &args.left.display().to_string(),
                &args.right.display().to_string()
            )
        );
    }

    Ok(if report.is_equivalent() {
        Outcome::Success
    } else {
        Outcome::Incomplete
    })
}
