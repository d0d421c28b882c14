//! Summary command handler

use crate::commands::SummaryArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::handlers::Outcome;
use crate::output::OutputFormat;
use covmerge::Tracefile;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Line and function counts for one source file, or for a whole report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageTotals {
    /// Source path, empty for the grand total
    pub source: String,
    /// Instrumented lines (LF)
    pub lines_found: usize,
    /// Lines executed at least once (LH)
    pub lines_hit: usize,
    /// Functions (FNF)
    pub functions_found: usize,
    /// Functions executed at least once (FNH)
    pub functions_hit: usize,
}

impl CoverageTotals {
    /// Line coverage percentage, 100 when nothing is instrumented
    #[must_use]
    pub fn line_percent(&self) -> f64 {
        if self.lines_found == 0 {
            100.0
        } else {
            self.lines_hit as f64 * 100.0 / self.lines_found as f64
        }
    }

    fn add(&mut self, other: &Self) {
        self.lines_found += other.lines_found;
        self.lines_hit += other.lines_hit;
        self.functions_found += other.functions_found;
        self.functions_hit += other.functions_hit;
    }
}

#[derive(Default)]
struct SourceCounts {
    lines: BTreeMap<u32, u64>,
    functions: BTreeMap<String, u64>,
}

/// Per-file totals, sorted by source, plus the grand total
///
/// A source covered by several blocks is counted once: its lines and
/// functions are unioned and their hits summed.
#[must_use]
pub fn summarize(tracefile: &Tracefile) -> (Vec<CoverageTotals>, CoverageTotals) {
    let mut sources: BTreeMap<&str, SourceCounts> = BTreeMap::new();
    for (_, record) in tracefile.records() {
        let counts = sources.entry(record.source.as_str()).or_default();
        for line in &record.lines {
            let hits = counts.lines.entry(line.line).or_insert(0);
            *hits = hits.saturating_add(line.hits);
        }
        for func in &record.functions {
            let hits = counts.functions.entry(func.name.clone()).or_insert(0);
            *hits = hits.saturating_add(func.hits);
        }
    }

    let mut total = CoverageTotals::default();
    let files: Vec<CoverageTotals> = sources
        .into_iter()
        .map(|(source, counts)| {
            let file = CoverageTotals {
                source: source.to_string(),
                lines_found: counts.lines.len(),
                lines_hit: counts.lines.values().filter(|&&h| h > 0).count(),
                functions_found: counts.functions.len(),
                functions_hit: counts.functions.values().filter(|&&h| h > 0).count(),
            };
            total.add(&file);
            file
        })
        .collect();

    (files, total)
}

/// Render a summary as an aligned text table
#[must_use]
pub fn render_summary_text(files: &[CoverageTotals], total: &CoverageTotals) -> String {
    let width = files
        .iter()
        .map(|f| f.source.len())
        .max()
        .unwrap_or(0)
        .max("Total".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>8}  {:>8}  {:>7}  {:>8}  {:>8}",
        "File", "LF", "LH", "Lines", "FNF", "FNH"
    );
    for row in files.iter().chain(std::iter::once(total)) {
        let name = if row.source.is_empty() { "Total" } else { row.source.as_str() };
        let _ = writeln!(
            out,
            "{:<width$}  {:>8}  {:>8}  {:>6.1}%  {:>8}  {:>8}",
            name,
            row.lines_found,
            row.lines_hit,
            row.line_percent(),
            row.functions_found,
            row.functions_hit
        );
    }
    out
}

/// Render a summary as JSON
///
/// # Errors
///
/// Returns `ReportGeneration` if serialization fails
pub fn render_summary_json(files: &[CoverageTotals], total: &CoverageTotals) -> CliResult<String> {
    #[derive(Serialize)]
    struct Document<'a> {
        files: &'a [CoverageTotals],
        total: &'a CoverageTotals,
    }

    serde_json::to_string_pretty(&Document { files, total })
        .map_err(|e| CliError::report_generation(e.to_string()))
}

/// Execute the summary command
pub fn execute_summary(_config: &CliConfig, args: &SummaryArgs) -> CliResult<Outcome> {
    let tracefile = Tracefile::load(&args.tracefile)?;
    let (files, total) = summarize(&tracefile);

    match OutputFormat::from(args.format) {
        OutputFormat::Text => print!("{}", render_summary_text(&files, &total)),
        OutputFormat::Json => println!("{}", render_summary_json(&files, &total)?),
    }
    Ok(Outcome::Success)
}
