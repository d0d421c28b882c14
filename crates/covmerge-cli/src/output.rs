//! Output formatting and progress reporting

use console::{style, Style, Term};
use covmerge::RunSummary;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

/// Output format for report commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Progress reporter for coverage collection
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over manifest entries
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Shareable handle to the bar, for worker threads
    #[must_use]
    pub fn progress_handle(&self) -> Option<ProgressBar> {
        self.progress_bar.clone()
    }

    /// Finish and remove the progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print the run summary
    pub fn summary(&self, summary: &RunSummary) {
        if self.quiet && summary.is_success() {
            return;
        }

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&summary_line(summary, self.use_color));
    }
}

/// One-line run summary
#[must_use]
pub fn summary_line(summary: &RunSummary, use_color: bool) -> String {
    let failed = summary.failures.len();
    let duration_secs = summary.duration.as_secs_f64();
    let status = if failed > 0 { "INCOMPLETE" } else { "COLLECTED" };

    if use_color {
        let ok_style = Style::new().green().bold();
        let failed_style = Style::new().red().bold();
        let skipped_style = Style::new().yellow();

        let status = if failed > 0 {
            failed_style.apply_to(status)
        } else {
            ok_style.apply_to(status)
        };

        format!(
            "{} {} entries in {:.2}s ({} processed, {} skipped, {} failed, {} file records)",
            status,
            summary.manifest_entries,
            duration_secs,
            ok_style.apply_to(summary.processed),
            skipped_style.apply_to(summary.skipped.len()),
            if failed > 0 {
                failed_style.apply_to(failed).to_string()
            } else {
                failed.to_string()
            },
            summary.records
        )
    } else {
        format!(
            "{status} {} entries in {duration_secs:.2}s ({summary})",
            summary.manifest_entries
        )
    }
}
