//! Aggregation pipeline
//!
//! ```text
//! manifest ──► for each unique entry (rayon pool):
//!                locate ──► interpret ──► merge ──┐
//!                                                 ▼
//!                                   Mutex<ReportWriter> ──► tracefile
//! ```
//!
//! Entries are independent. A missing counter file skips the entry, an
//! interpreter failure is recorded and the run carries on; only manifest,
//! configuration and output errors stop the run.

use crate::config::PipelineConfig;
use crate::interpreter::{CoverageInterpreter, GcovInterpreter};
use crate::locator::ArtifactLocator;
use crate::manifest::Manifest;
use crate::merger::RecordMerger;
use crate::result::{CovError, CovResult};
use crate::tracefile::TestBlock;
use crate::writer::ReportWriter;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A manifest entry that could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    /// Manifest entry
    pub entry: PathBuf,
    /// Error description
    pub message: String,
}

/// What happened to one manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryOutcome {
    /// Block written with this many file records
    Processed {
        /// Manifest entry
        entry: PathBuf,
        /// Records in the written block
        files: usize,
    },
    /// Counter (or notes) file absent; nothing written
    Skipped {
        /// Manifest entry
        entry: PathBuf,
        /// File that was looked for
        missing: PathBuf,
    },
    /// Interpreter failed; nothing written
    Failed(EntryFailure),
}

impl EntryOutcome {
    /// Manifest entry this outcome belongs to
    #[must_use]
    pub fn entry(&self) -> &Path {
        match self {
            Self::Processed { entry, .. } | Self::Skipped { entry, .. } => entry,
            Self::Failed(failure) => &failure.entry,
        }
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Entries listed in the manifest, duplicates included
    pub manifest_entries: usize,
    /// Entries that produced a block
    pub processed: usize,
    /// File records written
    pub records: usize,
    /// Entries skipped for missing artifacts
    pub skipped: Vec<PathBuf>,
    /// Entries whose interpretation failed
    pub failures: Vec<EntryFailure>,
    /// Wall-clock duration
    pub duration: Duration,
}

impl RunSummary {
    /// No entry failed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, outcome: EntryOutcome) {
        match outcome {
            EntryOutcome::Processed { files, .. } => {
                self.processed += 1;
                self.records += files;
            }
            EntryOutcome::Skipped { entry, .. } => self.skipped.push(entry),
            EntryOutcome::Failed(failure) => self.failures.push(failure),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} failed, {} file records",
            self.processed,
            self.skipped.len(),
            self.failures.len(),
            self.records
        )
    }
}

type ProgressFn = Box<dyn Fn(&EntryOutcome) + Send + Sync>;

/// Coverage aggregation pipeline
pub struct Pipeline {
    config: PipelineConfig,
    interpreter: Box<dyn CoverageInterpreter>,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a pipeline that runs the configured gcov executable
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let interpreter = GcovInterpreter::new(&config.interpreter)
            .with_args(config.interpreter_args.clone())
            .with_timeout(config.timeout)
            .with_stdout_output(config.interpreter_stdout);
        Self {
            config,
            interpreter: Box::new(interpreter),
            progress: None,
        }
    }

    /// Replace the interpreter
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl CoverageInterpreter + 'static) -> Self {
        self.interpreter = Box::new(interpreter);
        self
    }

    /// Observe each entry as it finishes (called from worker threads)
    #[must_use]
    pub fn with_progress(mut self, progress: impl Fn(&EntryOutcome) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the manifest named by the configuration
    ///
    /// # Errors
    ///
    /// Returns `ManifestUnreadable` if it cannot be read
    pub fn load_manifest(&self) -> CovResult<Manifest> {
        Manifest::load(&self.config.manifest, &self.config.notes_suffix)
    }

    /// Run the whole pipeline
    ///
    /// # Errors
    ///
    /// Returns fatal errors only: invalid configuration, unreadable
    /// manifest, or output that cannot be written. Per-entry failures are
    /// reported in the summary.
    pub fn run(&self) -> CovResult<RunSummary> {
        self.config.validate()?;
        let manifest = self.load_manifest()?;
        self.run_manifest(&manifest)
    }

    /// Run over an already-loaded manifest
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run`]
    pub fn run_manifest(&self, manifest: &Manifest) -> CovResult<RunSummary> {
        let start = Instant::now();
        let entries = manifest.unique_entries();
        if entries.len() < manifest.len() {
            debug!(
                listed = manifest.len(),
                unique = entries.len(),
                "collapsed duplicate manifest entries"
            );
        }

        let writer = Mutex::new(ReportWriter::open(&self.config.output, self.config.append)?);
        let locator = ArtifactLocator::new(
            &self.config.invocation_root,
            &self.config.counter_root,
            &self.config.counter_suffix,
        );
        let mut merger = RecordMerger::new(&self.config.invocation_root);
        if let Some(name) = &self.config.test_name {
            merger = merger.with_test_name(name);
        }

        let threads = self.config.effective_jobs().min(entries.len()).max(1);
        info!(entries = entries.len(), threads, "collecting coverage");

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| CovError::config(format!("failed to start worker pool: {e}")))?;
        let outcomes: Vec<CovResult<EntryOutcome>> = pool.install(|| {
            entries
                .par_iter()
                .map(|entry| self.process(entry, &locator, &merger, &writer))
                .collect()
        });

        let mut summary = RunSummary {
            manifest_entries: manifest.len(),
            ..RunSummary::default()
        };
        for outcome in outcomes {
            summary.record(outcome?);
        }

        let writer = writer
            .into_inner()
            .map_err(|_| CovError::output(&self.config.output, "writer lock poisoned"))?;
        let lines = writer.lines_written();
        let path = writer.finish()?;
        summary.duration = start.elapsed();

        info!(
            output = %path.display(),
            processed = summary.processed,
            skipped = summary.skipped.len(),
            failed = summary.failures.len(),
            lines,
            "coverage report written"
        );
        Ok(summary)
    }

    fn process(
        &self,
        entry: &Path,
        locator: &ArtifactLocator,
        merger: &RecordMerger,
        writer: &Mutex<ReportWriter>,
    ) -> CovResult<EntryOutcome> {
        let outcome = match self.interpret(entry, locator, merger) {
            Ok(block) => {
                let files = block.records.len();
                writer
                    .lock()
                    .map_err(|_| CovError::output(&self.config.output, "writer lock poisoned"))?
                    .write_block(&block)?;
                debug!(entry = %entry.display(), files, "block written");
                EntryOutcome::Processed {
                    entry: entry.to_path_buf(),
                    files,
                }
            }
            Err(CovError::ArtifactMissing { missing, .. }) => {
                debug!(entry = %entry.display(), missing = %missing.display(), "no counter data, skipping");
                EntryOutcome::Skipped {
                    entry: entry.to_path_buf(),
                    missing,
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(entry = %entry.display(), error = %e, "coverage entry failed");
                EntryOutcome::Failed(EntryFailure {
                    entry: entry.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };

        if let Some(progress) = &self.progress {
            progress(&outcome);
        }
        Ok(outcome)
    }

    fn interpret(
        &self,
        entry: &Path,
        locator: &ArtifactLocator,
        merger: &RecordMerger,
    ) -> CovResult<TestBlock> {
        let artifacts = locator.locate(entry)?;
        let raw = self.interpreter.invoke(&artifacts)?;
        merger.merge(&artifacts, &raw)
    }
}
