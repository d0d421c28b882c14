//! Pipeline configuration

use crate::result::{CovError, CovResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default interpreter timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything the aggregation pipeline needs, passed in explicitly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// File listing notes files, one per line
    pub manifest: PathBuf,
    /// Root of the mirrored tree holding counter files
    pub counter_root: PathBuf,
    /// Coverage interpreter executable
    pub interpreter: PathBuf,
    /// Directory reported paths are made relative to
    pub invocation_root: PathBuf,
    /// Destination tracefile, must already exist
    pub output: PathBuf,
    /// Name written after each `TN:` marker
    pub test_name: Option<String>,
    /// Worker threads (0 = auto-detect)
    pub jobs: usize,
    /// Per-invocation interpreter timeout (`None` = wait forever)
    pub timeout: Option<Duration>,
    /// Append to the destination instead of truncating it
    pub append: bool,
    /// Arguments placed before the generated interpreter arguments
    pub interpreter_args: Vec<String>,
    /// Ask the interpreter to print to stdout rather than write side files
    pub interpreter_stdout: bool,
    /// Extension of notes files
    pub notes_suffix: String,
    /// Extension of counter files
    pub counter_suffix: String,
}

impl PipelineConfig {
    /// Create a configuration with the required inputs and default options
    #[must_use]
    pub fn new(
        manifest: impl Into<PathBuf>,
        counter_root: impl Into<PathBuf>,
        interpreter: impl Into<PathBuf>,
        invocation_root: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            manifest: manifest.into(),
            counter_root: counter_root.into(),
            interpreter: interpreter.into(),
            invocation_root: invocation_root.into(),
            output: output.into(),
            test_name: None,
            jobs: 0,
            timeout: Some(DEFAULT_TIMEOUT),
            append: false,
            interpreter_args: Vec::new(),
            interpreter_stdout: true,
            notes_suffix: "gcno".to_string(),
            counter_suffix: "gcda".to_string(),
        }
    }

    /// Set test name
    #[must_use]
    pub fn with_test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = Some(name.into());
        self
    }

    /// Set worker count
    #[must_use]
    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set interpreter timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set append mode
    #[must_use]
    pub const fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Set extra interpreter arguments
    #[must_use]
    pub fn with_interpreter_args(mut self, args: Vec<String>) -> Self {
        self.interpreter_args = args;
        self
    }

    /// Set whether the interpreter prints to stdout
    #[must_use]
    pub const fn with_interpreter_stdout(mut self, enabled: bool) -> Self {
        self.interpreter_stdout = enabled;
        self
    }

    /// Set notes and counter extensions
    #[must_use]
    pub fn with_suffixes(mut self, notes: impl Into<String>, counter: impl Into<String>) -> Self {
        self.notes_suffix = notes.into();
        self.counter_suffix = counter.into();
        self
    }

    /// Get effective number of worker threads
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            self.jobs
        }
    }

    /// Check every required input before any work starts
    ///
    /// # Errors
    ///
    /// - `ManifestUnreadable` if the manifest is missing
    /// - `OutputWriteFailed` if the output file does not already exist
    /// - `InvalidConfig` for missing directories, interpreter or suffixes
    pub fn validate(&self) -> CovResult<()> {
        if !self.manifest.is_file() {
            return Err(CovError::manifest(&self.manifest, "manifest file does not exist"));
        }
        if !self.output.is_file() {
            return Err(CovError::output(
                &self.output,
                "output file must exist before the pipeline starts",
            ));
        }
        if !self.counter_root.is_dir() {
            return Err(CovError::config(format!(
                "counter root {} is not a directory",
                self.counter_root.display()
            )));
        }
        if !self.invocation_root.is_dir() {
            return Err(CovError::config(format!(
                "invocation root {} is not a directory",
                self.invocation_root.display()
            )));
        }
        if self.interpreter.as_os_str().is_empty() {
            return Err(CovError::config("interpreter path is empty"));
        }
        // bare names are looked up on PATH at spawn time
        if self.interpreter.components().count() > 1 && !self.interpreter.is_file() {
            return Err(CovError::config(format!(
                "interpreter {} does not exist",
                self.interpreter.display()
            )));
        }
        if self.notes_suffix.is_empty() || self.counter_suffix.is_empty() {
            return Err(CovError::config("notes and counter suffixes must be non-empty"));
        }
        if self.notes_suffix == self.counter_suffix {
            return Err(CovError::config("notes and counter suffixes must differ"));
        }
        Ok(())
    }
}
