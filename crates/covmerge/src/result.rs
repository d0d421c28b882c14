//! Result and error types for covmerge.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for covmerge operations
pub type CovResult<T> = Result<T, CovError>;

/// Errors that can occur while aggregating coverage
#[derive(Debug, Error)]
pub enum CovError {
    /// Manifest could not be opened or read
    #[error("Manifest unreadable: {path}: {message}")]
    ManifestUnreadable {
        /// Manifest path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Notes or counter file for a manifest entry does not exist
    #[error("Coverage artifact missing for {notes}: {missing} not found")]
    ArtifactMissing {
        /// Notes file the lookup started from
        notes: PathBuf,
        /// The file that was not found
        missing: PathBuf,
    },

    /// Interpreter exited unsuccessfully or could not be spawned
    #[error("Coverage interpreter failed on {notes} (exit code {}): {stderr}", exit_code_display(.exit_code))]
    InterpreterInvocationFailed {
        /// Notes file being interpreted
        notes: PathBuf,
        /// Exit code, `None` when the process was killed or never started
        exit_code: Option<i32>,
        /// Captured stderr
        stderr: String,
    },

    /// Interpreter did not finish within the configured timeout
    #[error("Coverage interpreter timed out on {notes} after {ms}ms")]
    InterpreterTimeout {
        /// Notes file being interpreted
        notes: PathBuf,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Interpreter produced output that could not be understood
    #[error("Unrecognised interpreter output for {notes}: {message}")]
    InterpreterOutput {
        /// Notes file being interpreted
        notes: PathBuf,
        /// Error message
        message: String,
    },

    /// Output tracefile could not be opened, written or synced
    #[error("Output write failed: {path}: {message}")]
    OutputWriteFailed {
        /// Output path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Pipeline configuration is incomplete or inconsistent
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Tracefile text could not be parsed
    #[error("Tracefile parse error at line {line}: {message}")]
    TracefileParse {
        /// 1-based line number
        line: usize,
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(clippy::ref_option)]
fn exit_code_display(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl CovError {
    /// Create a manifest error
    #[must_use]
    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestUnreadable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an output error
    #[must_use]
    pub fn output(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::OutputWriteFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Errors that abort the whole run
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ManifestUnreadable { .. } | Self::OutputWriteFailed { .. } | Self::InvalidConfig { .. }
        )
    }

    /// Errors local to a single manifest entry
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }

    /// Whether the error counts as an interpreter failure (non-zero exit or timeout)
    #[must_use]
    pub const fn is_invocation_failure(&self) -> bool {
        matches!(
            self,
            Self::InterpreterInvocationFailed { .. } | Self::InterpreterTimeout { .. }
        )
    }
}
