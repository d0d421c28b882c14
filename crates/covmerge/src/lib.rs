//! covmerge: gcov coverage aggregation for compiled test binaries
//!
//! Turns the notes (`.gcno`) and counter (`.gcda`) files left behind by an
//! instrumented build and test run into a single LCOV-style tracefile.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌─────────────┐   ┌────────────┐   ┌────────────┐
//! │ Manifest   │──►│ Artifact   │──►│ Interpreter │──►│ Record     │──►│ Report     │
//! │ (.gcno     │   │ Locator    │   │ (gcov in a  │   │ Merger     │   │ Writer     │
//! │  list)     │   │ (.gcda)    │   │  scratch    │   │ (TN/SF/DA) │   │ (single    │
//! │            │   │            │   │  dir)       │   │            │   │  append)   │
//! └────────────┘   └────────────┘   └─────────────┘   └────────────┘   └────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use covmerge::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new(
//!     "coverage/manifest.txt",
//!     "coverage/gcda",
//!     "/usr/bin/gcov",
//!     ".",
//!     "coverage/_coverage_report.dat",
//! );
//! let summary = Pipeline::new(config).run()?;
//! println!("{summary}");
//! # Ok::<(), covmerge::CovError>(())
//! ```

#![warn(missing_docs)]

mod config;
pub mod gcov;
mod interpreter;
mod locator;
mod manifest;
mod merger;
mod pipeline;
mod result;
pub mod tracefile;
mod writer;

pub use config::{PipelineConfig, DEFAULT_TIMEOUT};
pub use gcov::GcovOutput;
pub use interpreter::{CoverageInterpreter, GcovInterpreter};
pub use locator::{ArtifactLocator, ArtifactPair};
pub use manifest::Manifest;
pub use merger::RecordMerger;
pub use pipeline::{EntryFailure, EntryOutcome, Pipeline, RunSummary};
pub use result::{CovError, CovResult};
pub use tracefile::{
    BlockKey, BlockSet, FileRecord, FunctionCoverage, LineCoverage, TestBlock, Tracefile,
};
pub use writer::ReportWriter;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        CovError, CovResult, CoverageInterpreter, Pipeline, PipelineConfig, RunSummary, Tracefile,
    };
}
