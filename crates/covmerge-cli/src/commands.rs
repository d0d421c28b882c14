//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// covmerge: collect gcov coverage from a test run into one LCOV tracefile
#[derive(Parser, Debug)]
#[command(name = "covmerge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only failures are printed)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interpret every notes file in a manifest and write the tracefile
    ///
    /// Each entry is run through gcov with its counter file. Entries whose
    /// counter file is missing are skipped. Exits 1 if any entry failed
    /// (the report is still written) and 2 on fatal errors.
    Collect(CollectArgs),

    /// Compare two tracefiles, ignoring block order
    Diff(DiffArgs),

    /// Print per-file and total line/function counts of a tracefile
    Summary(SummaryArgs),
}

/// Arguments for the collect command
#[derive(Parser, Debug)]
pub struct CollectArgs {
    /// File listing notes (.gcno) files, one per line
    #[arg(long, env = "COVERAGE_MANIFEST")]
    pub manifest: PathBuf,

    /// Directory mirroring the build tree with counter (.gcda) files
    #[arg(long, env = "COVERAGE_DIR")]
    pub counter_root: PathBuf,

    /// gcov executable
    #[arg(long, env = "COVERAGE_GCOV_PATH", default_value = "gcov")]
    pub gcov: PathBuf,

    /// Invocation root; source paths under it are written relative to it
    #[arg(long, env = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Existing tracefile to write
    #[arg(short, long, env = "COVERAGE_OUTPUT_FILE")]
    pub output: PathBuf,

    /// Name written after each TN: marker
    #[arg(long)]
    pub test_name: Option<String>,

    /// Number of parallel gcov invocations (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0")]
    pub jobs: usize,

    /// Per-invocation timeout in seconds (0 = none)
    #[arg(long, default_value = "300")]
    pub timeout_secs: u64,

    /// Append to the output instead of truncating it
    #[arg(long)]
    pub append: bool,

    /// Extra argument passed to gcov before the generated ones (repeatable)
    #[arg(long = "gcov-arg", allow_hyphen_values = true)]
    pub gcov_args: Vec<String>,

    /// Whitespace-separated extra gcov arguments, after any --gcov-arg
    #[arg(long, env = "COVERAGE_GCOV_OPTIONS", allow_hyphen_values = true)]
    pub gcov_options: Option<String>,

    /// Read *.gcov side files instead of asking gcov for stdout (-t)
    #[arg(long)]
    pub side_files: bool,
}

impl CollectArgs {
    /// Extra gcov arguments in the order they are passed
    #[must_use]
    pub fn interpreter_args(&self) -> Vec<String> {
        let mut args = self.gcov_args.clone();
        if let Some(ref options) = self.gcov_options {
            args.extend(options.split_whitespace().map(str::to_string));
        }
        args
    }
}

/// Arguments for the diff command
#[derive(Parser, Debug)]
pub struct DiffArgs {
    /// First tracefile
    pub left: PathBuf,

    /// Second tracefile
    pub right: PathBuf,
}

/// Arguments for the summary command
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Tracefile to summarize
    pub tracefile: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: FormatArg,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Report output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Human-readable table
    #[default]
    Text,
    /// JSON document
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}
