//! Collect command handler

use crate::commands::CollectArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::Outcome;
use covmerge::{EntryOutcome, Manifest, Pipeline, PipelineConfig};
use std::time::Duration;
use tracing::info;

/// Translate command-line arguments into a pipeline configuration
#[must_use]
pub fn build_pipeline_config(args: &CollectArgs) -> PipelineConfig {
    let timeout = (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs));

    let mut config = PipelineConfig::new(
        &args.manifest,
        &args.counter_root,
        &args.gcov,
        &args.root,
        &args.output,
    )
    .with_jobs(args.jobs)
    .with_timeout(timeout)
    .with_append(args.append)
    .with_interpreter_args(args.interpreter_args())
    .with_interpreter_stdout(!args.side_files);

    if let Some(ref name) = args.test_name {
        config = config.with_test_name(name);
    }
    config
}

/// Execute the collect command
pub fn execute_collect(config: &CliConfig, args: &CollectArgs) -> CliResult<Outcome> {
    let pipeline_config = build_pipeline_config(args);
    pipeline_config.validate()?;

    // Loaded up front so the progress bar knows its length
    let manifest = Manifest::load(&pipeline_config.manifest, &pipeline_config.notes_suffix)?;
    let mut reporter = config.reporter();
    reporter.start_progress(manifest.unique_entries().len() as u64, "collecting coverage");
    let bar = reporter.progress_handle();

    let summary = Pipeline::new(pipeline_config)
        .with_progress(move |outcome| {
            if let Some(ref pb) = bar {
                pb.set_message(describe_outcome(outcome));
                pb.inc(1);
            }
        })
        .run_manifest(&manifest)?;
    reporter.finish();

    for failure in &summary.failures {
        reporter.failure(&format!("{}: {}", failure.entry.display(), failure.message));
    }
    if config.verbosity.is_verbose() {
        for entry in &summary.skipped {
            reporter.info(&format!("{}: no counter data", entry.display()));
        }
    }
    reporter.summary(&summary);
    info!(%summary, "collect finished");

    Ok(if summary.is_success() {
        Outcome::Success
    } else {
        Outcome::Incomplete
    })
}

/// Describe one entry outcome in a single line
#[must_use]
pub fn describe_outcome(outcome: &EntryOutcome) -> String {
    match outcome {
        EntryOutcome::Processed { entry, files } => {
            format!("{}: {files} file record(s)", entry.display())
        }
        EntryOutcome::Skipped { entry, missing } => {
            format!("{}: skipped, {} not found", entry.display(), missing.display())
        }
        EntryOutcome::Failed(failure) => {
            format!("{}: {}", failure.entry.display(), failure.message)
        }
    }
}
