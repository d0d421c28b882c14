//! End-to-end pipeline tests
//!
//! A closure stands in for gcov, returning captured intermediate output
//! keyed by notes-file stem, so no toolchain is needed.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use covmerge::{
    ArtifactPair, CovError, CovResult, EntryOutcome, Pipeline, PipelineConfig, Tracefile,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const HELPER_GCOV: &str = "\
version:7.5.0
file:coverage_srcs/a.cc
function:1,1,_Z1ab
lcount:1,1
lcount:2,1
lcount:3,0
lcount:5,1
";

const DRIVER_GCOV: &str = "\
version:7.5.0
file:coverage_srcs/t.cc
function:3,1,main
lcount:3,1
lcount:4,1
lcount:5,1
";

const SHARED_HEADER_GCOV: &str = "\
file:coverage_srcs/u.cc
function:2,1,_Z1uv
lcount:2,1
file:coverage_srcs/shared.h
function:4,1,_Z6sharedv
lcount:4,1
";

/// Scratch workspace: invocation root, counter root, manifest and output
struct Workspace {
    _dir: TempDir,
    root: PathBuf,
    counters: PathBuf,
    manifest: PathBuf,
    output: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("execroot");
        let counters = dir.path().join("coverage");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&counters).unwrap();
        let manifest = dir.path().join("manifest.txt");
        let output = dir.path().join("_coverage_report.dat");
        std::fs::write(&manifest, "").unwrap();
        std::fs::write(&output, "").unwrap();
        Self {
            _dir: dir,
            root,
            counters,
            manifest,
            output,
        }
    }

    /// Create a notes file, and its counter file when `executed`
    fn object(&self, rel: &str, executed: bool) {
        let notes = self.root.join(rel);
        std::fs::create_dir_all(notes.parent().unwrap()).unwrap();
        std::fs::write(&notes, b"oncg").unwrap();
        if executed {
            let counter = self.counters.join(rel).with_extension("gcda");
            std::fs::create_dir_all(counter.parent().unwrap()).unwrap();
            std::fs::write(counter, b"adcg").unwrap();
        }
    }

    fn manifest(&self, entries: &[&str]) {
        std::fs::write(&self.manifest, entries.join("\n")).unwrap();
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig::new(
            &self.manifest,
            &self.counters,
            "gcov",
            &self.root,
            &self.output,
        )
    }

    fn report(&self) -> String {
        std::fs::read_to_string(&self.output).unwrap()
    }
}

fn stem(pair: &ArtifactPair) -> String {
    pair.notes
        .file_stem()
        .unwrap()
        .to_string_lossy()
        .to_string()
}

/// Interpreter returning fixture text per notes-file stem
fn fixtures(
    outputs: &[(&str, &str)],
) -> impl Fn(&ArtifactPair) -> CovResult<String> + Send + Sync + 'static {
    let map: HashMap<String, String> = outputs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |pair: &ArtifactPair| -> CovResult<String> {
        map.get(&stem(pair))
            .cloned()
            .ok_or_else(|| CovError::InterpreterInvocationFailed {
                notes: pair.entry.clone(),
                exit_code: Some(1),
                stderr: "no fixture".to_string(),
            })
    }
}

fn standard_fixtures() -> impl Fn(&ArtifactPair) -> CovResult<String> + Send + Sync + 'static {
    fixtures(&[("a", HELPER_GCOV), ("t", DRIVER_GCOV), ("u", SHARED_HEADER_GCOV)])
}

fn count_prefix(report: &str, prefix: &str) -> usize {
    report.lines().filter(|l| l.starts_with(prefix)).count()
}

// ============================================================================
// Core behaviour
// ============================================================================

#[test]
fn test_helper_and_driver_example() {
    let ws = Workspace::new();
    ws.object("obj/a.gcno", true);
    ws.object("obj/t.gcno", true);
    ws.manifest(&["obj/a.gcno", "obj/t.gcno"]);

    let summary = Pipeline::new(ws.config())
        .with_interpreter(standard_fixtures())
        .run()
        .unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.records, 2);

    let report = ws.report();
    assert_eq!(count_prefix(&report, "TN:"), 2);
    assert_eq!(count_prefix(&report, "SF:"), 2);

    let parsed = Tracefile::parse(&report).unwrap();
    let records: HashMap<&str, _> = parsed.records().map(|(_, r)| (r.source.as_str(), r)).collect();

    let helper = records["coverage_srcs/a.cc"];
    assert_eq!((helper.functions_found(), helper.functions_hit()), (1, 1));
    assert!(helper.lines.iter().any(|l| l.hits == 0));

    let driver = records["coverage_srcs/t.cc"];
    assert_eq!((driver.functions_found(), driver.functions_hit()), (1, 1));
    assert_eq!((driver.lines_found(), driver.lines_hit()), (3, 3));
    assert!(report.contains("SF:coverage_srcs/t.cc\nFN:3,main\nFNDA:1,main\nFNF:1\nFNH:1\nDA:3,1\nDA:4,1\nDA:5,1\nLF:3\nLH:3\nend_of_record\n"));
}

#[test]
fn test_report_line_count_matches_blocks() {
    let ws = Workspace::new();
    ws.object("obj/a.gcno", true);
    ws.object("obj/t.gcno", true);
    ws.object("obj/u.gcno", true);
    ws.manifest(&["obj/a.gcno", "obj/t.gcno", "obj/u.gcno"]);

    Pipeline::new(ws.config())
        .with_interpreter(standard_fixtures())
        .run()
        .unwrap();

    let report = ws.report();
    let parsed = Tracefile::parse(&report).unwrap();
    let expected: usize = parsed.blocks.iter().map(|b| b.serialized_line_count()).sum();
    assert_eq!(report.lines().count(), expected);
}

#[test]
fn test_missing_counter_skipped() {
    let ws = Workspace::new();
    ws.object("obj/a.gcno", true);
    ws.object("obj/never_run.gcno", false);
    ws.object("obj/t.gcno", true);
    ws.manifest(&["obj/a.gcno", "obj/never_run.gcno", "obj/t.gcno"]);

    let summary = Pipeline::new(ws.config())
        .with_interpreter(standard_fixtures())
        .run()
        .unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, vec![PathBuf::from("obj/never_run.gcno")]);

    let report = ws.report();
    assert_eq!(count_prefix(&report, "TN:"), summary.processed);
    assert!(!report.contains("never_run"));
}

#[test]
fn test_duplicate_entries_written_once() {
    let ws = Workspace::new();
    ws.object("obj/t.gcno", true);
    ws.manifest(&["obj/t.gcno", "obj/t.gcno", "obj/t.gcno"]);

    let summary = Pipeline::new(ws.config())
        .with_interpreter(standard_fixtures())
        .run()
        .unwrap();

    assert_eq!(summary.manifest_entries, 3);
    assert_eq!(summary.processed, 1);
    assert_eq!(count_prefix(&ws.report(), "SF:"), 1);
}

#[test]
fn test_interpreter_failure_recorded_and_run_continues() {
    let ws = Workspace::new();
    ws.object("obj/a.gcno", true);
    ws.object("obj/broken.gcno", true);
    ws.manifest(&["obj/a.gcno", "obj/broken.gcno"]);

    let summary = Pipeline::new(ws.config())
        .with_interpreter(standard_fixtures())
        .run()
        .unwrap();

    assert!(!summary.is_success());
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].entry, PathBuf::from("obj/broken.gcno"));
    assert!(summary.failures[0].message.contains("no fixture"));

    let report = ws.report();
    assert_eq!(count_prefix(&report, "TN:"), 1);
    assert!(Tracefile::parse(&report).is_ok());
}

#[test]
fn test_shared_header_not_merged_across_runs() {
    let ws = Workspace::new();
    ws.object("obj/u.gcno", true);
    ws.object("obj/v.gcno", true);
    ws.manifest(&["obj/u.gcno", "obj/v.gcno"]);

    let interpreter = fixtures(&[
        ("u", SHARED_HEADER_GCOV),
        ("v", "file:coverage_srcs/shared.h\nfunction:4,2,_Z6sharedv\nlcount:4,2\n"),
    ]);
    Pipeline::new(ws.config())
        .with_interpreter(interpreter)
        .run()
        .unwrap();

    let report = ws.report();
    assert_eq!(count_prefix(&report, "SF:coverage_srcs/shared.h"), 2);
    assert!(report.contains("DA:4,1\n"));
    assert!(report.contains("DA:4,2\n"));
    assert!(!report.contains("DA:4,3\n"));
}

#[test]
fn test_rerun_is_block_set_equal() {
    let ws = Workspace::new();
    let mut entries = Vec::new();
    let mut outputs = Vec::new();
    for i in 0..24 {
        ws.object(&format!("obj/f{i}.gcno"), true);
        entries.push(format!("obj/f{i}.gcno"));
        outputs.push((
            format!("f{i}"),
            format!("file:src/f{i}.cc\nfunction:1,{i},_Z1fv\nlcount:1,{i}\nlcount:2,0\n"),
        ));
    }
    let refs: Vec<&str> = entries.iter().map(String::as_str).collect();
    ws.manifest(&refs);
    let pairs: Vec<(&str, &str)> = outputs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    let run = |jobs: usize| {
        Pipeline::new(ws.config().with_jobs(jobs))
            .with_interpreter(fixtures(&pairs))
            .run()
            .unwrap();
        Tracefile::parse(&ws.report()).unwrap()
    };

    let first = run(1);
    let second = run(8);
    assert_eq!(first.test_marker_count(), 24);
    assert!(first.equivalent(&second));
}

#[test]
fn test_test_name_marker() {
    let ws = Workspace::new();
    ws.object("obj/t.gcno", true);
    ws.manifest(&["obj/t.gcno"]);

    Pipeline::new(ws.config().with_test_name("smoke"))
        .with_interpreter(standard_fixtures())
        .run()
        .unwrap();

    assert!(ws.report().starts_with("TN:smoke\nSF:coverage_srcs/t.cc\n"));
}

#[test]
fn test_absolute_sources_made_relative() {
    let ws = Workspace::new();
    ws.object("obj/t.gcno", true);
    ws.manifest(&["obj/t.gcno"]);
    let source = ws.root.join("pkg/t.cc");
    let text = format!("file:{}\nlcount:1,1\n", source.display());

    Pipeline::new(ws.config())
        .with_interpreter(fixtures(&[("t", text.as_str())]))
        .run()
        .unwrap();

    assert!(ws.report().contains("SF:pkg/t.cc\n"));
}

#[test]
fn test_progress_callback_sees_every_entry() {
    let ws = Workspace::new();
    ws.object("obj/a.gcno", true);
    ws.object("obj/t.gcno", false);
    ws.manifest(&["obj/a.gcno", "obj/t.gcno"]);

    let seen = Arc::new(AtomicUsize::new(0));
    let skipped = Arc::new(AtomicUsize::new(0));
    let (seen_cb, skipped_cb) = (seen.clone(), skipped.clone());

    Pipeline::new(ws.config())
        .with_interpreter(standard_fixtures())
        .with_progress(move |outcome| {
            seen_cb.fetch_add(1, Ordering::SeqCst);
            if matches!(outcome, EntryOutcome::Skipped { .. }) {
                skipped_cb.fetch_add(1, Ordering::SeqCst);
            }
        })
        .run()
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(skipped.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Output handling
// ============================================================================

#[test]
fn test_empty_manifest_truncates_output() {
    let ws = Workspace::new();
    std::fs::write(&ws.output, "TN:\nSF:stale.cc\nend_of_record\n").unwrap();

    let summary = Pipeline::new(ws.config())
        .with_interpreter(standard_fixtures())
        .run()
        .unwrap();

    assert_eq!(summary.processed, 0);
    assert_eq!(ws.report(), "");
}

#[test]
fn test_append_mode_keeps_previous_blocks() {
    let ws = Workspace::new();
    ws.object("obj/t.gcno", true);
    ws.manifest(&["obj/t.gcno"]);
    std::fs::write(&ws.output, "TN:\nSF:earlier.cc\nLF:0\nLH:0\nend_of_record\n").unwrap();

    Pipeline::new(ws.config().with_append(true))
        .with_interpreter(standard_fixtures())
        .run()
        .unwrap();

    let parsed = Tracefile::parse(&ws.report()).unwrap();
    assert_eq!(parsed.test_marker_count(), 2);
}

// ============================================================================
// Fatal errors
// ============================================================================

#[test]
fn test_missing_manifest_is_fatal() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.manifest = Path::new("/nonexistent/manifest.txt").to_path_buf();

    let err = Pipeline::new(config)
        .with_interpreter(standard_fixtures())
        .run()
        .unwrap_err();
    assert!(matches!(err, CovError::ManifestUnreadable { .. }));
}

#[test]
fn test_missing_output_is_fatal() {
    let ws = Workspace::new();
    std::fs::remove_file(&ws.output).unwrap();

    let err = Pipeline::new(ws.config())
        .with_interpreter(standard_fixtures())
        .run()
        .unwrap_err();
    assert!(matches!(err, CovError::OutputWriteFailed { .. }));
    assert!(!ws.output.exists());
}
