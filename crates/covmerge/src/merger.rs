//! Per-file record merger
//!
//! Turns one interpreter run into a [`TestBlock`]: one record per distinct
//! source file, entries deduplicated and in line order, paths made
//! relative to the invocation root.
//!
//! A source file reported by several runs (a header compiled into more
//! than one translation unit) gets one record in each run's block. Records
//! are never summed across runs.

use crate::gcov::GcovOutput;
use crate::locator::{absolute_root, ArtifactPair};
use crate::result::{CovError, CovResult};
use crate::tracefile::{FileRecord, FunctionCoverage, LineCoverage, TestBlock};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Builds canonical test blocks from raw interpreter output
#[derive(Debug, Clone)]
pub struct RecordMerger {
    invocation_root: PathBuf,
    test_name: String,
}

impl RecordMerger {
    /// Create a merger reporting paths relative to `invocation_root`
    #[must_use]
    pub fn new(invocation_root: impl Into<PathBuf>) -> Self {
        Self {
            invocation_root: absolute_root(invocation_root.into()),
            test_name: String::new(),
        }
    }

    /// Set the name written after each `TN:` marker
    #[must_use]
    pub fn with_test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = name.into();
        self
    }

    /// Parse interpreter output for one artifact pair into a block
    ///
    /// # Errors
    ///
    /// Returns `InterpreterOutput` when the output is malformed JSON.
    pub fn merge(&self, artifacts: &ArtifactPair, raw: &str) -> CovResult<TestBlock> {
        let output = GcovOutput::parse(raw).map_err(|e| CovError::InterpreterOutput {
            notes: artifacts.entry.clone(),
            message: e.to_string(),
        })?;
        let block = self.block_from(output);
        if block.records.is_empty() {
            warn!(
                notes = %artifacts.entry.display(),
                "interpreter reported no source files; writing a bare marker"
            );
        }
        Ok(block)
    }

    /// Normalise parsed output into a block
    #[must_use]
    pub fn block_from(&self, output: GcovOutput) -> TestBlock {
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<FileRecord>> = HashMap::new();

        for record in output.files {
            let source = self.source_path(&record.source);
            if !grouped.contains_key(&source) {
                order.push(source.clone());
            }
            grouped.entry(source).or_default().push(record);
        }

        let records = order
            .into_iter()
            .filter_map(|source| {
                let parts = grouped.remove(&source)?;
                Some(normalize(source, parts))
            })
            .collect();

        TestBlock::new(self.test_name.clone(), records)
    }

    /// Path written after `SF:` for a reported source
    ///
    /// gcov reports sources as recorded at compile time, so relative paths
    /// are already relative to the invocation root.
    #[must_use]
    pub fn source_path(&self, reported: &str) -> String {
        let cleaned = lexical_clean(Path::new(reported));
        let root = lexical_clean(&self.invocation_root);

        match cleaned.strip_prefix(&root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
            _ => cleaned.to_string_lossy().into_owned(),
        }
    }
}

/// Fold all raw parts of one source file into a single record
fn normalize(source: String, parts: Vec<FileRecord>) -> FileRecord {
    let mut functions: Vec<FunctionCoverage> = Vec::new();
    let mut function_index: HashMap<String, usize> = HashMap::new();
    let mut lines: BTreeMap<u32, u64> = BTreeMap::new();

    for part in parts {
        for func in part.functions {
            if let Some(&idx) = function_index.get(&func.name) {
                functions[idx].hits = functions[idx].hits.saturating_add(func.hits);
            } else {
                function_index.insert(func.name.clone(), functions.len());
                functions.push(func);
            }
        }
        for line in part.lines {
            let hits = lines.entry(line.line).or_insert(0);
            *hits = hits.saturating_add(line.hits);
        }
    }

    // stable: same-line functions keep interpreter order
    functions.sort_by_key(|f| f.line);

    FileRecord {
        source,
        functions,
        lines: lines
            .into_iter()
            .map(|(line, hits)| LineCoverage { line, hits })
            .collect(),
    }
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}
