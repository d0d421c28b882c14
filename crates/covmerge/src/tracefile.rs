//! Tracefile model, serialiser and reader
//!
//! Generates and reads LCOV-style tracefiles.
//!
//! ## Format
//!
//! ```text
//! TN:<test name>
//! SF:<source file>
//! FN:<line>,<function name>
//! FNDA:<execution count>,<function name>
//! FNF:<functions found>
//! FNH:<functions hit>
//! DA:<line>,<execution count>
//! LF:<lines found>
//! LH:<lines hit>
//! end_of_record
//! ```
//!
//! ## Comparison contract
//!
//! A tracefile is a multiset of independent per-file blocks. Neither the
//! order of blocks nor the order of test markers carries meaning, so two
//! tracefiles are equivalent when their [`BlockSet`]s are equal.

use crate::result::{CovError, CovResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A function declaration with its execution count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCoverage {
    /// Declaration line
    pub line: u32,
    /// Function name as reported by the interpreter (usually mangled)
    pub name: String,
    /// Number of times the function was entered
    pub hits: u64,
}

/// Execution count for one executable line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCoverage {
    /// Line number
    pub line: u32,
    /// Execution count
    pub hits: u64,
}

/// Coverage for a single source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Source file path (`SF`)
    pub source: String,
    /// Declared functions in line order
    pub functions: Vec<FunctionCoverage>,
    /// Executable lines in line order
    pub lines: Vec<LineCoverage>,
}

impl FileRecord {
    /// Create an empty record for a source file
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            functions: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Functions found (`FNF`)
    #[must_use]
    pub fn functions_found(&self) -> usize {
        self.functions.len()
    }

    /// Functions executed at least once (`FNH`)
    #[must_use]
    pub fn functions_hit(&self) -> usize {
        self.functions.iter().filter(|f| f.hits > 0).count()
    }

    /// Executable lines (`LF`)
    #[must_use]
    pub fn lines_found(&self) -> usize {
        self.lines.len()
    }

    /// Executed lines (`LH`)
    #[must_use]
    pub fn lines_hit(&self) -> usize {
        self.lines.iter().filter(|l| l.hits > 0).count()
    }

    /// Number of text lines this record occupies when serialised
    #[must_use]
    pub fn serialized_line_count(&self) -> usize {
        // SF + FNF/FNH + LF/LH + end_of_record
        6 + self.functions.len() * 2 + self.lines.len()
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SF:{}", self.source)?;

        for func in &self.functions {
            writeln!(f, "FN:{},{}", func.line, func.name)?;
        }
        for func in &self.functions {
            writeln!(f, "FNDA:{},{}", func.hits, func.name)?;
        }
        writeln!(f, "FNF:{}", self.functions_found())?;
        writeln!(f, "FNH:{}", self.functions_hit())?;

        for line in &self.lines {
            writeln!(f, "DA:{},{}", line.line, line.hits)?;
        }
        writeln!(f, "LF:{}", self.lines_found())?;
        writeln!(f, "LH:{}", self.lines_hit())?;

        writeln!(f, "end_of_record")
    }
}

/// One `TN:` marker followed by the records it covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestBlock {
    /// Test name, may be empty
    pub test_name: String,
    /// Per-file records
    pub records: Vec<FileRecord>,
}

impl TestBlock {
    /// Create a block with a test name and records
    #[must_use]
    pub fn new(test_name: impl Into<String>, records: Vec<FileRecord>) -> Self {
        Self {
            test_name: test_name.into(),
            records,
        }
    }

    /// Number of text lines this block occupies when serialised
    #[must_use]
    pub fn serialized_line_count(&self) -> usize {
        1 + self
            .records
            .iter()
            .map(FileRecord::serialized_line_count)
            .sum::<usize>()
    }
}

impl fmt::Display for TestBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TN:{}", self.test_name)?;
        for record in &self.records {
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

/// An ordered sequence of test blocks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracefile {
    /// Blocks in file order
    pub blocks: Vec<TestBlock>,
}

impl Tracefile {
    /// Create an empty tracefile
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a tracefile from disk
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is malformed
    pub fn load(path: &Path) -> CovResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse tracefile text
    ///
    /// Summary lines (`FNF`, `FNH`, `LF`, `LH`) are accepted but not
    /// trusted; counts are always derived from the entries. Branch lines
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns `TracefileParse` on malformed numeric fields, records
    /// without `SF`, or a record left open at end of input.
    pub fn parse(content: &str) -> CovResult<Self> {
        let mut blocks: Vec<TestBlock> = Vec::new();
        let mut current: Option<FileRecord> = None;
        let mut fnda: BTreeMap<String, u64> = BTreeMap::new();

        for (idx, raw) in content.lines().enumerate() {
            let lineno = idx + 1;
            let line = raw.trim_end();
            if line.is_empty() {
                continue;
            }

            if line == "end_of_record" {
                let mut record = current.take().ok_or_else(|| parse_error(lineno, "end_of_record without SF"))?;
                for func in &mut record.functions {
                    if let Some(hits) = fnda.get(&func.name) {
                        func.hits = *hits;
                    }
                }
                fnda.clear();
                if blocks.is_empty() {
                    blocks.push(TestBlock::default());
                }
                if let Some(block) = blocks.last_mut() {
                    block.records.push(record);
                }
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                return Err(parse_error(lineno, format!("expected KEY:VALUE, got {line:?}")));
            };

            match key {
                "TN" => {
                    if current.is_some() {
                        return Err(parse_error(lineno, "TN inside an open record"));
                    }
                    blocks.push(TestBlock::new(value, Vec::new()));
                }
                "SF" => {
                    if current.is_some() {
                        return Err(parse_error(lineno, "SF inside an open record"));
                    }
                    current = Some(FileRecord::new(value));
                }
                "FN" => {
                    let record = open_record(&mut current, lineno)?;
                    let (line_no, name) = split_pair(value, lineno)?;
                    record.functions.push(FunctionCoverage {
                        line: parse_num(line_no, lineno)?,
                        name: name.to_string(),
                        hits: 0,
                    });
                }
                "FNDA" => {
                    open_record(&mut current, lineno)?;
                    let (hits, name) = split_pair(value, lineno)?;
                    let total = fnda.entry(name.to_string()).or_insert(0);
                    *total = total.saturating_add(parse_num::<u64>(hits, lineno)?);
                }
                "DA" => {
                    let record = open_record(&mut current, lineno)?;
                    let mut parts = value.split(',');
                    let line_no = parts.next().unwrap_or_default();
                    let hits = parts
                        .next()
                        .ok_or_else(|| parse_error(lineno, "DA without hit count"))?;
                    record.lines.push(LineCoverage {
                        line: parse_num(line_no, lineno)?,
                        hits: parse_num(hits, lineno)?,
                    });
                }
                "FNF" | "FNH" | "LF" | "LH" | "BRDA" | "BRF" | "BRH" | "VER" => {
                    open_record(&mut current, lineno)?;
                }
                other => {
                    return Err(parse_error(lineno, format!("unknown key {other:?}")));
                }
            }
        }

        if current.is_some() {
            return Err(parse_error(content.lines().count(), "record missing end_of_record"));
        }

        Ok(Self { blocks })
    }

    /// All records across blocks, paired with their test name
    pub fn records(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.blocks
            .iter()
            .flat_map(|b| b.records.iter().map(move |r| (b.test_name.as_str(), r)))
    }

    /// Total number of `TN:` markers
    #[must_use]
    pub fn test_marker_count(&self) -> usize {
        self.blocks.len()
    }

    /// Order-insensitive view used for equality between reports
    #[must_use]
    pub fn block_set(&self) -> BlockSet {
        let mut counts = BTreeMap::new();
        for (test_name, record) in self.records() {
            *counts
                .entry(BlockKey {
                    test_name: test_name.to_string(),
                    body: record.to_string(),
                })
                .or_insert(0) += 1;
        }
        BlockSet { counts }
    }

    /// Whether two tracefiles are equivalent under the block-set contract
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        self.block_set() == other.block_set()
    }
}

impl fmt::Display for Tracefile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}

/// One per-file block keyed by test name and serialised record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockKey {
    /// Test name of the enclosing marker
    pub test_name: String,
    /// Serialised record, `SF` through `end_of_record`
    pub body: String,
}

impl BlockKey {
    /// Source file line of the block
    #[must_use]
    pub fn source(&self) -> &str {
        self.body
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("SF:"))
            .unwrap_or("")
    }
}

/// Multiset of per-file blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    counts: BTreeMap<BlockKey, usize>,
}

impl BlockSet {
    /// Total number of blocks including repeats
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.values().sum()
    }

    /// Whether the set holds no blocks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Blocks present in `self` more often than in `other`
    #[must_use]
    pub fn difference(&self, other: &Self) -> Vec<(&BlockKey, usize)> {
        self.counts
            .iter()
            .filter_map(|(key, &n)| {
                let theirs = other.counts.get(key).copied().unwrap_or(0);
                (n > theirs).then_some((key, n - theirs))
            })
            .collect()
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> CovError {
    CovError::TracefileParse {
        line,
        message: message.into(),
    }
}

fn open_record(current: &mut Option<FileRecord>, lineno: usize) -> CovResult<&mut FileRecord> {
    current
        .as_mut()
        .ok_or_else(|| parse_error(lineno, "entry outside of an SF record"))
}

fn split_pair(value: &str, lineno: usize) -> CovResult<(&str, &str)> {
    value
        .split_once(',')
        .ok_or_else(|| parse_error(lineno, format!("expected <number>,<name>, got {value:?}")))
}

fn parse_num<T: std::str::FromStr>(value: &str, lineno: usize) -> CovResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| parse_error(lineno, format!("invalid number {value:?}")))
}
