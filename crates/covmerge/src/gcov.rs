//! gcov output parser
//!
//! Understands the two symbolic formats gcov can print:
//!
//! - the intermediate text format (`gcov -i`, GCC 4.9 to 8):
//!
//! ```text
//! version:8.4.0
//! cwd:/work
//! file:pkg/a.cc
//! function:3,7,1,_Z1ab
//! lcount:3,1,0
//! branch:5,taken
//! ```
//!
//! - the JSON format (`gcov -i -t`, GCC 9 and later), one document per
//!   notes file, selected when the output starts with `{`.
//!
//! Summary figures are never read from the interpreter; the tracefile
//! layer derives them from the entries parsed here.

use crate::tracefile::{FileRecord, FunctionCoverage, LineCoverage};
use serde::Deserialize;
use tracing::debug;

/// Raw per-file coverage from one interpreter run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcovOutput {
    /// Records in output order, possibly repeating a source file
    pub files: Vec<FileRecord>,
}

impl GcovOutput {
    /// Parse interpreter stdout in either supported format
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the output looks like JSON but is malformed.
    /// The text format is parsed leniently and never fails.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim_start().starts_with('{') {
            Self::parse_json(text)
        } else {
            Ok(Self::parse_intermediate(text))
        }
    }

    /// Parse the intermediate text format
    #[must_use]
    pub fn parse_intermediate(text: &str) -> Self {
        let mut output = Self::default();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim_end();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };

            match key {
                "file" => output.files.push(FileRecord::new(value)),
                "function" | "lcount" => {
                    let Some(record) = output.files.last_mut() else {
                        debug!(line = idx + 1, "gcov entry before any file: line");
                        continue;
                    };
                    let parsed = if key == "function" {
                        parse_function(value).map(|f| record.functions.push(f)).is_some()
                    } else {
                        parse_lcount(value).map(|l| record.lines.push(l)).is_some()
                    };
                    if !parsed {
                        debug!(line = idx + 1, entry = line, "skipping malformed gcov entry");
                    }
                }
                // version, cwd, branch and anything newer gcov adds
                _ => {}
            }
        }

        output
    }

    /// Parse one or more concatenated JSON documents
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error on malformed input.
    pub fn parse_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut output = Self::default();

        for doc in serde_json::Deserializer::from_str(text).into_iter::<JsonReport>() {
            let doc = doc?;
            for file in doc.files {
                let mut record = FileRecord::new(file.file);
                record.functions = file
                    .functions
                    .into_iter()
                    .map(|f| FunctionCoverage {
                        line: f.start_line,
                        name: f.name,
                        hits: f.execution_count,
                    })
                    .collect();
                record.lines = file
                    .lines
                    .into_iter()
                    .map(|l| LineCoverage {
                        line: l.line_number,
                        hits: l.count,
                    })
                    .collect();
                output.files.push(record);
            }
        }

        Ok(output)
    }
}

/// `function:<line>,<count>,<name>` or `function:<start>,<end>,<count>,<name>`
fn parse_function(value: &str) -> Option<FunctionCoverage> {
    let four: Vec<&str> = value.splitn(4, ',').collect();
    if let [start, end, count, name] = four.as_slice() {
        if end.parse::<u32>().is_ok() {
            if let (Ok(line), Ok(hits)) = (start.parse(), count.parse()) {
                return Some(FunctionCoverage {
                    line,
                    name: (*name).to_string(),
                    hits,
                });
            }
        }
    }

    let mut three = value.splitn(3, ',');
    let line = three.next()?.parse().ok()?;
    let hits = three.next()?.parse().ok()?;
    let name = three.next().filter(|n| !n.is_empty())?;
    Some(FunctionCoverage {
        line,
        name: name.to_string(),
        hits,
    })
}

/// `lcount:<line>,<count>` with an optional trailing unexecuted-block flag
fn parse_lcount(value: &str) -> Option<LineCoverage> {
    let mut parts = value.split(',');
    let line = parts.next()?.parse().ok()?;
    let hits = parts.next()?.parse().ok()?;
    Some(LineCoverage { line, hits })
}

#[derive(Debug, Deserialize)]
struct JsonReport {
    #[serde(default)]
    files: Vec<JsonFile>,
}

#[derive(Debug, Deserialize)]
struct JsonFile {
    file: String,
    #[serde(default)]
    functions: Vec<JsonFunction>,
    #[serde(default)]
    lines: Vec<JsonLine>,
}

#[derive(Debug, Deserialize)]
struct JsonFunction {
    name: String,
    start_line: u32,
    #[serde(default)]
    execution_count: u64,
}

#[derive(Debug, Deserialize)]
struct JsonLine {
    line_number: u32,
    #[serde(default)]
    count: u64,
}
