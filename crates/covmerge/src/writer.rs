//! Report writer
//!
//! Single append point for the aggregate tracefile. Each call writes one
//! complete test block, so concurrent producers sharing the writer behind
//! a lock can never interleave records.

use crate::result::{CovError, CovResult};
use crate::tracefile::TestBlock;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Buffered writer over an existing tracefile
#[derive(Debug)]
pub struct ReportWriter {
    path: PathBuf,
    out: BufWriter<File>,
    blocks: usize,
    lines: usize,
}

impl ReportWriter {
    /// Open an existing destination, truncating it unless `append` is set
    ///
    /// # Errors
    ///
    /// Returns `OutputWriteFailed` if the file does not exist or cannot be opened
    pub fn open(path: &Path, append: bool) -> CovResult<Self> {
        let mut options = OpenOptions::new();
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options
            .open(path)
            .map_err(|e| CovError::output(path, e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            blocks: 0,
            lines: 0,
        })
    }

    /// Write one block
    ///
    /// # Errors
    ///
    /// Returns `OutputWriteFailed` on I/O failure
    pub fn write_block(&mut self, block: &TestBlock) -> CovResult<()> {
        let text = block.to_string();
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| CovError::output(&self.path, e.to_string()))?;
        self.blocks += 1;
        self.lines += block.serialized_line_count();
        Ok(())
    }

    /// Blocks written so far
    #[must_use]
    pub const fn blocks_written(&self) -> usize {
        self.blocks
    }

    /// Text lines written so far
    #[must_use]
    pub const fn lines_written(&self) -> usize {
        self.lines
    }

    /// Flush, sync to disk and close
    ///
    /// # Errors
    ///
    /// Returns `OutputWriteFailed` if flushing or syncing fails
    pub fn finish(self) -> CovResult<PathBuf> {
        let Self { path, out, .. } = self;
        let file = out
            .into_inner()
            .map_err(|e| CovError::output(&path, e.error().to_string()))?;
        file.sync_all()
            .map_err(|e| CovError::output(&path, e.to_string()))?;
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::tracefile::{FileRecord, LineCoverage};
    use tempfile::TempDir;

    fn block(source: &str) -> TestBlock {
        let mut record = FileRecord::new(source);
        record.lines.push(LineCoverage { line: 1, hits: 1 });
        TestBlock::new("", vec![record])
    }

    #[test]
    fn test_missing_destination() {
        let temp = TempDir::new().unwrap();
        let err = ReportWriter::open(&temp.path().join("absent.dat"), false).unwrap_err();
        assert!(matches!(err, CovError::OutputWriteFailed { .. }));
    }

    #[test]
    fn test_truncates_existing_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("coverage.dat");
        std::fs::write(&path, "stale\n").unwrap();

        let mut writer = ReportWriter::open(&path, false).unwrap();
        writer.write_block(&block("a.cc")).unwrap();
        writer.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("TN:\nSF:a.cc\n"));
        assert!(!content.contains("stale"));
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("coverage.dat");
        std::fs::write(&path, block("old.cc").to_string()).unwrap();

        let mut writer = ReportWriter::open(&path, true).unwrap();
        writer.write_block(&block("new.cc")).unwrap();
        writer.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("TN:\nSF:old.cc\n"));
        assert!(content.contains("SF:new.cc\n"));
    }

    #[test]
    fn test_counts_lines_and_blocks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("coverage.dat");
        std::fs::write(&path, "").unwrap();

        let mut writer = ReportWriter::open(&path, false).unwrap();
        writer.write_block(&block("a.cc")).unwrap();
        writer.write_block(&block("b.cc")).unwrap();
        assert_eq!(writer.blocks_written(), 2);
        let lines = writer.lines_written();
        writer.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), lines);
    }

    #[test]
    fn test_no_blocks_leaves_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("coverage.dat");
        std::fs::write(&path, "").unwrap();

        ReportWriter::open(&path, false).unwrap().finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
