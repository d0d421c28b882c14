//! Coverage manifest reader
//!
//! A manifest lists, one per line, the notes files (`.gcno`) that were
//! part of an instrumented build. Entries are kept in file order and
//! duplicates are preserved; collapsing them is the pipeline's job.

use crate::result::{CovError, CovResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ordered list of notes-file paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<PathBuf>,
}

impl Manifest {
    /// Build a manifest from already-known entries
    #[must_use]
    pub fn from_entries(entries: Vec<PathBuf>) -> Self {
        Self { entries }
    }

    /// Read a manifest file, keeping only entries with the notes suffix
    ///
    /// # Errors
    ///
    /// Returns `ManifestUnreadable` if the file does not exist or cannot be read
    pub fn load(path: &Path, notes_suffix: &str) -> CovResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CovError::manifest(path, e.to_string()))?;
        Ok(Self::parse(&content, notes_suffix))
    }

    /// Parse manifest text
    ///
    /// Blank lines and `#` comments are skipped. Lines naming other
    /// artifacts (sources, counter files) are dropped.
    #[must_use]
    pub fn parse(content: &str, notes_suffix: &str) -> Self {
        let mut entries = Vec::new();

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let path = PathBuf::from(line);
            if path.extension().is_some_and(|ext| ext == notes_suffix) {
                entries.push(path);
            } else {
                debug!(entry = line, "skipping manifest entry without notes suffix");
            }
        }

        Self { entries }
    }

    /// Entries in manifest order, duplicates included
    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Number of entries, duplicates included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with repeats removed, first occurrence wins
    #[must_use]
    pub fn unique_entries(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|p| seen.insert(p.as_path()))
            .cloned()
            .collect()
    }
}
