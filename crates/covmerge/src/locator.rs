//! Artifact locator
//!
//! Pairs a notes file with its runtime-counter companion. Counter files
//! live under the counter root at the same relative path as the notes
//! file, with the counter suffix swapped in.

use crate::result::{CovError, CovResult};
use std::path::{Component, Path, PathBuf};

/// A notes file and the counter file recorded for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPair {
    /// Notes file as listed in the manifest
    pub entry: PathBuf,
    /// Resolved notes file
    pub notes: PathBuf,
    /// Resolved counter file
    pub counter: PathBuf,
}

/// Resolves manifest entries to artifact pairs
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    invocation_root: PathBuf,
    counter_root: PathBuf,
    counter_suffix: String,
}

impl ArtifactLocator {
    /// Create a locator
    #[must_use]
    pub fn new(
        invocation_root: impl Into<PathBuf>,
        counter_root: impl Into<PathBuf>,
        counter_suffix: impl Into<String>,
    ) -> Self {
        Self {
            invocation_root: absolute_root(invocation_root.into()),
            counter_root: counter_root.into(),
            counter_suffix: counter_suffix.into(),
        }
    }

    /// Path of the notes file relative to the mirrored tree
    #[must_use]
    pub fn mirrored_path(&self, entry: &Path) -> PathBuf {
        if entry.is_relative() {
            return entry.to_path_buf();
        }
        if let Ok(rel) = entry.strip_prefix(&self.invocation_root) {
            return rel.to_path_buf();
        }
        entry
            .components()
            .filter(|c| matches!(c, Component::Normal(_) | Component::ParentDir | Component::CurDir))
            .collect()
    }

    /// Expected counter-file location for a manifest entry
    #[must_use]
    pub fn counter_path(&self, entry: &Path) -> PathBuf {
        self.counter_root
            .join(self.mirrored_path(entry))
            .with_extension(&self.counter_suffix)
    }

    /// Expected notes-file location for a manifest entry
    #[must_use]
    pub fn notes_path(&self, entry: &Path) -> PathBuf {
        if entry.is_absolute() {
            entry.to_path_buf()
        } else {
            self.invocation_root.join(entry)
        }
    }

    /// Resolve an entry to an existing notes/counter pair
    ///
    /// # Errors
    ///
    /// Returns `ArtifactMissing` when either file does not exist. A missing
    /// counter file is the normal state for code that was never executed.
    pub fn locate(&self, entry: &Path) -> CovResult<ArtifactPair> {
        let notes = self.notes_path(entry);
        if !notes.is_file() {
            return Err(CovError::ArtifactMissing {
                notes: entry.to_path_buf(),
                missing: notes,
            });
        }

        let counter = self.counter_path(entry);
        if !counter.is_file() {
            return Err(CovError::ArtifactMissing {
                notes: entry.to_path_buf(),
                missing: counter,
            });
        }

        Ok(ArtifactPair {
            entry: entry.to_path_buf(),
            notes,
            counter,
        })
    }
}

/// Anchor a relative invocation root at the current directory
///
/// Absolute entries and sources are matched against the root by prefix,
/// so a root such as `.` has to be spelled out in full first.
pub(crate) fn absolute_root(root: PathBuf) -> PathBuf {
    if root.is_absolute() {
        return root;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(root),
        Err(_) => root,
    }
}
