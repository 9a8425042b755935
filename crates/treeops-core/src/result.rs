//! Outcome types for bulk mutations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ExecutionMode;
use crate::entry::EntryKind;

/// What happened to a single entry during a bulk mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    /// Path before the mutation.
    pub original_path: PathBuf,
    /// Path after the mutation (or the path it would have had).
    pub new_path: PathBuf,
    /// File or directory.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Whether the entry was (or would be) mutated.
    pub success: bool,
    /// Failure message when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationRecord {
    /// A successful mutation. Deletions use the same path for both sides.
    pub fn succeeded(original: &Path, new: &Path, kind: EntryKind) -> Self {
        Self {
            original_path: original.to_path_buf(),
            new_path: new.to_path_buf(),
            kind,
            success: true,
            error: None,
        }
    }

    /// A failed mutation with its error message.
    pub fn failed(original: &Path, new: &Path, kind: EntryKind, error: impl ToString) -> Self {
        Self {
            original_path: original.to_path_buf(),
            new_path: new.to_path_buf(),
            kind,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Result of a completed bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    /// Whether anything was actually changed.
    pub mode: ExecutionMode,
    /// Paths removed or relocated (delete, move, clean-empty, flatten).
    #[serde(default)]
    pub affected: Vec<PathBuf>,
    /// Per-entry outcomes (delete, move, rename, flatten, fix-names).
    #[serde(default)]
    pub records: Vec<MutationRecord>,
}

impl MutationResult {
    /// Create an empty result for the given mode.
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            affected: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Record an affected path.
    pub fn push_affected(&mut self, path: impl Into<PathBuf>) {
        self.affected.push(path.into());
    }

    /// Record a per-entry outcome.
    pub fn push_record(&mut self, record: MutationRecord) {
        self.records.push(record);
    }

    /// Append everything from another result.
    pub fn extend(&mut self, other: MutationResult) {
        self.affected.extend(other.affected);
        self.records.extend(other.records);
    }

    /// Number of successful records.
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.success).count()
    }

    /// Number of failed records.
    pub fn failed(&self) -> usize {
        self.records.iter().filter(|r| !r.success).count()
    }

    /// Check if no record failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Failed records only.
    pub fn failures(&self) -> impl Iterator<Item = &MutationRecord> {
        self.records.iter().filter(|r| !r.success)
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self, action: &str) -> String {
        let prefix = if self.mode.is_dry_run() { "[dry run] " } else { "" };
        let count = self.affected.len().max(self.succeeded());

        if self.failed() == 0 {
            format!("{prefix}{action} {count} items")
        } else {
            format!("{prefix}{action} {count} items, {} failed", self.failed())
        }
    }
}
