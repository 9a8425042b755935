//! Tree-wide renaming of entries to their sanitized names.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use treeops_core::{
    ExecutionMode, MutationRecord, MutationResult, ProtectionPolicy, Result,
    check_directory_safety,
};
use treeops_scan::TreeWalker;

use crate::conflict::{Claims, timestamp};
use crate::sanitize::sanitize;

/// Options for [`fix_names`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FixNamesOptions {
    /// Directory whose contents are renamed. Its own name is left alone.
    pub root: PathBuf,
    /// Descend below the root's immediate children.
    pub recursive: bool,
    /// Rename directories instead of files.
    pub directories_only: bool,
}

impl FixNamesOptions {
    /// Options renaming the files directly inside `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }
}

/// Rename every selected entry whose name differs from its sanitized form.
///
/// Entries are handled deepest first so a directory rename never
/// invalidates a path still waiting in the queue. A name collision appends
/// `_YYYYMMDDHHMMSS` before the extension (plus a counter if needed).
/// Failures are recorded per entry and do not stop the run.
pub fn fix_names(
    options: &FixNamesOptions,
    policy: &ProtectionPolicy,
    mode: ExecutionMode,
) -> Result<MutationResult> {
    let root = options.root.as_path();
    check_directory_safety(root, policy)?;

    let mut walker = TreeWalker::unbounded(root);
    if !options.recursive {
        walker = walker.shallow();
    }

    let mut entries: Vec<_> = walker
        .walk()?
        .into_iter()
        .filter(|e| e.is_dir() == options.directories_only)
        .collect();
    entries.sort_by(|a, b| b.depth.cmp(&a.depth));

    let stamp = timestamp();
    let mut claims = Claims::new();
    let mut result = MutationResult::new(mode);

    for entry in entries {
        let fixed = sanitize(&entry.name);
        if fixed == entry.name.as_str() {
            continue;
        }

        let from = entry.fs_path();
        let dir = from.parent().unwrap_or(Path::new("")).to_path_buf();
        let to = claims.claim_stamped(&dir, &fixed, &stamp);

        let record = if mode.is_dry_run() {
            MutationRecord::succeeded(&from, &to, entry.kind)
        } else {
            match fs::rename(&from, &to) {
                Ok(()) => {
                    tracing::debug!(from = %from.display(), to = %to.display(), "renamed");
                    MutationRecord::succeeded(&from, &to, entry.kind)
                }
                Err(err) => {
                    tracing::warn!(path = %from.display(), error = %err, "rename failed");
                    MutationRecord::failed(&from, &to, entry.kind, err)
                }
            }
        };
        result.push_record(record);
    }

    tracing::info!(
        root = %root.display(),
        renamed = result.succeeded(),
        failed = result.failed(),
        dry_run = mode.is_dry_run(),
        "fix names finished"
    );
    Ok(result)
}
