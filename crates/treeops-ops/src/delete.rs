//! Pattern-driven deletion.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use treeops_core::{
    Entry, EntryKind, ExecutionMode, MutationRecord, MutationResult, ProtectionPolicy, Result,
    TreeOpsError, check_directory_safety,
};

use crate::plan::{Selector, select_candidates};

/// Options for [`delete_files`] and
/// [`delete_files_accelerated`](crate::delete_files_accelerated).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteOptions {
    /// Directory to delete from.
    pub root: PathBuf,
    /// Regex matched against entry names. `None` matches everything.
    pub pattern: Option<String>,
    /// File extensions (without the dot) that also select files.
    pub extensions: Vec<String>,
    /// Descend below the root's immediate children.
    pub recursive: bool,
    /// Delete matching files.
    pub include_files: bool,
    /// Delete matching directories, with everything in them.
    pub include_subdirectories: bool,
    /// Remove `root` itself in one step, ignoring every other option.
    pub delete_root: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            pattern: None,
            extensions: Vec::new(),
            recursive: false,
            include_files: true,
            include_subdirectories: false,
            delete_root: false,
        }
    }
}

impl DeleteOptions {
    /// Options deleting the files directly inside `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub(crate) fn selector(&self) -> Result<Selector> {
        Selector::new(
            self.pattern.as_deref(),
            &self.extensions,
            self.include_files,
            self.include_subdirectories,
        )
    }
}

/// Delete the entries of `options.root` selected by `options`.
///
/// The root is checked against `policy` before anything is read. In
/// [`ExecutionMode::DryRun`] the returned paths are exactly those a live
/// run would remove. An entry that cannot be removed gets a failed record
/// and the run moves on; only `delete_root` fails the whole call.
pub fn delete_files(
    options: &DeleteOptions,
    policy: &ProtectionPolicy,
    mode: ExecutionMode,
) -> Result<MutationResult> {
    let root = options.root.as_path();
    check_directory_safety(root, policy)?;

    let mut result = MutationResult::new(mode);

    if options.delete_root {
        let metadata = fs::symlink_metadata(root).map_err(|e| TreeOpsError::io(root, e))?;
        if !mode.is_dry_run() {
            let kind = if metadata.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            remove_entry(root, kind)?;
        }
        result.push_affected(root);
        tracing::info!(root = %root.display(), dry_run = mode.is_dry_run(), "deleted root");
        return Ok(result);
    }

    let selector = options.selector()?;
    let candidates = select_candidates(root, options.recursive, &selector)?;

    remove_candidates(candidates, &mut result, |path, kind| {
        if mode.is_dry_run() {
            Ok(())
        } else {
            remove_entry(path, kind)
        }
    });

    tracing::info!(
        root = %root.display(),
        count = result.affected.len(),
        failed = result.failed(),
        dry_run = mode.is_dry_run(),
        "delete finished"
    );
    Ok(result)
}

/// Apply `remove` to each candidate, recording every outcome. A failure is
/// recorded and the loop continues.
fn remove_candidates(
    candidates: Vec<Entry>,
    result: &mut MutationResult,
    mut remove: impl FnMut(&Path, EntryKind) -> Result<()>,
) {
    for entry in candidates {
        let path = entry.fs_path();
        match remove(&path, entry.kind) {
            Ok(()) => {
                tracing::debug!(
                    path = %path.display(),
                    dry_run = result.mode.is_dry_run(),
                    "deleted"
                );
                result.push_record(MutationRecord::succeeded(&path, &path, entry.kind));
                result.push_affected(path);
            }
            Err(err) => {
                tracing::warn!(error = %err, "delete failed");
                result.push_record(MutationRecord::failed(&path, &path, entry.kind, err));
            }
        }
    }
}

/// Remove a file, or a directory with all of its contents.
pub(crate) fn remove_entry(path: &Path, kind: EntryKind) -> Result<()> {
    let removed = match kind {
        EntryKind::Directory => fs::remove_dir_all(path),
        EntryKind::File => fs::remove_file(path),
    };
    removed.map_err(|e| TreeOpsError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_failed_removal_is_recorded_and_skipped() {
        let temp = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(temp.path().join(name), "").unwrap();
        }
        let selector = DeleteOptions::new(temp.path()).selector().unwrap();
        let candidates = select_candidates(temp.path(), false, &selector).unwrap();

        let mut result = MutationResult::new(ExecutionMode::Live);
        remove_candidates(candidates, &mut result, |path, kind| {
            if path.ends_with("b.txt") {
                Err(TreeOpsError::PermissionDenied {
                    path: path.to_path_buf(),
                })
            } else {
                remove_entry(path, kind)
            }
        });

        assert_eq!(
            result.affected,
            vec![temp.path().join("a.txt"), temp.path().join("c.txt")]
        );
        assert_eq!(result.succeeded(), 2);
        let failure = result.failures().next().unwrap();
        assert_eq!(failure.original_path, temp.path().join("b.txt"));
        assert!(failure.error.as_deref().unwrap().contains("Permission denied"));
        assert!(temp.path().join("b.txt").exists());
        assert!(!temp.path().join("c.txt").exists());
    }
}
