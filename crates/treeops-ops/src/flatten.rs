//! Collapsing a directory tree into a single level.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use treeops_core::{
    Entry, EntryKind, ExecutionMode, MutationRecord, MutationResult, ProtectionPolicy, Result,
    TreeOpsError, check_directory_safety,
};
use treeops_scan::TreeWalker;

use crate::clean::{CleanOptions, clean_empty_directories};
use crate::conflict::Claims;
use crate::fix_names::{FixNamesOptions, fix_names};
use crate::move_op::relocate;

/// Options for [`flatten_directory`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlattenOptions {
    /// Directory that receives every file below it.
    pub root: PathBuf,
}

impl FlattenOptions {
    /// Options flattening `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Move every file below `options.root` directly into it.
///
/// Runs in three phases: directory names are sanitized tree-wide, files are
/// moved up (a taken name becomes `name_1.ext`, `name_2.ext`, ...), and the
/// emptied subdirectories are removed bottom-up. A file that fails to move
/// is recorded and left where it was, which keeps its directory alive.
pub fn flatten_directory(
    options: &FlattenOptions,
    policy: &ProtectionPolicy,
    mode: ExecutionMode,
) -> Result<MutationResult> {
    let root = options.root.as_path();
    check_directory_safety(root, policy)?;

    let mut result = fix_names(
        &FixNamesOptions {
            root: root.to_path_buf(),
            recursive: true,
            directories_only: true,
        },
        policy,
        mode,
    )?;

    // A dry run renamed nothing, so walked paths still carry the old
    // directory names; map them onto the planned ones.
    let renames: HashMap<PathBuf, PathBuf> = if mode.is_dry_run() {
        result
            .records
            .iter()
            .filter(|r| r.success)
            .map(|r| (r.original_path.clone(), r.new_path.clone()))
            .collect()
    } else {
        HashMap::new()
    };

    // Sorting by planned path reproduces the live walk order: parents
    // first, siblings by their final names.
    let mut entries: Vec<(PathBuf, Entry)> = TreeWalker::unbounded(root)
        .walk()?
        .into_iter()
        .map(|entry| (planned_path(root, &entry.fs_path(), &renames), entry))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut claims = Claims::new();
    for (path, _) in entries.iter().filter(|(_, e)| e.depth == 1) {
        claims.claim(path.clone());
    }

    let nested_files = entries.iter().filter(|(_, e)| e.is_file() && e.depth >= 2);
    for (from, _) in nested_files {
        let to = claims.claim_numbered(root, from.file_name().unwrap_or_default());

        let record = if mode.is_dry_run() {
            MutationRecord::succeeded(from, &to, EntryKind::File)
        } else {
            match relocate(from, &to) {
                Ok(()) => {
                    tracing::debug!(from = %from.display(), to = %to.display(), "moved up");
                    MutationRecord::succeeded(from, &to, EntryKind::File)
                }
                Err(err) => {
                    let err = TreeOpsError::io(from, err);
                    tracing::warn!(error = %err, "could not move file up");
                    MutationRecord::failed(from, &to, EntryKind::File, err)
                }
            }
        };
        result.push_record(record);
    }

    if mode.is_dry_run() {
        // Every directory would be emptied; report them in the order the
        // live sweep removes them.
        let mut dirs: Vec<&PathBuf> = entries
            .iter()
            .filter_map(|(path, e)| e.is_dir().then_some(path))
            .collect();
        dirs.sort_by(|a, b| children_first(a, b));
        for dir in dirs {
            result.push_affected(dir.clone());
        }
    } else {
        let cleaned = clean_empty_directories(&CleanOptions::new(root), policy, mode)?;
        result.extend(cleaned);
    }

    tracing::info!(
        root = %root.display(),
        moved = result.succeeded(),
        failed = result.failed(),
        removed = result.affected.len(),
        dry_run = mode.is_dry_run(),
        "flatten finished"
    );
    Ok(result)
}

/// Where `path` ends up once the directory renames in `renames` apply.
fn planned_path(root: &Path, path: &Path, renames: &HashMap<PathBuf, PathBuf>) -> PathBuf {
    let Ok(relative) = path.strip_prefix(root) else {
        return path.to_path_buf();
    };

    let mut original = root.to_path_buf();
    let mut planned = root.to_path_buf();
    for component in relative.components() {
        original.push(component);
        match renames.get(&original).and_then(|to| to.file_name()) {
            Some(name) => planned.push(name),
            None => planned.push(component),
        }
    }
    planned
}

/// Post-order: descendants before their ancestors, siblings by name.
fn children_first(a: &Path, b: &Path) -> Ordering {
    if a == b {
        Ordering::Equal
    } else if a.starts_with(b) {
        Ordering::Less
    } else if b.starts_with(a) {
        Ordering::Greater
    } else {
        a.cmp(b)
    }
}
