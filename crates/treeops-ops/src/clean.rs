//! Removal of empty directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use treeops_core::{
    ExecutionMode, MutationResult, ProtectionPolicy, Result, TreeOpsError, check_directory_safety,
};

/// Options for [`clean_empty_directories`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CleanOptions {
    /// Directory to clean. Never removed itself.
    pub root: PathBuf,
    /// Sweep the whole subtree, collapsing nested empties in one pass.
    pub recursive: bool,
}

impl CleanOptions {
    /// Options for a recursive sweep of `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: true,
        }
    }
}

/// Remove directories below `options.root` that contain nothing.
///
/// Children are visited before their parents, so with `recursive` a chain
/// of directories that only hold empty directories disappears entirely. A
/// dry run reports the same chain.
pub fn clean_empty_directories(
    options: &CleanOptions,
    policy: &ProtectionPolicy,
    mode: ExecutionMode,
) -> Result<MutationResult> {
    let root = options.root.as_path();
    check_directory_safety(root, policy)?;

    let metadata = fs::metadata(root).map_err(|e| TreeOpsError::io(root, e))?;
    if !metadata.is_dir() {
        return Err(TreeOpsError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut result = MutationResult::new(mode);
    let mut sweep = Sweep {
        mode,
        recursive: options.recursive,
        result: &mut result,
    };
    for child in child_directories(root)? {
        if sweep.visit(&child)? {
            sweep.remove(&child)?;
        }
    }

    tracing::info!(
        root = %root.display(),
        count = result.affected.len(),
        dry_run = mode.is_dry_run(),
        "clean finished"
    );
    Ok(result)
}

struct Sweep<'a> {
    mode: ExecutionMode,
    recursive: bool,
    result: &'a mut MutationResult,
}

impl Sweep<'_> {
    /// Whether `dir` is empty once its own empty children are gone.
    fn visit(&mut self, dir: &Path) -> Result<bool> {
        let children = match read_children(dir) {
            Ok(children) => children,
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                tracing::warn!(path = %dir.display(), "skipping unreadable directory");
                return Ok(false);
            }
            Err(err) => return Err(TreeOpsError::io(dir, err)),
        };

        let mut empty = true;
        for (path, is_dir) in children {
            if is_dir && self.recursive && self.visit(&path)? {
                self.remove(&path)?;
            } else {
                empty = false;
            }
        }
        Ok(empty)
    }

    fn remove(&mut self, dir: &Path) -> Result<()> {
        if !self.mode.is_dry_run() {
            fs::remove_dir(dir).map_err(|e| TreeOpsError::io(dir, e))?;
            tracing::debug!(path = %dir.display(), "removed empty directory");
        }
        self.result.push_affected(dir);
        Ok(())
    }
}

/// Children of `dir` in name order, flagged when they are real directories.
fn read_children(dir: &Path) -> io::Result<Vec<(PathBuf, bool)>> {
    let mut children = fs::read_dir(dir)?
        .map(|entry| {
            let entry = entry?;
            Ok((entry.path(), entry.file_type()?.is_dir()))
        })
        .collect::<io::Result<Vec<_>>>()?;
    children.sort();
    Ok(children)
}

fn child_directories(root: &Path) -> Result<Vec<PathBuf>> {
    let children = read_children(root).map_err(|e| TreeOpsError::io(root, e))?;
    Ok(children
        .into_iter()
        .filter_map(|(path, is_dir)| is_dir.then_some(path))
        .collect())
}
