//! JWalk-based depth-bounded directory walker.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use jwalk::{Parallelism, WalkDir};

use treeops_core::{Entry, Result, TraversalOptions, TreeOpsError};

/// Walks a directory and produces one [`Entry`] per node below the root.
///
/// Traversal is depth-first with children in name order. The walk runs
/// serially so open file handles stay bounded.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    options: TraversalOptions,
    depth_limit: usize,
}

impl TreeWalker {
    /// Create a walker bounded by the options' (clamped) depth.
    pub fn new(options: &TraversalOptions) -> Self {
        Self {
            depth_limit: options.effective_max_depth(),
            options: options.clone(),
        }
    }

    /// Create a walker over the whole subtree, emitting files and
    /// directories. Mutators use this; listings go through [`TreeWalker::new`].
    pub fn unbounded(root: impl Into<PathBuf>) -> Self {
        Self {
            options: TraversalOptions::new(root),
            depth_limit: usize::MAX,
        }
    }

    /// Limit the walk to the root's immediate children.
    pub fn shallow(mut self) -> Self {
        self.depth_limit = 1;
        self
    }

    /// Compute `has_child_subdirectories` for directory entries.
    pub fn with_subdirectory_check(mut self, check: bool) -> Self {
        self.options.detect_subdirectories = check;
        self
    }

    /// The root being walked.
    pub fn root(&self) -> &Path {
        &self.options.root
    }

    /// Perform the walk.
    ///
    /// Errors on the root are fatal. Inside the tree, permission errors only
    /// drop the affected subtree; any other I/O error aborts the walk.
    pub fn walk(&self) -> Result<Vec<Entry>> {
        let root = self.root();
        verify_root(root)?;

        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1)
            .max_depth(self.depth_limit);

        let check_subdirectories = self.options.needs_subdirectory_check();
        let mut entries = Vec::new();

        for entry_result in walker {
            let dir_entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    absorb_walk_error(root, &err)?;
                    continue;
                }
            };

            if let Some(err) = dir_entry.read_children_error.as_ref() {
                absorb_walk_error(root, err)?;
            }

            let path = dir_entry.path();
            let depth = dir_entry.depth();

            let metadata = match dir_entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    absorb_walk_error(root, &err)?;
                    continue;
                }
            };
            let modified = metadata.modified().unwrap_or(UNIX_EPOCH);

            if dir_entry.file_type().is_dir() {
                if !self.options.include_directories {
                    continue;
                }

                let has_subdirectories =
                    check_subdirectories.then(|| has_child_subdirectories(&path));

                // Suppressed from output, still recursed into by jwalk.
                if self.options.leaf_only && has_subdirectories == Some(true) {
                    continue;
                }

                entries.push(Entry::directory(&path, modified, depth, has_subdirectories));
            } else {
                if !self.options.include_files {
                    continue;
                }

                let name = dir_entry.file_name().to_string_lossy();
                if !self.options.matches_extension(&name) {
                    continue;
                }

                entries.push(Entry::file(&path, metadata.len(), modified, depth));
            }
        }

        tracing::debug!(
            root = %root.display(),
            entries = entries.len(),
            depth_limit = self.depth_limit,
            "walk complete"
        );

        Ok(entries)
    }
}

/// Fail unless `root` is a readable directory.
pub(crate) fn verify_root(root: &Path) -> Result<()> {
    let metadata = fs::metadata(root).map_err(|e| TreeOpsError::io(root, e))?;
    if !metadata.is_dir() {
        return Err(TreeOpsError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    // Listing the root must succeed; only nested failures are absorbed.
    fs::read_dir(root).map_err(|e| TreeOpsError::io(root, e))?;
    Ok(())
}

/// Whether any immediate child of `dir` is a directory. Unreadable
/// directories count as having none.
pub fn has_child_subdirectories(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(children) => children
            .flatten()
            .any(|child| child.file_type().map(|t| t.is_dir()).unwrap_or(false)),
        Err(_) => false,
    }
}

/// Swallow permission errors with a warning; convert everything else.
fn absorb_walk_error(root: &Path, err: &jwalk::Error) -> Result<()> {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());

    match err.io_error() {
        Some(io_err) if io_err.kind() == io::ErrorKind::PermissionDenied => {
            tracing::warn!(path = %path.display(), "permission denied, skipping subtree");
            Ok(())
        }
        Some(io_err) => Err(TreeOpsError::io(
            path,
            io::Error::new(io_err.kind(), io_err.to_string()),
        )),
        None => Err(TreeOpsError::Io {
            path,
            source: io::Error::other(err.to_string()),
        }),
    }
}
