//! Moving files and directory contents between directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use treeops_core::{
    EntryKind, ExecutionMode, MutationRecord, MutationResult, ProtectionPolicy, Result,
    TreeOpsError, check_all, is_within,
};

use crate::conflict::is_occupied;
use crate::plan::{Selector, compile_pattern, select_candidates};

/// Options for [`move_files`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoveOptions {
    /// File or directory to move from.
    pub source: PathBuf,
    /// Directory receiving the moved entries.
    pub target: PathBuf,
    /// Regex matched against entry names. `None` matches everything.
    pub pattern: Option<String>,
    /// Descend below the source's immediate children.
    pub recursive: bool,
    /// Move matching files.
    pub include_files: bool,
    /// Move matching directories whole.
    pub include_subdirectories: bool,
    /// Move `source` itself into `target`, keeping its name.
    pub rename_only: bool,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            target: PathBuf::new(),
            pattern: None,
            recursive: false,
            include_files: true,
            include_subdirectories: false,
            rename_only: false,
        }
    }
}

impl MoveOptions {
    /// Options moving the files directly inside `source` into `target`.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }
}

/// One planned relocation.
#[derive(Debug, Clone, PartialEq)]
struct Relocation {
    from: PathBuf,
    to: PathBuf,
    kind: EntryKind,
}

/// Move the entries selected by `options` from `source` into `target`.
///
/// Relative layout below the source is preserved and missing target
/// directories are created. Moving the source itself (a file source, or
/// `rename_only`) is a single step whose errors propagate. A directory move
/// records each entry on its own: an occupied destination or a failed
/// relocation gets a failed record, and the remaining entries still move.
pub fn move_files(
    options: &MoveOptions,
    policy: &ProtectionPolicy,
    mode: ExecutionMode,
) -> Result<MutationResult> {
    let source = options.source.as_path();
    let target = options.target.as_path();
    check_all([source, target], policy)?;

    let metadata = fs::symlink_metadata(source).map_err(|e| TreeOpsError::io(source, e))?;
    let whole_source = options.rename_only || !metadata.is_dir();
    let plan = plan_moves(options, metadata.is_dir())?;

    let mut result = MutationResult::new(mode);
    for relocation in plan {
        match apply(&relocation, mode) {
            Ok(()) => {
                result.push_affected(relocation.from.clone());
                result.push_record(MutationRecord::succeeded(
                    &relocation.from,
                    &relocation.to,
                    relocation.kind,
                ));
            }
            Err(err) if whole_source => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "move failed");
                result.push_record(MutationRecord::failed(
                    &relocation.from,
                    &relocation.to,
                    relocation.kind,
                    err,
                ));
            }
        }
    }

    tracing::info!(
        source = %source.display(),
        target = %target.display(),
        moved = result.succeeded(),
        failed = result.failed(),
        dry_run = mode.is_dry_run(),
        "move finished"
    );
    Ok(result)
}

/// Check one relocation and, when live, perform it. A dry run runs the same
/// checks so it reports the same failures.
fn apply(relocation: &Relocation, mode: ExecutionMode) -> Result<()> {
    let Relocation { from, to, kind } = relocation;
    if *kind == EntryKind::Directory && is_within(&absolute(to), &absolute(from)) {
        return Err(TreeOpsError::SourceIsAncestor {
            source_path: from.clone(),
            destination: to.clone(),
        });
    }
    if is_occupied(to) {
        return Err(TreeOpsError::AlreadyExists { path: to.clone() });
    }
    if mode.is_dry_run() {
        return Ok(());
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| TreeOpsError::io(parent, e))?;
    }
    relocate(from, to).map_err(|e| TreeOpsError::io(from, e))?;
    tracing::debug!(from = %from.display(), to = %to.display(), "moved");
    Ok(())
}

/// Anchor a relative path at the working directory, without touching the
/// filesystem otherwise.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn plan_moves(options: &MoveOptions, source_is_dir: bool) -> Result<Vec<Relocation>> {
    let source = options.source.as_path();
    let kind = if source_is_dir {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    if options.rename_only || !source_is_dir {
        let name = source.file_name().ok_or_else(|| TreeOpsError::InvalidName {
            path: source.to_path_buf(),
            reason: "path has no final component".into(),
        })?;

        if !options.rename_only {
            let pattern = compile_pattern(options.pattern.as_deref())?;
            if pattern.is_some_and(|re| !re.is_match(&name.to_string_lossy())) {
                return Ok(Vec::new());
            }
        }

        return Ok(vec![Relocation {
            from: source.to_path_buf(),
            to: options.target.join(name),
            kind,
        }]);
    }

    let selector = Selector::new(
        options.pattern.as_deref(),
        &[],
        options.include_files,
        options.include_subdirectories,
    )?;

    if is_within(&absolute(&options.target), &absolute(source)) {
        return Err(TreeOpsError::SourceIsAncestor {
            source_path: source.to_path_buf(),
            destination: options.target.clone(),
        });
    }

    select_candidates(source, options.recursive, &selector)?
        .into_iter()
        .map(|entry| {
            let from = entry.fs_path();
            let relative = from.strip_prefix(source).unwrap_or(&from).to_path_buf();
            Ok(Relocation {
                to: options.target.join(relative),
                from,
                kind: entry.kind,
            })
        })
        .collect()
}

/// Move one file or directory, falling back to copy + remove when the
/// destination is on another filesystem.
pub(crate) fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            let file_type = fs::symlink_metadata(from)?.file_type();
            if file_type.is_dir() {
                copy_dir_recursive(from, to)?;
                fs::remove_dir_all(from)
            } else {
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
        }
        Err(err) => Err(err),
    }
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&path, &dest_path)?;
        } else {
            fs::copy(&path, &dest_path)?;
        }
    }

    Ok(())
}
