//! Single-path rename with optional regex substitution.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use treeops_core::{ExecutionMode, ProtectionPolicy, Result, TreeOpsError, check_all};

use crate::conflict::is_occupied;
use crate::move_op::relocate;
use crate::plan::compile_pattern;

/// Which file name the rename pattern is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenamePatternMode {
    /// Rewrite the target's file name, keeping the target's directory.
    #[default]
    TargetName,
    /// Rewrite the source's file name and place it in the target's
    /// directory.
    SourceName,
}

/// Options for [`rename`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenameOptions {
    /// Existing path to rename.
    pub source: PathBuf,
    /// Destination path, or the path whose directory receives the result
    /// when a pattern is set.
    pub target: PathBuf,
    /// Regex applied to one of the two file names.
    pub pattern: Option<String>,
    /// Replacement for every match; `$1` style groups are expanded.
    pub replacement: String,
    /// Which name the pattern rewrites.
    pub pattern_mode: RenamePatternMode,
}

impl RenameOptions {
    /// Plain rename of `source` to `target`.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    /// Rewrite a name with `pattern` → `replacement`.
    pub fn with_pattern(
        mut self,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        mode: RenamePatternMode,
    ) -> Self {
        self.pattern = Some(pattern.into());
        self.replacement = replacement.into();
        self.pattern_mode = mode;
        self
    }
}

/// What [`rename`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "path", rename_all = "snake_case")]
pub enum RenameOutcome {
    /// The source now lives (or would live) at this path.
    Renamed(PathBuf),
    /// The computed destination equals the source.
    Unchanged,
}

/// Compute where `options.source` ends up.
pub fn resolve_destination(options: &RenameOptions) -> Result<PathBuf> {
    let Some(re) = compile_pattern(options.pattern.as_deref())? else {
        return Ok(options.target.clone());
    };

    let base_path = match options.pattern_mode {
        RenamePatternMode::TargetName => &options.target,
        RenamePatternMode::SourceName => &options.source,
    };
    let base = file_name_of(base_path)?;
    let renamed = re.replace_all(&base, options.replacement.as_str());

    let dir = options.target.parent().unwrap_or(Path::new(""));
    Ok(dir.join(renamed.as_ref()))
}

/// Rename `options.source`.
///
/// Both source and destination must pass `policy`. An occupied destination
/// fails with `AlreadyExists`; nothing is overwritten.
pub fn rename(
    options: &RenameOptions,
    policy: &ProtectionPolicy,
    mode: ExecutionMode,
) -> Result<RenameOutcome> {
    let source = options.source.as_path();
    let destination = resolve_destination(options)?;
    check_all([source, destination.as_path()], policy)?;

    let new_name = file_name_of(&destination)?;
    validate_filename(&new_name).map_err(|reason| TreeOpsError::InvalidName {
        path: destination.clone(),
        reason,
    })?;

    fs::symlink_metadata(source).map_err(|e| TreeOpsError::io(source, e))?;

    if destination == source {
        return Ok(RenameOutcome::Unchanged);
    }
    if is_occupied(&destination) {
        return Err(TreeOpsError::AlreadyExists { path: destination });
    }

    if !mode.is_dry_run() {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TreeOpsError::io(parent, e))?;
        }
        relocate(source, &destination).map_err(|e| TreeOpsError::io(source, e))?;
    }

    tracing::info!(
        from = %source.display(),
        to = %destination.display(),
        dry_run = mode.is_dry_run(),
        "renamed"
    );
    Ok(RenameOutcome::Renamed(destination))
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| TreeOpsError::InvalidName {
            path: path.to_path_buf(),
            reason: "path has no final component".into(),
        })
}

/// Validate a file name for renaming.
pub fn validate_filename(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".into());
    }

    if name.chars().count() > 255 {
        return Err("Name is too long (max 255 characters)".into());
    }

    for c in ['/', '\0'] {
        if name.contains(c) {
            return Err(format!("Name cannot contain '{}'", c.escape_default()));
        }
    }

    #[cfg(target_os = "windows")]
    {
        for c in ['\\', ':', '*', '?', '"', '<', '>', '|'] {
            if name.contains(c) {
                return Err(format!("Name cannot contain '{}'", c));
            }
        }

        if crate::sanitize::is_reserved(name) {
            return Err("Reserved filename".into());
        }
    }

    if name == "." || name == ".." {
        return Err("'.' and '..' are reserved names".into());
    }

    Ok(())
}
