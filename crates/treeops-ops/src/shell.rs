//! Deletion delegated to `find` and `rm`.
//!
//! Much faster than the in-process path on huge trees, at the cost of a
//! reduced regex dialect (see [`crate::regex_dialect`]). POSIX only.

use std::path::{Path, PathBuf};

use treeops_core::{
    ExecutionMode, MutationResult, ProtectionPolicy, Result, TreeOpsError, check_directory_safety,
};
use treeops_scan::{ScopedCommand, path_from_bytes};

use crate::delete::DeleteOptions;
use crate::plan::compile_pattern;
use crate::regex_dialect::name_regex_for_find;

/// Paths handed to a single `rm` invocation.
const RM_BATCH_SIZE: usize = 256;

/// Build the `find` command listing what `options` selects.
///
/// Matched directories are printed and pruned, so their contents are never
/// listed separately. Returns `None` when the options select nothing.
pub fn find_command(options: &DeleteOptions) -> Option<ScopedCommand> {
    if !options.include_files && !options.include_subdirectories {
        return None;
    }

    let name_regex = options
        .pattern
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(name_regex_for_find);
    let extensions: Vec<String> = options
        .extensions
        .iter()
        .map(|e| e.trim_start_matches('.'))
        .filter(|e| !e.is_empty())
        .map(|e| format!("*.{e}"))
        .collect();

    let mut command = ScopedCommand::new("find")
        .arg(&options.root)
        .args(["-mindepth", "1"]);
    if !options.recursive {
        command = command.args(["-maxdepth", "1"]);
    }
    if name_regex.is_some() {
        command = command.args(["-regextype", "posix-extended"]);
    }

    let mut clauses: Vec<Vec<String>> = Vec::new();

    if options.include_subdirectories {
        let mut clause = vec!["-type".to_string(), "d".to_string()];
        match (&name_regex, extensions.is_empty()) {
            (Some(re), _) => clause.extend(["-regex".to_string(), re.clone()]),
            // Extensions only ever select files.
            (None, false) => clause.push("-false".to_string()),
            (None, true) => {}
        }
        clause.extend(["-print0".to_string(), "-prune".to_string()]);
        clauses.push(clause);
    }

    if options.include_files {
        let mut clause = vec!["!".to_string(), "-type".to_string(), "d".to_string()];
        let mut alternatives: Vec<Vec<String>> = Vec::new();
        if let Some(re) = &name_regex {
            alternatives.push(vec!["-regex".to_string(), re.clone()]);
        }
        for glob in &extensions {
            alternatives.push(vec!["-iname".to_string(), glob.clone()]);
        }
        if !alternatives.is_empty() {
            clause.push("(".to_string());
            for (i, alternative) in alternatives.into_iter().enumerate() {
                if i > 0 {
                    clause.push("-o".to_string());
                }
                clause.extend(alternative);
            }
            clause.push(")".to_string());
        }
        clause.push("-print0".to_string());
        clauses.push(clause);
    }

    for (i, clause) in clauses.into_iter().enumerate() {
        if i > 0 {
            command = command.arg("-o");
        }
        command = command.arg("(").args(clause).arg(")");
    }

    Some(command)
}

/// Delete what `options` selects using `find` and `rm -rf`.
///
/// A dry run only lists. A non-zero exit from either tool fails the call
/// with one `Process` error carrying its stderr; when listing for a dry run,
/// permission complaints from `find` are logged instead.
pub async fn delete_files_accelerated(
    options: &DeleteOptions,
    policy: &ProtectionPolicy,
    mode: ExecutionMode,
) -> Result<MutationResult> {
    if !cfg!(unix) {
        return Err(TreeOpsError::UnsupportedPlatform {
            operation: "accelerated delete",
        });
    }

    let root = options.root.as_path();
    check_directory_safety(root, policy)?;
    compile_pattern(options.pattern.as_deref())?;

    let mut result = MutationResult::new(mode);

    if options.delete_root {
        std::fs::symlink_metadata(root).map_err(|e| TreeOpsError::io(root, e))?;
        if !mode.is_dry_run() {
            remove_batch(&[root.to_path_buf()]).await?;
        }
        result.push_affected(root);
        return Ok(result);
    }

    let metadata = std::fs::metadata(root).map_err(|e| TreeOpsError::io(root, e))?;
    if !metadata.is_dir() {
        return Err(TreeOpsError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let Some(command) = find_command(options) else {
        return Ok(result);
    };

    let mut candidates = list_candidates(&command, root, mode).await?;
    candidates.sort();

    if !mode.is_dry_run() {
        for batch in candidates.chunks(RM_BATCH_SIZE) {
            remove_batch(batch).await?;
        }
    }

    tracing::info!(
        root = %root.display(),
        count = candidates.len(),
        dry_run = mode.is_dry_run(),
        "accelerated delete finished"
    );
    result.affected = candidates;
    Ok(result)
}

async fn list_candidates(
    command: &ScopedCommand,
    root: &Path,
    mode: ExecutionMode,
) -> Result<Vec<PathBuf>> {
    let output = command.output().await?;
    if !output.success() {
        if mode.is_dry_run() && output.only_permission_errors() {
            tracing::warn!(
                root = %root.display(),
                stderr = %output.stderr.trim(),
                "find skipped unreadable subtrees"
            );
        } else {
            return Err(output.into_error());
        }
    }

    Ok(output.nul_records().map(path_from_bytes).collect())
}

async fn remove_batch(paths: &[PathBuf]) -> Result<()> {
    ScopedCommand::new("rm")
        .args(["-rf", "--"])
        .args(paths)
        .run()
        .await?;
    tracing::debug!(count = paths.len(), "removed batch");
    Ok(())
}
