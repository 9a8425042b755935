//! Async facade over every tree operation.

use treeops_core::{
    ExecutionMode, MutationResult, ProtectionPolicy, Result, TraversalOptions, TreeOpsError,
};
use treeops_scan::Selection;

use crate::clean::{CleanOptions, clean_empty_directories};
use crate::delete::{DeleteOptions, delete_files};
use crate::fix_names::{FixNamesOptions, fix_names};
use crate::flatten::{FlattenOptions, flatten_directory};
use crate::move_op::{MoveOptions, move_files};
use crate::rename::{RenameOptions, RenameOutcome, rename};
use crate::shell::delete_files_accelerated;

/// Runs tree operations under one protection policy and execution mode.
///
/// Blocking filesystem work is moved onto tokio's blocking pool, one
/// operation at a time.
#[derive(Debug, Clone, Default)]
pub struct TreeOps {
    /// Checked before any mutation touches the disk.
    pub policy: ProtectionPolicy,
    /// Live or dry run.
    pub mode: ExecutionMode,
}

impl TreeOps {
    /// Create a live executor with the given policy.
    pub fn new(policy: ProtectionPolicy) -> Self {
        Self {
            policy,
            mode: ExecutionMode::Live,
        }
    }

    /// Set the execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Switch to dry-run mode.
    pub fn dry_run(self) -> Self {
        self.with_mode(ExecutionMode::DryRun)
    }

    /// List a directory in-process.
    pub async fn list_directory(&self, options: TraversalOptions) -> Result<Selection> {
        blocking(move || treeops_scan::list_directory(&options)).await
    }

    /// List a directory through `find`.
    pub async fn find_files(&self, options: TraversalOptions) -> Result<Selection> {
        treeops_scan::find_files(&options).await
    }

    /// Delete matching entries in-process.
    pub async fn delete_files(&self, options: DeleteOptions) -> Result<MutationResult> {
        let (policy, mode) = (self.policy.clone(), self.mode);
        blocking(move || delete_files(&options, &policy, mode)).await
    }

    /// Delete matching entries with `find` and `rm`.
    pub async fn delete_files_accelerated(
        &self,
        options: DeleteOptions,
    ) -> Result<MutationResult> {
        delete_files_accelerated(&options, &self.policy, self.mode).await
    }

    /// Move matching entries between directories.
    pub async fn move_files(&self, options: MoveOptions) -> Result<MutationResult> {
        let (policy, mode) = (self.policy.clone(), self.mode);
        blocking(move || move_files(&options, &policy, mode)).await
    }

    /// Rename a single path.
    pub async fn rename(&self, options: RenameOptions) -> Result<RenameOutcome> {
        let (policy, mode) = (self.policy.clone(), self.mode);
        blocking(move || rename(&options, &policy, mode)).await
    }

    /// Flatten a tree into its root.
    pub async fn flatten_directory(&self, options: FlattenOptions) -> Result<MutationResult> {
        let (policy, mode) = (self.policy.clone(), self.mode);
        blocking(move || flatten_directory(&options, &policy, mode)).await
    }

    /// Remove empty directories.
    pub async fn clean_empty_directories(&self, options: CleanOptions) -> Result<MutationResult> {
        let (policy, mode) = (self.policy.clone(), self.mode);
        blocking(move || clean_empty_directories(&options, &policy, mode)).await
    }

    /// Rename entries to their sanitized names.
    pub async fn fix_file_names(&self, options: FixNamesOptions) -> Result<MutationResult> {
        let (policy, mode) = (self.policy.clone(), self.mode);
        blocking(move || fix_names(&options, &policy, mode)).await
    }
}

async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| TreeOpsError::Task {
            message: err.to_string(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_policy_is_enforced_through_facade() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("keep"), "").unwrap();

        let ops = TreeOps::new(ProtectionPolicy::default().with_depth_range(60, 64));
        let err = ops
            .delete_files(DeleteOptions::new(temp.path()))
            .await
            .unwrap_err();

        assert!(err.is_policy_violation());
        assert!(temp.path().join("keep").exists());
    }

    #[tokio::test]
    async fn test_dry_run_mode_is_carried() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("gone"), "").unwrap();

        let policy = ProtectionPolicy::default()
            .with_depth_range(1, 64)
            .allow_protected(true);
        let result = TreeOps::new(policy)
            .dry_run()
            .delete_files(DeleteOptions::new(temp.path()))
            .await
            .unwrap();

        assert!(result.mode.is_dry_run());
        assert_eq!(result.affected, vec![temp.path().join("gone")]);
        assert!(temp.path().join("gone").exists());
    }
}
