//! Bulk mutation engine for treeops.
//!
//! This crate deletes, moves, renames, flattens and cleans directory trees,
//! and normalizes file names. Every operation checks its target paths
//! against a [`ProtectionPolicy`] before touching the disk and can run as a
//! dry run that reports exactly what a live run would do.
//!
//! The free functions are synchronous; [`TreeOps`] wraps them for async
//! callers.

mod clean;
mod conflict;
mod delete;
mod executor;
mod fix_names;
mod flatten;
mod move_op;
mod plan;
pub mod regex_dialect;
mod rename;
mod sanitize;
mod shell;

pub use clean::{CleanOptions, clean_empty_directories};
pub use conflict::{Claims, suffixed_name, timestamp};
pub use delete::{DeleteOptions, delete_files};
pub use executor::TreeOps;
pub use fix_names::{FixNamesOptions, fix_names};
pub use flatten::{FlattenOptions, flatten_directory};
pub use move_op::{MoveOptions, move_files};
pub use plan::{Selector, compile_pattern, select_candidates};
pub use rename::{
    RenameOptions, RenameOutcome, RenamePatternMode, rename, resolve_destination,
    validate_filename,
};
pub use sanitize::{
    MAX_NAME_LEN, PLACEHOLDER_NAME, RESERVED_NAMES, is_allowed, is_reserved, sanitize,
    split_extension,
};
pub use shell::{delete_files_accelerated, find_command};

// Re-export core types for convenience
pub use treeops_core::{
    ExecutionMode, MutationRecord, MutationResult, ProtectionPolicy, Result, TreeOpsError,
};
