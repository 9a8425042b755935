//! Core types and policy for treeops.
//!
//! This crate provides the data model shared by the walker and the mutators:
//! walked entries, traversal options, the protection policy and its
//! pre-flight check, execution mode, errors and mutation results.

mod config;
mod entry;
mod error;
pub mod guard;
mod result;

pub use config::{
    DEFAULT_MAX_DEPTH, DEFAULT_MIN_DEPTH, ExecutionMode, FilterOptions, MAX_TRAVERSAL_DEPTH,
    MIN_TRAVERSAL_DEPTH, ProtectionPolicy, SortDirection, SortKey, TraversalOptions,
    TraversalOptionsBuilder, clamp_depth,
};
pub use entry::{Entry, EntryKind, with_trailing_separator};
pub use error::{Result, TreeOpsError};
pub use guard::{check_all, check_directory_safety, is_within, path_depth};
pub use result::{MutationRecord, MutationResult};
