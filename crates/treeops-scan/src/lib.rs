//! Directory walking engine for treeops.
//!
//! This crate enumerates a directory tree into flat [`Entry`] records and
//! narrows them down for listings.
//!
//! # Overview
//!
//! - **In-process walk** via jwalk, depth-bounded, serial, name-ordered
//! - **`find` walk** delegating enumeration to the OS on POSIX systems
//! - **Filtering** by include/exclude regex (invalid patterns are ignored)
//! - **Stable sorting** on name, mtime, type, size, depth, path or parent
//!
//! # Example
//!
//! ```rust,no_run
//! use treeops_scan::{list_directory, TraversalOptions};
//!
//! let options = TraversalOptions::builder()
//!     .root("/path/to/list")
//!     .max_depth(3)
//!     .leaf_only(true)
//!     .build()
//!     .unwrap();
//!
//! for entry in list_directory(&options).unwrap().into_vec() {
//!     println!("{} ({} bytes)", entry.path, entry.size);
//! }
//! ```

mod filter;
mod find;
pub mod process;
mod walker;

pub use filter::{EntryFilter, Selection, apply, compile_lenient, sort_entries};
pub use find::FindWalker;
pub use process::{ProcessOutput, ScopedCommand, path_from_bytes, shell_quote};
pub use walker::{TreeWalker, has_child_subdirectories};

// Re-export core types for convenience
pub use treeops_core::{
    Entry, EntryKind, FilterOptions, SortDirection, SortKey, TraversalOptions, TreeOpsError,
};

use treeops_core::Result;

/// Walk `options.root` in-process and apply the options' filters.
pub fn list_directory(options: &TraversalOptions) -> Result<Selection> {
    let entries = TreeWalker::new(options).walk()?;
    Ok(apply(entries, &options.filter()))
}

/// Walk `options.root` with the OS `find` utility and apply the options'
/// filters. Fails with `UnsupportedPlatform` outside POSIX systems.
pub async fn find_files(options: &TraversalOptions) -> Result<Selection> {
    let entries = FindWalker::new(options).walk().await?;
    Ok(apply(entries, &options.filter()))
}
