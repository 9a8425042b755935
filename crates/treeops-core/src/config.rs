//! Traversal options, protection policy and execution mode.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Smallest depth a listing may be limited to.
pub const MIN_TRAVERSAL_DEPTH: usize = 1;

/// Largest depth a listing may be limited to.
pub const MAX_TRAVERSAL_DEPTH: usize = 9;

/// Clamp a requested listing depth into the supported range.
pub fn clamp_depth(depth: usize) -> usize {
    depth.clamp(MIN_TRAVERSAL_DEPTH, MAX_TRAVERSAL_DEPTH)
}

/// Key used to order listing results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SortKey {
    /// Base name, lexicographic.
    #[default]
    #[strum(to_string = "name")]
    Name,
    /// Modification time, chronological.
    #[strum(to_string = "mtime", serialize = "modified", serialize = "date")]
    Mtime,
    /// Entry type (directories first).
    #[strum(to_string = "type")]
    Type,
    /// Size in bytes.
    #[strum(to_string = "size")]
    Size,
    /// Walk depth.
    #[strum(to_string = "depth")]
    Depth,
    /// Full path.
    #[strum(to_string = "path", serialize = "fullpath", serialize = "full_path")]
    Path,
    /// Parent path.
    #[strum(to_string = "parent")]
    Parent,
}

/// Direction applied to the sort comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Whether a mutation touches the filesystem or only reports what it would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionMode {
    /// Perform the mutation.
    #[default]
    Live,
    /// Compute the effect set without mutating anything.
    DryRun,
}

impl ExecutionMode {
    /// Pick the mode from a dry-run flag.
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run { Self::DryRun } else { Self::Live }
    }

    /// Check if this mode must not touch the filesystem.
    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }
}

/// Post-walk filtering, ordering and truncation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Keep only entries whose name matches this regex.
    #[serde(default)]
    pub include_pattern: Option<String>,
    /// Drop entries whose name matches this regex.
    #[serde(default)]
    pub exclude_pattern: Option<String>,
    /// Sort key.
    #[serde(default)]
    pub sort_by: SortKey,
    /// Sort direction.
    #[serde(default)]
    pub sort_direction: SortDirection,
    /// Truncate the sorted result to this many records.
    #[serde(default)]
    pub max_records: Option<usize>,
    /// Return the first entry (or the placeholder) instead of a list.
    #[serde(default)]
    pub single_result: bool,
}

/// Input to a directory walk.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct TraversalOptions {
    /// Directory to walk. Never emitted itself.
    pub root: PathBuf,

    /// Emit file entries.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_files: bool,

    /// Emit directory entries.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_directories: bool,

    /// Deepest level to emit, clamped to 1..=9.
    #[builder(setter(custom), default = "1")]
    #[serde(default = "default_depth")]
    pub max_depth: usize,

    /// Suppress directories that have subdirectories.
    #[builder(default)]
    #[serde(default)]
    pub leaf_only: bool,

    /// Compute `has_child_subdirectories` for every directory entry.
    #[builder(default)]
    #[serde(default)]
    pub detect_subdirectories: bool,

    /// Keep only files with one of these extensions (case-insensitive).
    #[builder(default)]
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Keep only entries whose name matches this regex.
    #[builder(default)]
    #[serde(default)]
    pub include_pattern: Option<String>,

    /// Drop entries whose name matches this regex.
    #[builder(default)]
    #[serde(default)]
    pub exclude_pattern: Option<String>,

    /// Sort key.
    #[builder(default)]
    #[serde(default)]
    pub sort_by: SortKey,

    /// Sort direction.
    #[builder(default)]
    #[serde(default)]
    pub sort_direction: SortDirection,

    /// Truncate the result to this many records.
    #[builder(default)]
    #[serde(default)]
    pub max_records: Option<usize>,

    /// Return one entry instead of a list.
    #[builder(default)]
    #[serde(default)]
    pub single_result: bool,
}

fn default_true() -> bool {
    true
}

fn default_depth() -> usize {
    MIN_TRAVERSAL_DEPTH
}

impl TraversalOptionsBuilder {
    /// Set the maximum depth, clamped to the supported range.
    pub fn max_depth(&mut self, depth: usize) -> &mut Self {
        self.max_depth = Some(clamp_depth(depth));
        self
    }

    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                Err("Root path cannot be empty".to_string())
            }
            Some(_) => Ok(()),
            None => Err("Root path is required".to_string()),
        }
    }
}

impl TraversalOptions {
    /// Create a new options builder.
    pub fn builder() -> TraversalOptionsBuilder {
        TraversalOptionsBuilder::default()
    }

    /// List the immediate children of `root`, files and directories.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_files: true,
            include_directories: true,
            max_depth: MIN_TRAVERSAL_DEPTH,
            leaf_only: false,
            detect_subdirectories: false,
            extensions: Vec::new(),
            include_pattern: None,
            exclude_pattern: None,
            sort_by: SortKey::default(),
            sort_direction: SortDirection::default(),
            max_records: None,
            single_result: false,
        }
    }

    /// The depth limit actually applied (deserialized values are not
    /// clamped on their own).
    pub fn effective_max_depth(&self) -> usize {
        clamp_depth(self.max_depth)
    }

    /// Whether directory entries need `has_child_subdirectories`.
    pub fn needs_subdirectory_check(&self) -> bool {
        self.leaf_only || self.detect_subdirectories
    }

    /// Check a file name against the extension list.
    pub fn matches_extension(&self, name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some((_, ext)) = name.rsplit_once('.') else {
            return false;
        };
        self.extensions
            .iter()
            .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// The post-walk part of these options.
    pub fn filter(&self) -> FilterOptions {
        FilterOptions {
            include_pattern: self.include_pattern.clone(),
            exclude_pattern: self.exclude_pattern.clone(),
            sort_by: self.sort_by,
            sort_direction: self.sort_direction,
            max_records: self.max_records,
            single_result: self.single_result,
        }
    }
}

/// Default minimum depth of a path that may be mutated.
pub const DEFAULT_MIN_DEPTH: usize = 3;

/// Default maximum depth of a path that may be mutated.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Rules every mutating operation checks its target paths against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionPolicy {
    /// Shallowest path depth that may be mutated.
    #[serde(default = "default_min_depth")]
    pub min_depth: usize,

    /// Deepest path depth that may be mutated.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Skip the protected-path check entirely.
    #[serde(default)]
    pub allow_protected_directories: bool,

    /// Paths protected in addition to the built-in system locations.
    #[serde(default)]
    pub extra_protected_paths: Vec<String>,
}

fn default_min_depth() -> usize {
    DEFAULT_MIN_DEPTH
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ProtectionPolicy {
    fn default() -> Self {
        Self {
            min_depth: DEFAULT_MIN_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
            allow_protected_directories: false,
            extra_protected_paths: Vec::new(),
        }
    }
}

impl ProtectionPolicy {
    /// Set the allowed depth range.
    pub fn with_depth_range(mut self, min_depth: usize, max_depth: usize) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    /// Allow or refuse protected system directories.
    pub fn allow_protected(mut self, allow: bool) -> Self {
        self.allow_protected_directories = allow;
        self
    }

    /// Protect an additional path.
    pub fn protect(mut self, path: impl Into<String>) -> Self {
        self.extra_protected_paths.push(path.into());
        self
    }
}
