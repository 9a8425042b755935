//! Entry types produced by a tree walk.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Type of a walked filesystem node.
///
/// Ordering puts directories before files, which is the order used when
/// sorting by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Directory.
    Directory,
    /// Regular file (anything that is not a directory).
    File,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory => write!(f, "directory"),
            Self::File => write!(f, "file"),
        }
    }
}

/// One file or directory discovered during a walk.
///
/// Entries are created fresh on every walk and never patched afterwards.
/// `path` and `parent` are display strings, lossy for names that are not
/// valid UTF-8; mutations go through [`Entry::fs_path`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Base name.
    pub name: CompactString,
    /// Absolute path; directories end with a path separator.
    pub path: String,
    /// Absolute parent path, ending with a path separator.
    pub parent: String,
    /// File or directory.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time.
    pub mtime: DateTime<Utc>,
    /// 1-based depth below the walk root.
    pub depth: usize,
    /// Whether any immediate child is a directory. Only set for directories,
    /// and only when the walk was asked to compute it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_child_subdirectories: Option<bool>,
    /// The path exactly as the filesystem returned it.
    #[serde(skip)]
    fs_path: PathBuf,
}

impl Entry {
    /// Create a file entry.
    pub fn file(path: &Path, size: u64, modified: SystemTime, depth: usize) -> Self {
        Self {
            name: base_name(path),
            path: path.to_string_lossy().into_owned(),
            parent: parent_string(path),
            kind: EntryKind::File,
            size,
            mtime: modified.into(),
            depth,
            has_child_subdirectories: None,
            fs_path: path.to_path_buf(),
        }
    }

    /// Create a directory entry.
    pub fn directory(
        path: &Path,
        modified: SystemTime,
        depth: usize,
        has_child_subdirectories: Option<bool>,
    ) -> Self {
        Self {
            name: base_name(path),
            path: with_trailing_separator(&path.to_string_lossy()),
            parent: parent_string(path),
            kind: EntryKind::Directory,
            size: 0,
            mtime: modified.into(),
            depth,
            has_child_subdirectories,
            fs_path: path.to_path_buf(),
        }
    }

    /// The zero-valued entry returned when a single-result lookup finds
    /// nothing. Its empty `name` and `path` are the "not found" signal.
    pub fn placeholder() -> Self {
        Self {
            name: CompactString::default(),
            path: String::new(),
            parent: String::new(),
            kind: EntryKind::File,
            size: 0,
            mtime: DateTime::<Utc>::from(SystemTime::UNIX_EPOCH),
            depth: 0,
            has_child_subdirectories: None,
            fs_path: PathBuf::new(),
        }
    }

    /// Check if this entry is the "not found" placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty() && self.path.is_empty()
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Filesystem path of the entry without the directory marker.
    ///
    /// Entries deserialized from JSON carry no native path, so theirs is
    /// rebuilt from the display string.
    pub fn fs_path(&self) -> PathBuf {
        if !self.fs_path.as_os_str().is_empty() {
            return self.fs_path.clone();
        }
        let trimmed = self.path.trim_end_matches(['/', '\\']);
        if trimmed.is_empty() {
            PathBuf::from(&self.path)
        } else {
            PathBuf::from(trimmed)
        }
    }
}

fn base_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}

fn parent_string(path: &Path) -> String {
    path.parent()
        .map(|p| with_trailing_separator(&p.to_string_lossy()))
        .unwrap_or_default()
}

/// Append the platform separator unless the path already ends with one.
pub fn with_trailing_separator(path: &str) -> String {
    if path.ends_with('/') || path.ends_with(MAIN_SEPARATOR) {
        path.to_string()
    } else {
        format!("{path}{MAIN_SEPARATOR}")
    }
}
