//! Pre-flight safety checks for mutating operations.
//!
//! The check is purely lexical: the path string is normalized and compared
//! against a list of system locations, and its segment count is compared
//! against the policy's depth range. Symlinks are not resolved, so a path
//! that looks shallow is rejected even if it points somewhere deep.

use std::path::Path;

use crate::config::ProtectionPolicy;
use crate::error::{Result, TreeOpsError};

/// System locations refused by default.
pub const PROTECTED_PATHS: &[&str] = &[
    "/",
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/lib",
    "/lib64",
    "/proc",
    "/root",
    "/sbin",
    "/sys",
    "/usr",
    "/var",
    "/System",
    "/Library",
    "C:\\",
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
    "C:\\ProgramData",
];

/// A path split into comparable segments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NormalizedPath {
    /// Lowercased drive letter prefix (`c:`), if any.
    drive: Option<String>,
    segments: Vec<String>,
}

impl NormalizedPath {
    fn parse(raw: &str) -> Self {
        let unified = raw.replace('\\', "/");
        let (drive, rest) = split_drive(&unified);

        let mut segments: Vec<String> = Vec::new();
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other.to_string()),
            }
        }

        // Windows paths compare case-insensitively.
        if drive.is_some() {
            for segment in &mut segments {
                *segment = segment.to_lowercase();
            }
        }

        Self { drive, segments }
    }

    fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Whether `self` equals `protected` or lies beneath it. Filesystem
    /// roots only match exactly.
    fn is_covered_by(&self, protected: &NormalizedPath) -> bool {
        if self.drive != protected.drive {
            return false;
        }
        if protected.segments.is_empty() {
            return self.segments.is_empty();
        }
        self.segments.starts_with(&protected.segments)
    }
}

fn split_drive(path: &str) -> (Option<String>, &str) {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        (Some(path[..2].to_ascii_lowercase()), &path[2..])
    } else {
        (None, path)
    }
}

/// Number of non-empty segments in a path, not counting a drive prefix.
pub fn path_depth(path: &Path) -> usize {
    NormalizedPath::parse(&path.to_string_lossy()).depth()
}

/// Whether `path` equals `ancestor` or lies beneath it, after the same
/// lexical normalization as [`check_directory_safety`].
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    let path = NormalizedPath::parse(&path.to_string_lossy());
    let ancestor = NormalizedPath::parse(&ancestor.to_string_lossy());
    path.drive == ancestor.drive && path.segments.starts_with(&ancestor.segments)
}

/// Reject `path` if it is protected or outside the policy's depth range.
///
/// Must be called before any filesystem mutation; performs no I/O.
pub fn check_directory_safety(path: &Path, policy: &ProtectionPolicy) -> Result<()> {
    let raw = path.to_string_lossy();
    let normalized = NormalizedPath::parse(&raw);

    if !policy.allow_protected_directories {
        let protected = PROTECTED_PATHS
            .iter()
            .map(|p| p.to_string())
            .chain(policy.extra_protected_paths.iter().cloned());

        for candidate in protected {
            if normalized.is_covered_by(&NormalizedPath::parse(&candidate)) {
                return Err(TreeOpsError::ProtectedPath {
                    path: path.to_path_buf(),
                    protected: candidate,
                });
            }
        }
    }

    let depth = normalized.depth();
    if depth < policy.min_depth || depth > policy.max_depth {
        return Err(TreeOpsError::DepthRange {
            path: path.to_path_buf(),
            depth,
            min: policy.min_depth,
            max: policy.max_depth,
        });
    }

    Ok(())
}

/// Check several paths, stopping at the first violation.
pub fn check_all<'a>(
    paths: impl IntoIterator<Item = &'a Path>,
    policy: &ProtectionPolicy,
) -> Result<()> {
    paths
        .into_iter()
        .try_for_each(|path| check_directory_safety(path, policy))
}
