//! Error types for tree operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while walking or mutating a directory tree.
#[derive(Debug, Error)]
pub enum TreeOpsError {
    /// Path is, or lies under, a protected system location.
    #[error("Refusing to touch protected path {path} (protected by {protected})")]
    ProtectedPath { path: PathBuf, protected: String },

    /// Path depth lies outside the policy's allowed range.
    #[error("Path depth {depth} of {path} is outside the allowed range {min}..={max}")]
    DepthRange {
        path: PathBuf,
        depth: usize,
        min: usize,
        max: usize,
    },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Path exists but is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Path exists but is not a regular file.
    #[error("Not a file: {path}")]
    NotAFile { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Destination of a move or rename is already taken.
    #[error("Destination already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// A directory cannot be moved into itself.
    #[error("Cannot move {source_path} into its own subtree at {destination}")]
    SourceIsAncestor {
        source_path: PathBuf,
        destination: PathBuf,
    },

    /// Operation relies on POSIX utilities that are unavailable here.
    #[error("{operation} is only supported on POSIX systems")]
    UnsupportedPlatform { operation: &'static str },

    /// A computed file name is not usable.
    #[error("Invalid name for {path}: {reason}")]
    InvalidName { path: PathBuf, reason: String },

    /// A pattern driving a mutation failed to compile.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// External process exited unsuccessfully.
    #[error("Command `{command}` failed ({status}): {stderr}")]
    Process {
        command: String,
        status: String,
        stderr: String,
    },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Blocking task panicked or was cancelled.
    #[error("Task failed: {message}")]
    Task { message: String },
}

impl TreeOpsError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            std::io::ErrorKind::NotADirectory => Self::NotADirectory { path },
            _ => Self::Io { path, source },
        }
    }

    /// The path this error occurred at, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::ProtectedPath { path, .. }
            | Self::DepthRange { path, .. }
            | Self::NotFound { path }
            | Self::NotADirectory { path }
            | Self::NotAFile { path }
            | Self::PermissionDenied { path }
            | Self::AlreadyExists { path }
            | Self::InvalidName { path, .. }
            | Self::Io { path, .. } => Some(path),
            Self::SourceIsAncestor { source_path, .. } => Some(source_path),
            _ => None,
        }
    }

    /// Whether a traversal may skip the offending subtree and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Whether the error came from the protection policy.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::ProtectedPath { .. } | Self::DepthRange { .. })
    }
}

/// Convenience alias used across the workspace.
pub type Result<T, E = TreeOpsError> = std::result::Result<T, E>;
