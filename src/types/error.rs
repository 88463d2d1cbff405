//! Error types for treecp

use super::CopyStats;
use std::fmt;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while setting up a copy (before any entry is visited)
#[derive(Debug, Error)]
pub enum CopyError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration (bad pattern, unreadable config file, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error (logic checks)
    #[error("Validation error: {0}")]
    Validation(String),
}

impl CopyError {
    /// Check if this error is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, CopyError::Validation(_) | CopyError::Config(_))
    }
}

/// errno-style classification of a per-entry failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No such file or directory
    NotFound,
    /// Permission denied
    PermissionDenied,
    /// Destination already exists (or is claimed by another entry)
    AlreadyExists,
    /// No space left on device
    NoSpace,
    /// A path component is not a directory
    NotADirectory,
    /// Expected a file, found a directory
    IsADirectory,
    /// Read-only filesystem
    ReadOnly,
    /// Symlink cycle while dereferencing
    Loop,
    /// Invalid argument
    InvalidInput,
    /// Anything else
    Io,
}

impl ErrorCode {
    /// The errno name for this code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "ENOENT",
            ErrorCode::PermissionDenied => "EACCES",
            ErrorCode::AlreadyExists => "EEXIST",
            ErrorCode::NoSpace => "ENOSPC",
            ErrorCode::NotADirectory => "ENOTDIR",
            ErrorCode::IsADirectory => "EISDIR",
            ErrorCode::ReadOnly => "EROFS",
            ErrorCode::Loop => "ELOOP",
            ErrorCode::InvalidInput => "EINVAL",
            ErrorCode::Io => "EIO",
        }
    }

    /// Classify an IO error
    pub fn from_io(error: &IoError) -> Self {
        match error.kind() {
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            ErrorKind::AlreadyExists => ErrorCode::AlreadyExists,
            ErrorKind::StorageFull => ErrorCode::NoSpace,
            ErrorKind::NotADirectory => ErrorCode::NotADirectory,
            ErrorKind::IsADirectory => ErrorCode::IsADirectory,
            ErrorKind::ReadOnlyFilesystem => ErrorCode::ReadOnly,
            ErrorKind::InvalidInput => ErrorCode::InvalidInput,
            _ => match error.raw_os_error() {
                #[cfg(target_os = "linux")]
                Some(40) => ErrorCode::Loop,
                _ => ErrorCode::Io,
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failing entry of a copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    /// Source path of the entry that failed
    pub path: PathBuf,
    pub code: ErrorCode,
    pub message: String,
}

impl EntryFailure {
    pub fn new(path: impl Into<PathBuf>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code,
            message: message.into(),
        }
    }

    /// Attribute an IO error to `path`
    pub fn from_io(path: &Path, error: &IoError) -> Self {
        Self::new(path, ErrorCode::from_io(error), error.to_string())
    }
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.code, self.path.display(), self.message)
    }
}

/// Aggregated outcome of a copy that had at least one failing entry
#[derive(Debug, Clone, Error)]
#[error("{}", summary(.failures))]
pub struct CopyFailures {
    /// Failures in the order their branches were joined
    pub failures: Vec<EntryFailure>,

    /// What did get copied
    pub stats: CopyStats,
}

impl CopyFailures {
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntryFailure> {
        self.failures.iter()
    }

    /// First failure recorded for `path`, if any
    pub fn for_path(&self, path: &Path) -> Option<&EntryFailure> {
        self.failures.iter().find(|f| f.path == path)
    }
}

fn summary(failures: &[EntryFailure]) -> String {
    let preview = failures
        .iter()
        .take(3)
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "Copy completed with {} error(s). Example failures: {}",
        failures.len(),
        preview
    )
}
