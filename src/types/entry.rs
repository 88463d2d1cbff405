//! TraversalItem - A single filesystem entry under consideration by the walker

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Sockets, FIFOs, device nodes
    Other,
}

impl EntryKind {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "other",
        }
    }
}

/// Device/inode pair identifying a directory, used for cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    pub dev: u64,
    pub ino: u64,
}

/// Stats of an entry, taken from the classifier's stat call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStats {
    /// Unix permissions (mode bits)
    pub mode: u32,

    /// Last modification time
    pub mtime: SystemTime,

    /// Last access time
    pub atime: SystemTime,

    /// Size in bytes
    pub size: u64,

    /// Only available on unix
    pub identity: Option<FileIdentity>,
}

impl EntryStats {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        #[cfg(unix)]
        let (mode, identity) = {
            use std::os::unix::fs::MetadataExt;
            (
                metadata.mode(),
                Some(FileIdentity {
                    dev: metadata.dev(),
                    ino: metadata.ino(),
                }),
            )
        };

        #[cfg(not(unix))]
        let (mode, identity) = {
            let mode = if metadata.permissions().readonly() {
                0o444
            } else {
                0o644
            };
            (mode, None)
        };

        let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let atime = metadata.accessed().unwrap_or(mtime);

        Self {
            mode,
            mtime,
            atime,
            size: metadata.len(),
            identity,
        }
    }
}

/// A single filesystem entry being dispatched by the walker
#[derive(Debug, Clone)]
pub struct TraversalItem {
    /// Absolute source path
    pub source: PathBuf,

    /// Path relative to the source root (empty for the root itself)
    pub relative: PathBuf,

    pub kind: EntryKind,

    pub stats: EntryStats,
}

impl TraversalItem {
    pub fn new(source: PathBuf, relative: PathBuf, kind: EntryKind, stats: EntryStats) -> Self {
        Self {
            source,
            relative,
            kind,
            stats,
        }
    }

    /// Metadata handed to a transform for this entry
    pub fn file_meta(&self) -> FileMeta {
        FileMeta {
            name: self.source.clone(),
            mode: self.stats.mode,
            size: self.stats.size,
        }
    }
}

/// Per-file metadata passed to a transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    /// Absolute source path of the file
    pub name: PathBuf,
    pub mode: u32,
    pub size: u64,
}

impl FileMeta {
    pub fn file_name(&self) -> Option<&Path> {
        self.name.file_name().map(Path::new)
    }
}
