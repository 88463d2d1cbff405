//! Destination resolution
//!
//! Maps a source entry to the path it is written to and probes what already
//! lives there.

mod policy;

pub use policy::{decide_overwrite, Decision, OverwritePolicy};

use crate::types::EntryKind;
use std::fs::Metadata;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Maps a computed destination path to the path actually written.
pub trait Rename: Send + Sync {
    fn rename(&self, destination: &Path) -> PathBuf;
}

impl<F> Rename for F
where
    F: Fn(&Path) -> PathBuf + Send + Sync,
{
    fn rename(&self, destination: &Path) -> PathBuf {
        self(destination)
    }
}

/// Default rename: the destination is kept as computed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Rename for Identity {
    fn rename(&self, destination: &Path) -> PathBuf {
        destination.to_path_buf()
    }
}

/// Naive destination of a child: its name joined onto the parent's final
/// destination, so a renamed directory carries its children with it.
pub fn naive_destination(parent_destination: &Path, child_name: &std::ffi::OsStr) -> PathBuf {
    parent_destination.join(child_name)
}

/// Apply `rename` to a naive destination path.
pub fn resolve_destination(naive: &Path, rename: &dyn Rename) -> PathBuf {
    rename.rename(naive)
}

/// What currently occupies a destination path
#[derive(Debug, Clone)]
pub struct Existing {
    pub kind: EntryKind,
    pub mtime: SystemTime,
}

impl Existing {
    fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            kind: EntryKind::from_metadata(metadata),
            mtime: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }
}

/// lstat the destination; `Ok(None)` when nothing is there.
pub async fn probe_destination(destination: &Path) -> io::Result<Option<Existing>> {
    match tokio::fs::symlink_metadata(destination).await {
        Ok(metadata) => Ok(Some(Existing::from_metadata(&metadata))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_identity_rename() {
        let path = Path::new("/out/dir/a");
        assert_eq!(resolve_destination(path, &Identity), PathBuf::from("/out/dir/a"));
    }

    #[test]
    fn test_closure_rename() {
        let rename = |target: &Path| {
            if target.file_name() == Some(OsStr::new("a")) {
                target.with_file_name("z")
            } else {
                target.to_path_buf()
            }
        };

        assert_eq!(
            resolve_destination(Path::new("/out/a"), &rename),
            PathBuf::from("/out/z")
        );
        assert_eq!(
            resolve_destination(Path::new("/out/b"), &rename),
            PathBuf::from("/out/b")
        );
    }

    #[test]
    fn test_naive_destination_follows_parent() {
        let child = naive_destination(Path::new("/out/renamed"), OsStr::new("file.txt"));
        assert_eq!(child, PathBuf::from("/out/renamed/file.txt"));
    }

    #[tokio::test]
    async fn test_probe_destination() {
        let temp = TempDir::new().expect("create temp dir");
        fs::write(temp.path().join("present"), b"x").expect("write file");

        let present = probe_destination(&temp.path().join("present"))
            .await
            .expect("probe present");
        assert_eq!(present.map(|e| e.kind), Some(EntryKind::File));

        let missing = probe_destination(&temp.path().join("missing"))
            .await
            .expect("probe missing");
        assert!(missing.is_none());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_probe_destination_sees_broken_link() {
        let temp = TempDir::new().expect("create temp dir");
        std::os::unix::fs::symlink("gone", temp.path().join("link")).expect("symlink");

        let existing = probe_destination(&temp.path().join("link"))
            .await
            .expect("probe link");
        assert_eq!(existing.map(|e| e.kind), Some(EntryKind::Symlink));
    }
}
