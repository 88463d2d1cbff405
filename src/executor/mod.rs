//! Executor module for destination writes

pub mod copy;
pub mod transform;

pub use copy::copy_file_atomic;
pub use transform::{DestinationWriter, RawCopy, SourceReader, Transform};

use std::io::{self, ErrorKind};
use std::path::Path;

/// Create a destination directory.
///
/// Returns `Ok(true)` when the directory was created, `Ok(false)` when a
/// directory was already there.
pub async fn create_directory(dest: &Path) -> io::Result<bool> {
    match tokio::fs::create_dir(dest).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let metadata = tokio::fs::metadata(dest).await?;
            if metadata.is_dir() {
                Ok(false)
            } else {
                Err(io::Error::new(
                    ErrorKind::AlreadyExists,
                    format!("{} exists and is not a directory", dest.display()),
                ))
            }
        }
        Err(e) => Err(e),
    }
}

/// Apply source directory mode bits once the directory's children are done.
pub async fn apply_directory_mode(dest: &Path, mode: u32) -> io::Result<()> {
    copy::set_mode(dest, mode).await
}

/// Recreate a symlink pointing at `target` without resolving it.
///
/// `replace` removes the file or symlink currently at `dest` first.
pub async fn copy_symlink(target: &Path, dest: &Path, replace: bool) -> io::Result<()> {
    if replace {
        remove_non_directory(dest).await?;
    }
    create_symlink(target, dest).await
}

/// Remove the file or symlink at `path`; a missing path is fine.
///
/// Directories are refused with `AlreadyExists`.
pub async fn remove_non_directory(path: &Path) -> io::Result<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if metadata.file_type().is_dir() {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} exists and is a directory", path.display()),
        ));
    }
    tokio::fs::remove_file(path).await
}

#[cfg(unix)]
async fn create_symlink(target: &Path, link_path: &Path) -> io::Result<()> {
    tokio::fs::symlink(target, link_path).await
}

#[cfg(windows)]
async fn create_symlink(target: &Path, link_path: &Path) -> io::Result<()> {
    match tokio::fs::symlink_file(target, link_path).await {
        Ok(()) => Ok(()),
        Err(file_err) => match tokio::fs::symlink_dir(target, link_path).await {
            Ok(()) => Ok(()),
            Err(_) => Err(file_err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_directory_is_idempotent() {
        let temp = TempDir::new().expect("create temp dir");
        let dir = temp.path().join("made");

        assert!(create_directory(&dir).await.expect("first create"));
        assert!(!create_directory(&dir).await.expect("second create"));
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_create_directory_over_file_fails() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("occupied");
        fs::write(&path, b"file").expect("write file");

        let err = create_directory(&path).await.expect_err("file in the way");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_create_directory_missing_parent_fails() {
        let temp = TempDir::new().expect("create temp dir");
        let err = create_directory(&temp.path().join("no/such/parent"))
            .await
            .expect_err("parent missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove_non_directory_handles_missing_and_refuses_dirs() {
        let temp = TempDir::new().expect("create temp dir");
        let file = temp.path().join("file");
        let dir = temp.path().join("dir");
        fs::write(&file, b"x").expect("write file");
        fs::create_dir_all(dir.join("nested")).expect("create dir");

        remove_non_directory(&file).await.expect("remove file");
        remove_non_directory(&temp.path().join("missing"))
            .await
            .expect("missing is fine");
        let err = remove_non_directory(&dir).await.expect_err("directory kept");

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert!(!file.exists());
        assert!(dir.join("nested").is_dir());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_copy_symlink_preserves_target_string() {
        let temp = TempDir::new().expect("create temp dir");
        let link = temp.path().join("link");

        copy_symlink(Path::new("does-not-exist"), &link, false)
            .await
            .expect("create broken link");

        let target = fs::read_link(&link).expect("read link");
        assert_eq!(target, Path::new("does-not-exist"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_copy_symlink_replaces_existing_entry() {
        let temp = TempDir::new().expect("create temp dir");
        let link = temp.path().join("link");
        fs::write(&link, b"regular file in the way").expect("write file");

        copy_symlink(Path::new("elsewhere"), &link, true)
            .await
            .expect("replace with link");

        let metadata = fs::symlink_metadata(&link).expect("metadata");
        assert!(metadata.file_type().is_symlink());
        assert_eq!(fs::read_link(&link).expect("read link"), Path::new("elsewhere"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_apply_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("create temp dir");
        let dir = temp.path().join("moded");
        fs::create_dir(&dir).expect("create dir");

        apply_directory_mode(&dir, 0o40750).await.expect("chmod dir");

        let mode = fs::metadata(&dir).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }
}
