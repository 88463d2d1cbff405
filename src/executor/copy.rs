//! Atomic file copy implementation

use super::transform::Transform;
use crate::types::TraversalItem;
use std::ffi::OsString;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

const PART_SUFFIX: &str = ".part";

/// Copy a file atomically using the write-then-rename strategy
///
/// 1. Create a uniquely named `.<name>.XXXXXX.part` file next to `dest`
///    (exclusive create, so no existing entry is ever opened)
/// 2. Stream the source through `transform` into it
/// 3. Flush and sync to disk, then close both handles
/// 4. Preserve mode bits (and timestamps when asked)
/// 5. Rename the part file over the destination
///
/// The part file is removed on every failure path, so a failed copy leaves
/// the destination directory as it was.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes the transform wrote
/// * `Err(io::Error)` - Open, read, write, sync, chmod or rename failure
pub async fn copy_file_atomic(
    item: &TraversalItem,
    dest: &Path,
    transform: &dyn Transform,
    preserve_times: bool,
) -> io::Result<u64> {
    let (part_file, part_path) = create_part_file(dest).await?;

    let result = match write_part(item, part_file, &part_path, transform, preserve_times).await {
        Ok(bytes) => tokio::fs::rename(&part_path, dest).await.map(|()| bytes),
        Err(e) => Err(e),
    };

    match result {
        Ok(bytes) => {
            // Renamed away; nothing left to clean up
            let _ = part_path.keep();
            Ok(bytes)
        }
        Err(e) => {
            let path = part_path.to_path_buf();
            if let Err(close_err) = part_path.close() {
                if close_err.kind() != ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), error = %close_err, "failed to remove part file");
                }
            }
            Err(e)
        }
    }
}

/// Name prefix of the part files staged for `dest`: `.<name>.`
fn part_prefix_for(dest: &Path) -> io::Result<OsString> {
    let name = dest.file_name().ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("destination has no file name: {}", dest.display()),
        )
    })?;

    let mut prefix = OsString::from(".");
    prefix.push(name);
    prefix.push(".");
    Ok(prefix)
}

/// Exclusively create a fresh part file in `dest`'s directory.
async fn create_part_file(dest: &Path) -> io::Result<(File, TempPath)> {
    let prefix = part_prefix_for(dest)?;
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let staged = tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(PART_SUFFIX)
            .tempfile_in(&dir)
    })
    .await
    .map_err(io::Error::other)??;

    let (file, path) = staged.into_parts();
    Ok((File::from_std(file), path))
}

async fn write_part(
    item: &TraversalItem,
    mut part_file: File,
    part_path: &Path,
    transform: &dyn Transform,
    preserve_times: bool,
) -> io::Result<u64> {
    let mut src_file = File::open(&item.source).await?;

    let bytes = transform
        .transform(&mut src_file, &mut part_file, &item.file_meta())
        .await?;

    part_file.flush().await?;
    part_file.sync_all().await?;

    // Both handles are closed before metadata is touched and the file is renamed
    drop(part_file);
    drop(src_file);

    set_mode(part_path, item.stats.mode).await?;

    if preserve_times {
        copy_times(part_path, item).await?;
    }

    Ok(bytes)
}

#[cfg(unix)]
pub(crate) async fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777)).await
}

#[cfg(not(unix))]
pub(crate) async fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut permissions = tokio::fs::metadata(path).await?.permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    tokio::fs::set_permissions(path, permissions).await
}

async fn copy_times(path: &Path, item: &TraversalItem) -> io::Result<()> {
    let path = path.to_path_buf();
    let atime = filetime::FileTime::from_system_time(item.stats.atime);
    let mtime = filetime::FileTime::from_system_time(item.stats.mtime);

    tokio::task::spawn_blocking(move || filetime::set_file_times(&path, atime, mtime))
        .await
        .map_err(io::Error::other)?
}
