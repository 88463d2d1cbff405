//! Entry classification
//!
//! Stats an entry without following symlinks, unless dereferencing was
//! requested, in which case the link target's kind and stats are reported.

use crate::types::{EntryKind, EntryStats, TraversalItem};
use std::io;
use std::path::{Path, PathBuf};

/// Stat `source` and build the traversal item for it.
///
/// With `dereference` set, a symlink whose target is missing fails with
/// `NotFound` rather than being reported as a symlink.
pub async fn classify(
    source: &Path,
    relative: &Path,
    dereference: bool,
) -> io::Result<TraversalItem> {
    let metadata = if dereference {
        tokio::fs::metadata(source).await?
    } else {
        tokio::fs::symlink_metadata(source).await?
    };

    Ok(TraversalItem::new(
        source.to_path_buf(),
        relative.to_path_buf(),
        EntryKind::from_metadata(&metadata),
        EntryStats::from_metadata(&metadata),
    ))
}

/// Read a symlink's target string without resolving it.
pub async fn read_link_target(source: &Path) -> io::Result<PathBuf> {
    tokio::fs::read_link(source).await
}
