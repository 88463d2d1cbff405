//! Copy statistics and per-entry events

use super::{EntryFailure, EntryKind};
use std::path::PathBuf;

/// Counters for one copy invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Regular files written (including dereferenced symlinks)
    pub files_copied: usize,
    /// Directories created at the destination (pre-existing ones are not counted)
    pub dirs_created: usize,
    pub symlinks_created: usize,
    /// Entries left alone by the overwrite policy or because of their kind
    pub entries_skipped: usize,
    /// Entries rejected by the filter (their subtrees are not counted)
    pub entries_filtered: usize,
    pub bytes_copied: u64,
}

impl CopyStats {
    /// Fold the counters of a finished branch into this one
    pub fn merge(&mut self, other: &CopyStats) {
        self.files_copied += other.files_copied;
        self.dirs_created += other.dirs_created;
        self.symlinks_created += other.symlinks_created;
        self.entries_skipped += other.entries_skipped;
        self.entries_filtered += other.entries_filtered;
        self.bytes_copied += other.bytes_copied;
    }

    /// Entries that produced something at the destination
    pub fn entries_written(&self) -> usize {
        self.files_copied + self.dirs_created + self.symlinks_created
    }
}

/// Why an entry was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Destination exists and clobbering is disabled
    NoClobber,
    /// Destination is at least as new as the source
    UpToDate,
    /// Destination symlink already points at the same target
    SameLink,
    /// Entry kind is not copied (socket, FIFO, device)
    Unsupported,
    /// Entry is the destination root nested inside the source
    DestinationRoot,
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::NoClobber => "exists, no clobber",
            SkipReason::UpToDate => "destination up to date",
            SkipReason::SameLink => "link unchanged",
            SkipReason::Unsupported => "unsupported entry kind",
            SkipReason::DestinationRoot => "destination root",
        }
    }
}

/// Events emitted while a copy runs.
#[derive(Debug, Clone)]
pub enum CopyEvent {
    /// An entry was written to the destination.
    Copied {
        kind: EntryKind,
        source: PathBuf,
        destination: PathBuf,
        bytes: u64,
    },
    /// An entry was left alone by policy.
    Skipped { source: PathBuf, reason: SkipReason },
    /// An entry (and its subtree) was rejected by the filter.
    Filtered { source: PathBuf },
    /// An entry failed; the walker continued unless stop-on-error is set.
    Failed { failure: EntryFailure },
}

/// Optional callback used to receive copy events.
///
/// Invoked concurrently from sibling branches.
pub type EventCallback = dyn Fn(&CopyEvent) + Send + Sync;
