//! Core type definitions for treecp

mod entry;
mod error;
mod stats;

pub use entry::{EntryKind, EntryStats, FileIdentity, FileMeta, TraversalItem};
pub use error::{CopyError, CopyFailures, EntryFailure, ErrorCode};
pub use stats::{CopyEvent, CopyStats, EventCallback, SkipReason};

/// Outcome of one copy invocation
pub type CopyResult = Result<CopyStats, CopyFailures>;
