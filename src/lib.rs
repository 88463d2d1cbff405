//! # treecp - concurrent recursive copy
//!
//! Copies a file, symlink or whole directory tree to a destination path,
//! running sibling entries concurrently under a global limit. Entries can be
//! filtered, renamed and transformed on the way, and every failure is
//! reported against the source path that caused it.

// Module declarations
pub mod commands;
pub mod config;
pub mod executor;
pub mod filter;
pub mod logging;
pub mod resolve;
pub mod scanner;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use config::CopyOptions;
pub use executor::{RawCopy, Transform};
pub use filter::{GlobFilter, PathFilter, RegexFilter};
pub use resolve::Rename;
pub use scanner::{copy, copy_blocking, CopyRequest};
pub use types::{
    CopyError, CopyEvent, CopyFailures, CopyResult, CopyStats, EntryFailure, ErrorCode, FileMeta,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
