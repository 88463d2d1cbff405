//! Configuration management

mod cli;
mod file;

pub use cli::{Cli, LogFormatArg, Settings};
pub use file::FileConfig;

use crate::executor::{RawCopy, Transform};
use crate::filter::{AcceptAll, PathFilter};
use crate::resolve::{Identity, OverwritePolicy, Rename};
use crate::types::{CopyEvent, EventCallback};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Concurrency limit used when none (or an out-of-range one) is given
pub const DEFAULT_LIMIT: usize = 16;

/// Largest accepted concurrency limit
pub const MAX_LIMIT: usize = 512;

/// Options for one copy invocation
#[derive(Clone)]
pub struct CopyOptions {
    /// Which entries take part; default accepts everything
    pub filter: Arc<dyn PathFilter>,

    /// How file bytes are produced; default is a raw stream copy
    pub transform: Arc<dyn Transform>,

    /// Destination path rewrite; default identity
    pub rename: Arc<dyn Rename>,

    /// Overwrite existing destination entries
    pub clobber: bool,

    /// Follow symlinks and copy what they point at
    pub dereference: bool,

    /// Only replace destinations older than their source
    pub modified: bool,

    /// Stop dispatching new entries after the first failure
    pub stop_on_error: bool,

    /// Copy atime/mtime onto written files (implied by `modified`)
    pub preserve_timestamps: bool,

    /// Maximum number of entry operations running at once
    pub limit: usize,

    /// Append a report of every failure to this file when the copy ends
    pub errors_file: Option<PathBuf>,

    /// Observer for per-entry outcomes
    pub on_event: Option<Arc<EventCallback>>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            filter: Arc::new(AcceptAll),
            transform: Arc::new(RawCopy),
            rename: Arc::new(Identity),
            clobber: true,
            dereference: false,
            modified: false,
            stop_on_error: false,
            preserve_timestamps: false,
            limit: DEFAULT_LIMIT,
            errors_file: None,
            on_event: None,
        }
    }
}

impl CopyOptions {
    pub fn with_filter(mut self, filter: impl PathFilter + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    pub fn with_rename(mut self, rename: impl Rename + 'static) -> Self {
        self.rename = Arc::new(rename);
        self
    }

    pub fn with_clobber(mut self, clobber: bool) -> Self {
        self.clobber = clobber;
        self
    }

    pub fn with_dereference(mut self, dereference: bool) -> Self {
        self.dereference = dereference;
        self
    }

    pub fn with_modified(mut self, modified: bool) -> Self {
        self.modified = modified;
        self
    }

    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    pub fn with_preserve_timestamps(mut self, preserve: bool) -> Self {
        self.preserve_timestamps = preserve;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_errors_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.errors_file = Some(path.into());
        self
    }

    pub fn with_event_callback(
        mut self,
        callback: impl Fn(&CopyEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Arc::new(callback));
        self
    }

    /// Concurrency limit actually used; out-of-range values fall back to the default.
    pub fn effective_limit(&self) -> usize {
        if (1..=MAX_LIMIT).contains(&self.limit) {
            self.limit
        } else {
            DEFAULT_LIMIT
        }
    }

    pub fn overwrite_policy(&self) -> OverwritePolicy {
        OverwritePolicy {
            clobber: self.clobber,
            modified: self.modified,
        }
    }

    pub fn preserves_times(&self) -> bool {
        self.preserve_timestamps || self.modified
    }

    pub(crate) fn emit(&self, event: CopyEvent) {
        if let Some(callback) = &self.on_event {
            callback(&event);
        }
    }
}

impl fmt::Debug for CopyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyOptions")
            .field("clobber", &self.clobber)
            .field("dereference", &self.dereference)
            .field("modified", &self.modified)
            .field("stop_on_error", &self.stop_on_error)
            .field("preserve_timestamps", &self.preserve_timestamps)
            .field("limit", &self.limit)
            .field("errors_file", &self.errors_file)
            .field("on_event", &self.on_event.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_defaults() {
        let options = CopyOptions::default();
        assert!(options.clobber);
        assert!(!options.dereference);
        assert!(!options.modified);
        assert!(!options.stop_on_error);
        assert!(!options.preserves_times());
        assert_eq!(options.effective_limit(), DEFAULT_LIMIT);
        assert!(options.filter.include(Path::new("/anything")));
        assert_eq!(options.rename.rename(Path::new("/out/a")), Path::new("/out/a"));
    }

    #[test]
    fn test_limit_out_of_range_falls_back() {
        assert_eq!(CopyOptions::default().with_limit(0).effective_limit(), 16);
        assert_eq!(CopyOptions::default().with_limit(513).effective_limit(), 16);
        assert_eq!(CopyOptions::default().with_limit(1).effective_limit(), 1);
        assert_eq!(CopyOptions::default().with_limit(512).effective_limit(), 512);
    }

    #[test]
    fn test_modified_implies_timestamps() {
        let options = CopyOptions::default().with_modified(true);
        assert!(options.preserves_times());
        assert_eq!(
            options.overwrite_policy(),
            OverwritePolicy {
                clobber: true,
                modified: true
            }
        );
    }

    #[test]
    fn test_builder_closures() {
        let options = CopyOptions::default()
            .with_filter(|path: &Path| !path.ends_with("skip"))
            .with_rename(|path: &Path| path.with_extension("bak"));

        assert!(!options.filter.include(Path::new("/src/skip")));
        assert_eq!(
            options.rename.rename(Path::new("/out/a.txt")),
            Path::new("/out/a.bak")
        );
    }

    #[test]
    fn test_emit_reaches_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let options = CopyOptions::default().with_event_callback(move |_event| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        options.emit(CopyEvent::Filtered {
            source: PathBuf::from("/src/x"),
        });
        CopyOptions::default().emit(CopyEvent::Filtered {
            source: PathBuf::from("/src/y"),
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_hides_callables() {
        let shown = format!("{:?}", CopyOptions::default().with_clobber(false));
        assert!(shown.contains("clobber: false"));
        assert!(shown.contains(".."));
    }
}
