//! Progress reporting

use crate::types::{CopyEvent, CopyStats, EntryKind};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};

/// Progress reporter for copy operations
///
/// The total number of entries is not known up front (the tree is walked
/// and copied in one pass), so this is a spinner with running counters.
pub struct ProgressReporter {
    bar: ProgressBar,
    started_at: Instant,
    entries: u64,
    failed: u64,
    copied_bytes: u64,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} entries | {msg}") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        Self::with_bar(bar)
    }

    /// Reporter that tracks counters but draws nothing
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            started_at: Instant::now(),
            entries: 0,
            failed: 0,
            copied_bytes: 0,
        }
    }

    /// Fold one copy event into the display.
    pub fn record(&mut self, event: &CopyEvent) {
        match event {
            CopyEvent::Copied {
                kind,
                source,
                bytes,
                ..
            } => {
                self.entries += 1;
                self.copied_bytes = self.copied_bytes.saturating_add(*bytes);
                self.bar.set_position(self.entries);
                self.set_current(*kind, source);
            }
            CopyEvent::Skipped { .. } | CopyEvent::Filtered { .. } => {
                self.entries += 1;
                self.bar.set_position(self.entries);
            }
            CopyEvent::Failed { failure } => {
                self.entries += 1;
                self.failed += 1;
                self.bar.set_position(self.entries);
                self.bar.println(format!("ERROR {}", failure));
            }
        }
    }

    fn set_current(&self, kind: EntryKind, source: &Path) {
        self.bar.set_message(format!(
            "{} {} | {}/s",
            kind.label(),
            source.display(),
            HumanBytes(self.throughput_bps())
        ));
    }

    /// Finalize with the counters of the finished copy.
    pub fn finish(&self, stats: &CopyStats) {
        self.bar.finish_with_message(format!(
            "Copy complete: {} files, {} dirs, {} links, {} skipped, {} filtered, {} failed | {} total | {}/s",
            stats.files_copied,
            stats.dirs_created,
            stats.symlinks_created,
            stats.entries_skipped,
            stats.entries_filtered,
            self.failed,
            HumanBytes(stats.bytes_copied),
            HumanBytes(self.throughput_bps())
        ));
    }

    fn throughput_bps(&self) -> u64 {
        let secs = self.started_at.elapsed().as_secs_f64();
        if secs > 0.0 {
            (self.copied_bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
