//! Recursive tree copy
//!
//! Each entry is filtered, classified, resolved and then executed. A
//! directory is created (or found) before any of its children start, then
//! its children run as a group of concurrent tasks that is joined before
//! the directory is finished. Every branch returns its own [`Tally`]; tallies
//! are merged at the join points, so no error list is shared between tasks.

use super::classify::{classify, read_link_target};
use crate::config::CopyOptions;
use crate::executor::{self, copy_file_atomic};
use crate::resolve::{
    decide_overwrite, naive_destination, probe_destination, resolve_destination, Decision,
    Existing,
};
use crate::types::{
    CopyEvent, CopyFailures, CopyResult, CopyStats, EntryFailure, EntryKind, ErrorCode,
    FileIdentity, SkipReason, TraversalItem,
};
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashSet;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Input of one top-level copy invocation
#[derive(Debug, Clone)]
pub struct CopyRequest {
    /// Absolute source root
    pub source: PathBuf,

    /// Absolute destination root
    pub destination: PathBuf,

    pub options: CopyOptions,
}

impl CopyRequest {
    /// Relative roots are resolved against the current directory.
    pub fn new(
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        options: CopyOptions,
    ) -> Self {
        Self {
            source: absolutize(source.as_ref()),
            destination: absolutize(destination.as_ref()),
            options,
        }
    }

    /// Run the copy to completion.
    ///
    /// Must be awaited inside a tokio runtime; sibling entries are spawned
    /// as tasks on it.
    pub async fn run(self) -> CopyResult {
        TreeCopier::new(self).run().await
    }
}

/// Copy `source` to `destination`.
///
/// Resolves once every reachable entry has been copied, skipped or has
/// failed. `Ok` carries the counters of a fully successful copy; `Err`
/// carries every failure (attributed to its source path) along with the
/// counters of what did succeed.
///
/// # Example
/// ```no_run
/// use treecp::{copy, CopyOptions};
///
/// # async fn demo() {
/// let options = CopyOptions::default().with_clobber(false);
/// match copy("assets", "build/assets", options).await {
///     Ok(stats) => println!("copied {} files", stats.files_copied),
///     Err(failures) => {
///         for failure in failures.iter() {
///             eprintln!("{}", failure);
///         }
///     }
/// }
/// # }
/// ```
pub async fn copy(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: CopyOptions,
) -> CopyResult {
    CopyRequest::new(source, destination, options).run().await
}

/// [`copy`] on a dedicated multi-threaded runtime.
///
/// Panics if called from within an async context, like any nested
/// `block_on`.
pub fn copy_blocking(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: CopyOptions,
) -> CopyResult {
    let request = CopyRequest::new(source, destination, options);
    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(request.run()),
        Err(e) => Err(CopyFailures {
            failures: vec![EntryFailure::from_io(&request.source, &e)],
            stats: CopyStats::default(),
        }),
    }
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Outcome of one branch of the walk
#[derive(Debug, Default)]
struct Tally {
    stats: CopyStats,
    failures: Vec<EntryFailure>,
}

impl Tally {
    fn merge(&mut self, other: Tally) {
        self.stats.merge(&other.stats);
        self.failures.extend(other.failures);
    }

    fn skip(&mut self, options: &CopyOptions, source: &Path, reason: SkipReason) {
        debug!(path = %source.display(), reason = reason.label(), "skipped");
        self.stats.entries_skipped += 1;
        options.emit(CopyEvent::Skipped {
            source: source.to_path_buf(),
            reason,
        });
    }

    fn into_result(self) -> CopyResult {
        if self.failures.is_empty() {
            Ok(self.stats)
        } else {
            Err(CopyFailures {
                failures: self.failures,
                stats: self.stats,
            })
        }
    }
}

/// One entry waiting to be visited
struct Job {
    source: PathBuf,
    relative: PathBuf,
    naive_dest: PathBuf,
    /// Directories on the path from the root, for cycle detection
    ancestors: Arc<Vec<FileIdentity>>,
}

struct TreeCopier {
    request: CopyRequest,
    limiter: Semaphore,
    halted: AtomicBool,
    /// Non-directory destinations written during this invocation
    claimed: Mutex<HashSet<PathBuf>>,
}

impl TreeCopier {
    fn new(request: CopyRequest) -> Self {
        let limit = request.options.effective_limit();
        Self {
            request,
            limiter: Semaphore::new(limit),
            halted: AtomicBool::new(false),
            claimed: Mutex::new(HashSet::new()),
        }
    }

    async fn run(self) -> CopyResult {
        let started = Instant::now();
        let copier = Arc::new(self);
        let source = copier.request.source.clone();

        info!(
            source = %source.display(),
            destination = %copier.request.destination.display(),
            limit = copier.request.options.effective_limit(),
            "starting copy"
        );

        let root = Job {
            source: source.clone(),
            relative: PathBuf::new(),
            naive_dest: copier.request.destination.clone(),
            ancestors: Arc::new(Vec::new()),
        };

        let tally = match tokio::spawn(Arc::clone(&copier).visit(root)).await {
            Ok(tally) => tally,
            Err(e) => Tally {
                stats: CopyStats::default(),
                failures: vec![EntryFailure::new(
                    &source,
                    ErrorCode::Io,
                    format!("copy task failed: {}", e),
                )],
            },
        };

        if let Some(path) = &copier.request.options.errors_file {
            if !tally.failures.is_empty() {
                if let Err(e) = append_failures(path, &tally.failures).await {
                    warn!(path = %path.display(), error = %e, "failed to write errors file");
                }
            }
        }

        info!(
            files = tally.stats.files_copied,
            dirs = tally.stats.dirs_created,
            symlinks = tally.stats.symlinks_created,
            written = tally.stats.entries_written(),
            skipped = tally.stats.entries_skipped,
            filtered = tally.stats.entries_filtered,
            bytes = tally.stats.bytes_copied,
            failed = tally.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "copy finished"
        );

        tally.into_result()
    }

    fn visit(self: Arc<Self>, job: Job) -> BoxFuture<'static, Tally> {
        async move {
            let mut tally = Tally::default();
            if self.halted.load(Ordering::SeqCst) {
                return tally;
            }

            let options = &self.request.options;
            if !options.filter.include(&job.source) {
                debug!(path = %job.source.display(), "filtered");
                tally.stats.entries_filtered += 1;
                options.emit(CopyEvent::Filtered {
                    source: job.source.clone(),
                });
                return tally;
            }

            // Destination nested inside the source must not be copied into itself
            if !job.relative.as_os_str().is_empty() && job.source == self.request.destination {
                tally.skip(options, &job.source, SkipReason::DestinationRoot);
                return tally;
            }

            if let Err(e) = self.dispatch(&job, &mut tally).await {
                self.fail(&mut tally, EntryFailure::from_io(&job.source, &e));
            }
            tally
        }
        .boxed()
    }

    async fn dispatch(self: &Arc<Self>, job: &Job, tally: &mut Tally) -> io::Result<()> {
        let options = &self.request.options;
        let permit = self.limiter.acquire().await.map_err(io::Error::other)?;

        let item = classify(&job.source, &job.relative, options.dereference).await?;
        let dest = resolve_destination(&job.naive_dest, options.rename.as_ref());
        let existing = probe_destination(&dest).await?;

        debug!(
            path = %item.source.display(),
            destination = %dest.display(),
            kind = item.kind.label(),
            exists = existing.is_some(),
            "resolved"
        );

        match item.kind {
            EntryKind::Directory => {
                self.copy_directory(item, dest, Arc::clone(&job.ancestors), permit, tally)
                    .await
            }
            EntryKind::File => self.copy_file(&item, &dest, existing, tally).await,
            EntryKind::Symlink => self.copy_link(&item, &dest, existing, tally).await,
            EntryKind::Other => {
                tally.skip(options, &item.source, SkipReason::Unsupported);
                Ok(())
            }
        }
    }

    async fn copy_directory(
        self: &Arc<Self>,
        item: TraversalItem,
        dest: PathBuf,
        ancestors: Arc<Vec<FileIdentity>>,
        permit: SemaphorePermit<'_>,
        tally: &mut Tally,
    ) -> io::Result<()> {
        let options = &self.request.options;

        let ancestors = match item.stats.identity {
            Some(identity) if options.dereference => {
                if ancestors.contains(&identity) {
                    self.fail(
                        tally,
                        EntryFailure::new(
                            &item.source,
                            ErrorCode::Loop,
                            "symlink cycle: directory is one of its own ancestors",
                        ),
                    );
                    return Ok(());
                }
                let mut chain = Vec::with_capacity(ancestors.len() + 1);
                chain.extend(ancestors.iter().copied());
                chain.push(identity);
                Arc::new(chain)
            }
            _ => ancestors,
        };

        let created = executor::create_directory(&dest).await?;
        if created {
            tally.stats.dirs_created += 1;
            options.emit(CopyEvent::Copied {
                kind: EntryKind::Directory,
                source: item.source.clone(),
                destination: dest.clone(),
                bytes: 0,
            });
        }

        let mut names = Vec::new();
        let mut listing = tokio::fs::read_dir(&item.source).await?;
        while let Some(entry) = listing.next_entry().await? {
            names.push(entry.file_name());
        }
        drop(listing);
        names.sort();

        // Children acquire their own permits
        drop(permit);

        let mut children = JoinSet::new();
        for name in names {
            if self.halted.load(Ordering::SeqCst) {
                break;
            }
            let job = Job {
                source: item.source.join(&name),
                relative: item.relative.join(&name),
                naive_dest: naive_destination(&dest, &name),
                ancestors: Arc::clone(&ancestors),
            };
            children.spawn(Arc::clone(self).visit(job));
        }

        while let Some(joined) = children.join_next().await {
            match joined {
                Ok(child) => tally.merge(child),
                Err(e) => self.fail(
                    tally,
                    EntryFailure::new(&item.source, ErrorCode::Io, format!("entry task failed: {}", e)),
                ),
            }
        }

        if created {
            if let Err(e) = executor::apply_directory_mode(&dest, item.stats.mode).await {
                self.fail(tally, EntryFailure::from_io(&item.source, &e));
            }
        }
        Ok(())
    }

    async fn copy_file(
        &self,
        item: &TraversalItem,
        dest: &Path,
        existing: Option<Existing>,
        tally: &mut Tally,
    ) -> io::Result<()> {
        let options = &self.request.options;
        let decision = decide_overwrite(
            &item.stats,
            existing.as_ref().map(|e| e.mtime),
            options.overwrite_policy(),
        );
        if let Decision::Skip(reason) = decision {
            tally.skip(options, &item.source, reason);
            return Ok(());
        }

        self.claim(dest)?;
        let bytes = copy_file_atomic(
            item,
            dest,
            options.transform.as_ref(),
            options.preserves_times(),
        )
        .await?;

        debug!(path = %item.source.display(), bytes, ?decision, "file copied");
        tally.stats.files_copied += 1;
        tally.stats.bytes_copied += bytes;
        options.emit(CopyEvent::Copied {
            kind: EntryKind::File,
            source: item.source.clone(),
            destination: dest.to_path_buf(),
            bytes,
        });
        Ok(())
    }

    async fn copy_link(
        &self,
        item: &TraversalItem,
        dest: &Path,
        existing: Option<Existing>,
        tally: &mut Tally,
    ) -> io::Result<()> {
        let options = &self.request.options;
        let target = read_link_target(&item.source).await?;

        let replace = match existing {
            None => false,
            Some(existing) => {
                if existing.kind == EntryKind::Symlink {
                    let current = read_link_target(dest).await?;
                    if current == target {
                        tally.skip(options, &item.source, SkipReason::SameLink);
                        return Ok(());
                    }
                }
                let decision = decide_overwrite(
                    &item.stats,
                    Some(existing.mtime),
                    options.overwrite_policy(),
                );
                if let Decision::Skip(reason) = decision {
                    tally.skip(options, &item.source, reason);
                    return Ok(());
                }
                true
            }
        };

        self.claim(dest)?;
        executor::copy_symlink(&target, dest, replace).await?;

        debug!(path = %item.source.display(), target = %target.display(), "symlink created");
        tally.stats.symlinks_created += 1;
        options.emit(CopyEvent::Copied {
            kind: EntryKind::Symlink,
            source: item.source.clone(),
            destination: dest.to_path_buf(),
            bytes: 0,
        });
        Ok(())
    }

    /// Reserve a non-directory destination for this invocation.
    fn claim(&self, dest: &Path) -> io::Result<()> {
        let mut claimed = self
            .claimed
            .lock()
            .map_err(|_| io::Error::other("destination claim set poisoned"))?;
        if claimed.insert(dest.to_path_buf()) {
            Ok(())
        } else {
            Err(io::Error::new(
                ErrorKind::AlreadyExists,
                format!(
                    "{} is already written by another entry of this copy",
                    dest.display()
                ),
            ))
        }
    }

    fn fail(&self, tally: &mut Tally, failure: EntryFailure) {
        warn!(path = %failure.path.display(), code = %failure.code, "{}", failure.message);
        if self.request.options.stop_on_error {
            self.halted.store(true, Ordering::SeqCst);
        }
        self.request.options.emit(CopyEvent::Failed {
            failure: failure.clone(),
        });
        tally.failures.push(failure);
    }
}

/// Append one report block per failure to `path`.
async fn append_failures(path: &Path, failures: &[EntryFailure]) -> io::Result<()> {
    let mut report = String::new();
    for failure in failures {
        report.push_str(&format!(
            "{} {}\n{}\n\n",
            failure.code,
            failure.path.display(),
            failure.message
        ));
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(report.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn failure(path: &str) -> EntryFailure {
        EntryFailure::new(path, ErrorCode::NotFound, "gone")
    }

    #[test]
    fn test_tally_merge_and_result() {
        let mut parent = Tally::default();
        parent.stats.dirs_created = 1;

        let mut child = Tally::default();
        child.stats.files_copied = 2;
        child.failures.push(failure("/src/x"));

        parent.merge(child);
        let failures = parent.into_result().expect_err("one failure");

        assert_eq!(failures.len(), 1);
        assert_eq!(failures.stats.files_copied, 2);
        assert_eq!(failures.stats.dirs_created, 1);
    }

    #[test]
    fn test_empty_tally_is_success() {
        let stats = Tally::default().into_result().expect("success");
        assert_eq!(stats, CopyStats::default());
    }

    #[test]
    fn test_request_paths_are_absolute() {
        let request = CopyRequest::new("relative/src", "relative/out", CopyOptions::default());
        assert!(request.source.is_absolute());
        assert!(request.destination.is_absolute());
        assert!(request.source.ends_with("relative/src"));
    }

    #[tokio::test]
    async fn test_copy_nested_tree() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("src");
        let out = temp.path().join("out");
        fs::create_dir_all(src.join("a/b")).expect("create dirs");
        fs::write(src.join("top.txt"), b"top").expect("write top");
        fs::write(src.join("a/b/deep.txt"), b"deep").expect("write deep");

        let stats = copy(&src, &out, CopyOptions::default())
            .await
            .expect("copy succeeds");

        assert_eq!(fs::read(out.join("top.txt")).expect("read top"), b"top");
        assert_eq!(fs::read(out.join("a/b/deep.txt")).expect("read deep"), b"deep");
        assert_eq!(stats.files_copied, 2);
        assert_eq!(stats.dirs_created, 3);
        assert_eq!(stats.bytes_copied, 7);
    }

    #[tokio::test]
    async fn test_missing_source_reports_enoent() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("nope");

        let failures = copy(&src, temp.path().join("out"), CopyOptions::default())
            .await
            .expect_err("missing source");

        assert_eq!(failures.len(), 1);
        assert_eq!(failures.failures[0].code, ErrorCode::NotFound);
        assert_eq!(failures.failures[0].path, src);
        assert!(!temp.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_single_file_source() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("one.txt");
        fs::write(&src, b"solo").expect("write file");

        let stats = copy(&src, temp.path().join("two.txt"), CopyOptions::default())
            .await
            .expect("copy succeeds");

        assert_eq!(stats.files_copied, 1);
        assert_eq!(fs::read(temp.path().join("two.txt")).expect("read"), b"solo");
    }

    #[tokio::test]
    async fn test_destination_inside_source_is_not_recursed() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("create src");
        fs::write(src.join("file.txt"), b"x").expect("write file");
        let out = src.join("backup");

        let stats = copy(&src, &out, CopyOptions::default())
            .await
            .expect("copy succeeds");

        assert!(out.join("file.txt").exists());
        assert!(!out.join("backup").exists());
        assert_eq!(stats.files_copied, 1);
    }

    #[tokio::test]
    async fn test_errors_file_receives_failures() {
        let temp = TempDir::new().expect("create temp dir");
        let errors = temp.path().join("errors.log");
        let options = CopyOptions::default().with_errors_file(&errors);

        let result = copy(temp.path().join("missing"), temp.path().join("out"), options).await;
        assert!(result.is_err());

        let report = fs::read_to_string(&errors).expect("errors file written");
        assert!(report.contains("ENOENT"));
        assert!(report.contains("missing"));
    }

    #[tokio::test]
    async fn test_limit_of_one_still_completes_deep_tree() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("src");
        let mut deep = src.clone();
        for level in 0..8 {
            deep = deep.join(format!("level{}", level));
        }
        fs::create_dir_all(&deep).expect("create deep dirs");
        fs::write(deep.join("leaf.txt"), b"leaf").expect("write leaf");
        fs::write(src.join("root.txt"), b"root").expect("write root");

        let stats = copy(&src, temp.path().join("out"), CopyOptions::default().with_limit(1))
            .await
            .expect("copy succeeds");

        assert_eq!(stats.files_copied, 2);
        assert_eq!(stats.dirs_created, 9);
    }

    #[tokio::test]
    async fn test_events_reported_per_entry() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("create src");
        fs::write(src.join("keep.txt"), b"k").expect("write keep");
        fs::write(src.join("skip.log"), b"s").expect("write skip");

        let copied = Arc::new(AtomicUsize::new(0));
        let filtered = Arc::new(AtomicUsize::new(0));
        let (c, f) = (Arc::clone(&copied), Arc::clone(&filtered));
        let options = CopyOptions::default()
            .with_filter(|path: &Path| path.extension().map_or(true, |ext| ext != "log"))
            .with_event_callback(move |event| match event {
                CopyEvent::Copied { .. } => {
                    c.fetch_add(1, Ordering::SeqCst);
                }
                CopyEvent::Filtered { .. } => {
                    f.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            });

        let stats = copy(&src, temp.path().join("out"), options)
            .await
            .expect("copy succeeds");

        // root directory + keep.txt
        assert_eq!(copied.load(Ordering::SeqCst), 2);
        assert_eq!(filtered.load(Ordering::SeqCst), 1);
        assert_eq!(stats.entries_filtered, 1);
    }

    #[test]
    fn test_copy_blocking() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("create src");
        fs::write(src.join("a"), b"x").expect("write file");

        let stats = copy_blocking(&src, temp.path().join("out"), CopyOptions::default())
            .expect("copy succeeds");
        assert_eq!(stats.files_copied, 1);
    }
}
