//! Path filtering
//!
//! A filter decides whether an entry takes part in the copy. It is consulted
//! once per entry, before the entry is even stat'ed; an excluded directory is
//! never listed, so nothing beneath it is visited.

use crate::types::CopyError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

/// Inclusion predicate over absolute source paths.
///
/// Implementations are shared across concurrently running branches and must
/// not rely on interior mutability for their answer.
pub trait PathFilter: Send + Sync {
    /// Return `true` to copy `path`, `false` to skip it (and its subtree).
    fn include(&self, path: &Path) -> bool;
}

impl<F> PathFilter for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn include(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Default filter: everything is copied.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PathFilter for AcceptAll {
    fn include(&self, _path: &Path) -> bool {
        true
    }
}

/// Includes paths matching a regular expression.
///
/// The expression is tested against the whole absolute source path, so
/// `[^a]$` excludes every entry whose name ends in `a`.
#[derive(Debug, Clone)]
pub struct RegexFilter {
    pattern: Regex,
}

impl RegexFilter {
    pub fn new(pattern: &str) -> Result<Self, CopyError> {
        let pattern = Regex::new(pattern).map_err(|e| {
            CopyError::Config(format!("Invalid filter pattern '{}': {}", pattern, e))
        })?;
        Ok(Self { pattern })
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl PathFilter for RegexFilter {
    fn include(&self, path: &Path) -> bool {
        self.pattern.is_match(&path.to_string_lossy())
    }
}

/// Exclude/include globs matched against the path relative to `root`.
///
/// Include patterns override excludes. Paths outside `root` are matched as
/// given. The root itself (empty relative path) is always included.
#[derive(Clone)]
pub struct GlobFilter {
    root: PathBuf,
    exclude: GlobSet,
    include: GlobSet,
}

impl GlobFilter {
    pub fn new(
        root: impl Into<PathBuf>,
        exclude_patterns: &[String],
        include_patterns: &[String],
    ) -> Result<Self, CopyError> {
        Ok(Self {
            root: root.into(),
            exclude: compile_patterns(exclude_patterns)?,
            include: compile_patterns(include_patterns)?,
        })
    }

    /// True when neither pattern list has any entry
    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty() && self.include.is_empty()
    }
}

impl fmt::Debug for GlobFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobFilter")
            .field("root", &self.root)
            .field("exclude", &self.exclude.len())
            .field("include", &self.include.len())
            .finish()
    }
}

impl PathFilter for GlobFilter {
    fn include(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative.as_os_str().is_empty() {
            return true;
        }
        should_include_path(relative, &self.exclude, &self.include)
    }
}

/// Compile glob patterns into a single matcher.
pub fn compile_patterns(patterns: &[String]) -> Result<GlobSet, CopyError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| CopyError::Config(format!("Invalid glob pattern '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CopyError::Config(format!("Failed to build glob patterns: {}", e)))
}

/// Apply exclude/include sets to a relative path.
///
/// A pattern matches either the whole relative path or the entry's file name.
pub fn should_include_path(relative: &Path, exclude: &GlobSet, include: &GlobSet) -> bool {
    let matches = |set: &GlobSet| {
        set.is_match(relative)
            || relative
                .file_name()
                .map(|name| set.is_match(Path::new(name)))
                .unwrap_or(false)
    };

    if !include.is_empty() && matches(include) {
        return true;
    }
    !matches(exclude)
}

/// Every filter in the list must include the path.
pub struct AllOf {
    filters: Vec<Box<dyn PathFilter>>,
}

impl AllOf {
    pub fn new(filters: Vec<Box<dyn PathFilter>>) -> Self {
        Self { filters }
    }
}

impl PathFilter for AllOf {
    fn include(&self, path: &Path) -> bool {
        self.filters.iter().all(|filter| filter.include(path))
    }
}
