//! Overwrite policy for an existing destination

use crate::types::{EntryStats, SkipReason};
use std::time::SystemTime;

/// Policy knobs that decide whether an existing destination is replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverwritePolicy {
    pub clobber: bool,
    pub modified: bool,
}

impl Default for OverwritePolicy {
    fn default() -> Self {
        Self {
            clobber: true,
            modified: false,
        }
    }
}

/// What to do with a resolved destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing exists at the destination
    Create,
    /// Something exists and will be replaced
    Replace,
    /// Leave the destination alone
    Skip(SkipReason),
}

/// Decide the fate of a non-directory entry.
///
/// `existing_mtime` is the destination's modification time, `None` when the
/// destination does not exist.
///
/// 1. **No destination** → Create
/// 2. **`modified` set** → Replace only if the source is strictly newer,
///    regardless of `clobber`
/// 3. **`clobber` set** → Replace
/// 4. Otherwise → Skip
pub fn decide_overwrite(
    source: &EntryStats,
    existing_mtime: Option<SystemTime>,
    policy: OverwritePolicy,
) -> Decision {
    let Some(dest_mtime) = existing_mtime else {
        return Decision::Create;
    };

    if policy.modified {
        return match source.mtime.cmp(&dest_mtime) {
            std::cmp::Ordering::Greater => Decision::Replace,
            // Destination is as new or newer; keep it
            _ => Decision::Skip(SkipReason::UpToDate),
        };
    }

    if policy.clobber {
        Decision::Replace
    } else {
        Decision::Skip(SkipReason::NoClobber)
    }
}
