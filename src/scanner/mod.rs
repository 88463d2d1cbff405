//! Tree traversal: entry classification and the recursive copy walker

mod classify;
mod walker;

pub use classify::{classify, read_link_target};
pub use walker::{copy, copy_blocking, CopyRequest};
