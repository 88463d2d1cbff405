//! Command implementations for the `treecp` binary

pub mod copy;
