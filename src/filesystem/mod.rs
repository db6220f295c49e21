//! Filesystem collaborator consumed by the index.
//!
//! The index never touches the disk directly. Every enumeration, rename and
//! delete goes through the [`FileSystem`] trait, so the tree can be driven by
//! the real disk ([`LocalFileSystem`]) or by an in-memory double in tests.

mod local;
#[cfg(test)]
pub(crate) mod memory;
mod provider;

pub use local::LocalFileSystem;
pub use provider::{DirEntry, FileSystem, FsError, SharedFileSystem};
