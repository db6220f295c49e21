//! Hierarchical index of a directory subtree.
//!
//! [`FsTree`] caches the subtree below a root path in an arena and exposes it
//! through row/column [`Address`]es. Directories are enumerated on demand
//! (or up front, see [`PopulationMode`]), renames and deletes go to disk
//! first and are mirrored in the tree, and every structural change is
//! announced to subscribed [`TreeObserver`]s.

mod address;
mod builder;
mod mutation;
mod node;
mod notify;
mod scan;
#[cfg(test)]
mod test_support;
mod tree;

pub use address::{Address, COLUMN_COUNT};
pub use builder::{PopulationMode, TreeOptions};
pub use indextree::NodeId;
pub use mutation::MutationError;
pub use node::{Entry, EntryInfo, NodeRef, Population};
pub use notify::{EventLog, TreeEvent, TreeObserver};
pub use scan::{BackgroundScanner, ScanDispatchError, ScanResult, ScannerCreationError};
pub use tree::{FsTree, IndexError};
