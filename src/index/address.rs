use derive_more::Display;
use indextree::NodeId;

/// Number of columns exposed to column-oriented consumers.
pub const COLUMN_COUNT: usize = 1;

/// Opaque, short-lived handle to a node: `(row, column)` under its parent.
///
/// Addresses are stamped with the tree revision they were issued at. Any
/// structural mutation that moves or removes rows bumps the revision, after
/// which the tree rejects older addresses. The default address is the
/// root/invalid sentinel, which never goes stale.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[display("({row}, {column})@{revision}")]
pub struct Address {
    row: usize,
    column: usize,
    node: Option<NodeId>,
    revision: u64,
}

impl Address {
    /// The sentinel for "no parent": the implicit, non-addressable root.
    pub const fn root() -> Self {
        Self {
            row: 0,
            column: 0,
            node: None,
            revision: 0,
        }
    }

    /// Same sentinel as [`Address::root`], returned for out-of-range lookups.
    pub const fn invalid() -> Self {
        Self::root()
    }

    pub(crate) fn new(row: usize, column: usize, node: NodeId, revision: u64) -> Self {
        Self {
            row,
            column,
            node: Some(node),
            revision,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.node.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.node.is_none()
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn node(&self) -> Option<NodeId> {
        self.node
    }
}
