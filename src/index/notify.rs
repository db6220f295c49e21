//! Change notifications pushed to whoever renders the tree.
//!
//! Structural changes arrive bracketed: `begin_*` is delivered while the tree
//! still shows the old rows, `end_*` once the new rows are in place. Callbacks
//! only get a shared borrow of the tree, so they can read it but cannot trigger
//! expansion or mutation while a change is in flight.

use std::cell::RefCell;
use std::rc::Rc;

use super::{Address, FsTree};

pub trait TreeObserver {
    /// Rows `first..=last` are about to appear under `parent`.
    fn begin_insert_rows(&mut self, _tree: &FsTree, _parent: Address, _first: usize, _last: usize) {}

    fn end_insert_rows(&mut self, _tree: &FsTree) {}

    /// Rows `first..=last` under `parent` are about to disappear. The nodes are
    /// still readable through `tree` at this point.
    fn begin_remove_rows(&mut self, _tree: &FsTree, _parent: Address, _first: usize, _last: usize) {}

    fn end_remove_rows(&mut self, _tree: &FsTree) {}

    /// The entry at `address` changed without moving.
    fn data_changed(&mut self, _tree: &FsTree, _address: Address) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    BeginInsertRows {
        parent: Address,
        first: usize,
        last: usize,
    },
    EndInsertRows,
    BeginRemoveRows {
        parent: Address,
        first: usize,
        last: usize,
    },
    EndRemoveRows,
    DataChanged {
        address: Address,
    },
}

/// Observer that records every notification. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<TreeEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TreeEvent> {
        self.events.borrow().clone()
    }

    pub fn take(&self) -> Vec<TreeEvent> {
        self.events.take()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    fn push(&self, event: TreeEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl TreeObserver for EventLog {
    fn begin_insert_rows(&mut self, _tree: &FsTree, parent: Address, first: usize, last: usize) {
        self.push(TreeEvent::BeginInsertRows {
            parent,
            first,
            last,
        });
    }

    fn end_insert_rows(&mut self, _tree: &FsTree) {
        self.push(TreeEvent::EndInsertRows);
    }

    fn begin_remove_rows(&mut self, _tree: &FsTree, parent: Address, first: usize, last: usize) {
        self.push(TreeEvent::BeginRemoveRows {
            parent,
            first,
            last,
        });
    }

    fn end_remove_rows(&mut self, _tree: &FsTree) {
        self.push(TreeEvent::EndRemoveRows);
    }

    fn data_changed(&mut self, _tree: &FsTree, address: Address) {
        self.push(TreeEvent::DataChanged { address });
    }
}
