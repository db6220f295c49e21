use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use indextree::NodeId;
use snafu::{ensure, ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::ext::PathExt;
use crate::filesystem::FsError;

use super::address::Address;
use super::builder::is_listed;
use super::node::NodeRef;
use super::tree::{FsTree, IndexError};

impl FsTree {
    /// Renames the entry at `address` on disk and in the index.
    ///
    /// On failure neither the disk nor the tree changes and no notification
    /// is sent. On success the entry either changes in place (`data_changed`)
    /// or, when the new name sorts it to another row, moves with a remove
    /// bracket followed by an insert bracket. Returns the entry's new address,
    /// or [`Address::invalid`] when the new name is hidden by the tree options
    /// and the row was dropped.
    pub fn rename(&mut self, address: Address, new_name: &str) -> Result<Address, MutationError> {
        let id = self.resolve(address).context(AddressSnafu)?;
        if id == self.root {
            return RootNotMutableSnafu.fail();
        }
        ensure!(is_valid_name(new_name), InvalidNameSnafu { name: new_name });

        let node = NodeRef::new(&self.arena, id);
        let Some(parent) = node.parent() else {
            return RootNotMutableSnafu.fail();
        };
        let from = node.path().to_path_buf();
        if node.entry().file_name() == new_name {
            debug!("Rename of {} to its own name ignored", from.display());
            return Ok(address);
        }
        let to = parent.path().join(new_name);
        let parent = parent.id();

        if let Err(source) = self.fs.rename(&from, &to) {
            warn!("Failed to rename {} to {}: {}", from.display(), to.display(), source);
            return Err(MutationError::RenameError { from, to, source });
        }
        info!("Renamed {} to {}", from.display(), to.display());

        self.rebase_subtree(id, &from, &to);

        let old_row = NodeRef::new(&self.arena, id).row_in_parent();
        if !is_listed(OsStr::new(new_name), &self.options) {
            debug!("{} is hidden, dropping row {}", to.display(), old_row);
            for removed in self.detach_rows(parent, old_row, old_row) {
                removed.remove_subtree(&mut self.arena);
            }
            return Ok(Address::invalid());
        }
        let new_row = self.sorted_row(parent, id);
        if new_row == old_row {
            let address = self.address_of(id);
            self.notify(|observer, tree| observer.data_changed(tree, address));
            return Ok(address);
        }

        debug!("Rename moves row {} to row {}", old_row, new_row);
        self.detach_rows(parent, old_row, old_row);
        self.insert_row(parent, new_row, id);
        Ok(self.address_of(id))
    }

    /// Deletes the entry at `address` from disk (recursively for directories)
    /// and from the index.
    ///
    /// An entry that is already gone from disk counts as deleted. Any other
    /// failure leaves the tree untouched and sends no notification.
    pub fn delete(&mut self, address: Address) -> Result<(), MutationError> {
        let id = self.resolve(address).context(AddressSnafu)?;
        if id == self.root {
            return RootNotMutableSnafu.fail();
        }

        let node = NodeRef::new(&self.arena, id);
        let path = node.path().to_path_buf();
        let outcome = if node.is_dir() {
            self.fs.remove_dir_all(&path)
        } else {
            self.fs.remove_file(&path)
        };
        match outcome {
            Ok(()) => info!("Deleted {}", path.display()),
            Err(FsError::NotFound { .. }) => debug!("{} was already gone", path.display()),
            Err(source) => {
                warn!("Failed to delete {}: {}", path.display(), source);
                return Err(MutationError::DeleteError { path, source });
            }
        }

        let Some(parent) = self.arena[id].parent() else {
            return RootNotMutableSnafu.fail();
        };
        let row = NodeRef::new(&self.arena, id).row_in_parent();
        for removed in self.detach_rows(parent, row, row) {
            removed.remove_subtree(&mut self.arena);
        }
        Ok(())
    }

    /// Rewrites cached paths below a renamed node.
    fn rebase_subtree(&mut self, id: NodeId, from: &Path, to: &Path) {
        let subtree = id.descendants(&self.arena).collect::<Vec<_>>();
        for node in subtree {
            let entry = self.arena[node].get_mut();
            if let Some(path) = entry.path().rebase(from, to) {
                entry.set_path(path);
            }
        }
    }

    /// Row `id` belongs at among its siblings under the current sort order.
    fn sorted_row(&self, parent: NodeId, id: NodeId) -> usize {
        let entry = self.arena[id].get();
        parent
            .children(&self.arena)
            .filter(|sibling| *sibling != id)
            .take_while(|sibling| {
                self.arena[*sibling]
                    .get()
                    .compare(entry, self.options.directories_first)
                    .is_lt()
            })
            .count()
    }
}

/// A single, non-empty path segment.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains(std::path::MAIN_SEPARATOR)
        && !name.contains('\0')
}

#[derive(Debug, Snafu)]
pub enum MutationError {
    #[snafu(display("Mutation through an invalid address"))]
    AddressError { source: IndexError },
    #[snafu(display("'{}' is not a valid entry name", name))]
    InvalidName { name: String },
    #[snafu(display("The index root cannot be renamed or deleted"))]
    RootNotMutable,
    #[snafu(display("Failed to rename {} to {}", from.display(), to.display()))]
    RenameError {
        from: PathBuf,
        to: PathBuf,
        source: FsError,
    },
    #[snafu(display("Failed to delete {}", path.display()))]
    DeleteError { path: PathBuf, source: FsError },
}

impl MutationError {
    /// The filesystem failure behind this error, if any.
    pub fn fs_error(&self) -> Option<&FsError> {
        match self {
            MutationError::RenameError { source, .. } | MutationError::DeleteError { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
