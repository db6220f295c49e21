use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use indextree::{Arena, NodeId};
use snafu::Snafu;
use tracing::{debug, error, info};

use crate::filesystem::{LocalFileSystem, SharedFileSystem};

use super::address::{Address, COLUMN_COUNT};
use super::builder::{attach_children, entries_from_outcome, read_entries, TreeBuilder, TreeOptions};
use super::node::{Entry, EntryInfo, NodeRef};
use super::notify::TreeObserver;
use super::scan::ScanResult;

/// In-memory index of a directory subtree.
///
/// All navigation goes through [`Address`]es. Queries that may enumerate a
/// directory take `&mut self`; pure reads take `&self`.
pub struct FsTree {
    pub(super) arena: Arena<Entry>,
    pub(super) root: NodeId,
    pub(super) fs: SharedFileSystem,
    pub(super) options: TreeOptions,
    pub(super) revision: u64,
    observers: Vec<Box<dyn TreeObserver>>,
}

impl FsTree {
    pub fn new(root: impl Into<PathBuf>, fs: SharedFileSystem, options: TreeOptions) -> Self {
        let root = root.into();
        info!("Indexing {} ({})", root.display(), options.mode);
        let (arena, root_id) = TreeBuilder::new(fs.as_ref(), &options).build(&root);

        Self {
            arena,
            root: root_id,
            fs,
            options,
            revision: 0,
            observers: Vec::new(),
        }
    }

    pub fn with_local_fs(root: impl Into<PathBuf>, options: TreeOptions) -> Self {
        Self::new(root, Arc::new(LocalFileSystem), options)
    }

    pub fn root_path(&self) -> &Path {
        self.arena[self.root].get().path()
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Counter of structural mutations. Addresses from older revisions are
    /// rejected.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self, observer: impl TreeObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn root_node(&self) -> NodeRef<'_> {
        NodeRef::new(&self.arena, self.root)
    }

    /// Looks up a node handle. Returns `None` once the node has been removed.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.is_live(id).then(|| NodeRef::new(&self.arena, id))
    }

    pub fn address_for(&self, node: NodeId) -> Result<Address, IndexError> {
        if !self.is_live(node) {
            error!("Asked for the address of a node outside the tree: {:?}", node);
            return UnknownNodeSnafu { node }.fail();
        }
        Ok(self.address_of(node))
    }

    /// Returns the root sentinel for top-level entries and for the root itself.
    pub fn parent_of(&self, address: Address) -> Result<Address, IndexError> {
        let id = self.resolve(address)?;
        if id == self.root {
            return Ok(Address::root());
        }
        Ok(self.arena[id]
            .parent()
            .map_or(Address::root(), |parent| self.address_of(parent)))
    }

    /// Number of children below `address`.
    ///
    /// If `address` is a directory that has not been enumerated yet, this
    /// enumerates it first (exactly once). The expansion emits no
    /// notifications and leaves every issued address valid, since no
    /// existing row moves.
    pub fn row_count(&mut self, address: Address) -> Result<usize, IndexError> {
        let id = self.resolve(address)?;
        let entry = self.arena[id].get();
        if entry.is_dir() && !entry.is_populated() {
            self.expand(id);
        }
        Ok(id.children(&self.arena).count())
    }

    pub fn column_count(&self, _address: Address) -> usize {
        COLUMN_COUNT
    }

    /// Address of the child at `row` under `parent`, or [`Address::invalid`]
    /// when `row` or `column` is out of range. Never enumerates.
    pub fn address_at(&self, row: usize, column: usize, parent: Address) -> Result<Address, IndexError> {
        let parent_id = self.resolve(parent)?;
        if column >= COLUMN_COUNT {
            return Ok(Address::invalid());
        }
        Ok(parent_id
            .children(&self.arena)
            .nth(row)
            .map_or(Address::invalid(), |child| {
                Address::new(row, column, child, self.revision)
            }))
    }

    pub fn data(&self, address: Address) -> Result<EntryInfo, IndexError> {
        self.node_at(address).map(|node| node.info())
    }

    pub fn node_at(&self, address: Address) -> Result<NodeRef<'_>, IndexError> {
        let id = self.resolve(address)?;
        Ok(NodeRef::new(&self.arena, id))
    }

    /// True when `address` has children or may have some once enumerated.
    pub fn has_children(&self, address: Address) -> Result<bool, IndexError> {
        let node = self.node_at(address)?;
        Ok(node.is_dir() && (!node.is_populated() || node.child_count() > 0))
    }

    /// Enumerates an unpopulated directory, announcing the new rows.
    /// Returns the number of rows added.
    pub fn fetch_more(&mut self, address: Address) -> Result<usize, IndexError> {
        let id = self.resolve(address)?;
        let entry = self.arena[id].get();
        if !entry.is_dir() || entry.is_populated() {
            return Ok(0);
        }
        let path = entry.path().to_path_buf();
        let entries = read_entries(self.fs.as_ref(), &path, &self.options);
        Ok(self.insert_children(id, entries))
    }

    /// Address of the entry at `path`, enumerating directories on the way.
    /// The root path maps to the root sentinel.
    pub fn find(&mut self, path: &Path) -> Option<Address> {
        let relative = path.strip_prefix(self.root_path()).ok()?.to_path_buf();
        let mut current = self.root;
        for component in relative.components() {
            let Component::Normal(name) = component else {
                return None;
            };
            let entry = self.arena[current].get();
            if entry.is_dir() && !entry.is_populated() {
                self.expand(current);
            }
            current = current
                .children(&self.arena)
                .find(|child| self.arena[*child].get().file_name() == name)?;
        }
        Some(self.address_of(current))
    }

    /// Re-enumerates a populated directory. Existing rows are announced as
    /// removed, the fresh listing as inserted. Descendants are collapsed back
    /// to unpopulated.
    pub fn refresh(&mut self, address: Address) -> Result<usize, IndexError> {
        let id = self.resolve(address)?;
        let entry = self.arena[id].get();
        if !entry.is_dir() || !entry.is_populated() {
            return Ok(0);
        }
        let path = entry.path().to_path_buf();
        debug!("Refreshing {}", path.display());
        let entries = read_entries(self.fs.as_ref(), &path, &self.options);

        let existing = id.children(&self.arena).count();
        if existing > 0 {
            for detached in self.detach_rows(id, 0, existing - 1) {
                detached.remove_subtree(&mut self.arena);
            }
        }
        Ok(self.insert_children(id, entries))
    }

    /// Rebuilds the index for a new root path.
    ///
    /// The new tree is built in the same arena, so node ids handed out before
    /// the rebuild are recognised as removed instead of aliasing new nodes.
    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        let root = root.into();
        info!("Re-rooting index at {} ({})", root.display(), self.options.mode);

        let existing = self.root.children(&self.arena).count();
        if existing > 0 {
            for detached in self.detach_rows(self.root, 0, existing - 1) {
                detached.remove_subtree(&mut self.arena);
            }
        }

        let new_root = TreeBuilder::new(self.fs.as_ref(), &self.options).build_into(&mut self.arena, &root);
        let incoming = new_root.children(&self.arena).count();
        if incoming > 0 {
            self.notify(|observer, tree| {
                observer.begin_insert_rows(tree, Address::root(), 0, incoming - 1)
            });
        }
        let old_root = std::mem::replace(&mut self.root, new_root);
        old_root.remove_subtree(&mut self.arena);
        self.revision += 1;
        if incoming > 0 {
            self.notify(|observer, tree| observer.end_insert_rows(tree));
        }
    }

    /// Applies a listing produced by the background scanner. Results
    /// requested at an older revision, or for directories that left the tree
    /// or were populated meanwhile, are discarded.
    pub fn apply_scan(&mut self, result: ScanResult) -> usize {
        if result.revision != self.revision {
            debug!(
                "Discarding scan of {}: requested at revision {}, tree is at {}",
                result.path.display(),
                result.revision,
                self.revision
            );
            return 0;
        }
        let Some(id) = self.lookup(&result.path) else {
            debug!("Discarding scan of {}: not indexed", result.path.display());
            return 0;
        };
        let entry = self.arena[id].get();
        if !entry.is_dir() || entry.is_populated() {
            debug!("Discarding scan of {}: already populated", result.path.display());
            return 0;
        }
        let entries = entries_from_outcome(&result.path, result.outcome, &self.options);
        self.insert_children(id, entries)
    }

    pub(super) fn resolve(&self, address: Address) -> Result<NodeId, IndexError> {
        let Some(id) = address.node() else {
            return Ok(self.root);
        };
        if address.revision() != self.revision
            || address.column() >= COLUMN_COUNT
            || !self.is_live(id)
        {
            error!(
                "Rejected stale address {} (tree is at revision {})",
                address, self.revision
            );
            return InvalidAddressSnafu {
                address,
                revision: self.revision,
            }
            .fail();
        }
        Ok(id)
    }

    pub(super) fn address_of(&self, id: NodeId) -> Address {
        if id == self.root {
            return Address::root();
        }
        let row = NodeRef::new(&self.arena, id).row_in_parent();
        Address::new(row, 0, id, self.revision)
    }

    /// Existing, attached to this tree's root.
    fn is_live(&self, id: NodeId) -> bool {
        if id == self.root {
            return true;
        }
        self.arena.get(id).is_some()
            && !id.is_removed(&self.arena)
            && id.ancestors(&self.arena).last() == Some(self.root)
    }

    /// Node at `path` among the nodes enumerated so far.
    fn lookup(&self, path: &Path) -> Option<NodeId> {
        let relative = path.strip_prefix(self.root_path()).ok()?;
        relative.components().try_fold(self.root, |current, component| {
            let Component::Normal(name) = component else {
                return None;
            };
            current
                .children(&self.arena)
                .find(|child| self.arena[*child].get().file_name() == name)
        })
    }

    /// Silent one-level enumeration used by queries.
    fn expand(&mut self, id: NodeId) -> usize {
        let path = self.arena[id].get().path().to_path_buf();
        let entries = read_entries(self.fs.as_ref(), &path, &self.options);
        let count = attach_children(&mut self.arena, id, entries);
        debug!("Expanded {} with {} entries", path.display(), count);
        count
    }

    /// Appends `entries` after the existing children of `id`, bracketed by
    /// insert notifications, and marks `id` populated.
    pub(super) fn insert_children(&mut self, id: NodeId, entries: Vec<Entry>) -> usize {
        if entries.is_empty() {
            return attach_children(&mut self.arena, id, entries);
        }
        let parent = self.address_of(id);
        let first = id.children(&self.arena).count();
        let last = first + entries.len() - 1;
        self.notify(|observer, tree| observer.begin_insert_rows(tree, parent, first, last));
        let count = attach_children(&mut self.arena, id, entries);
        self.notify(|observer, tree| observer.end_insert_rows(tree));
        count
    }

    /// Detaches rows `first..=last` of `parent`, bracketed by remove
    /// notifications. The detached nodes stay in the arena; the caller frees
    /// or re-inserts them.
    pub(super) fn detach_rows(&mut self, parent: NodeId, first: usize, last: usize) -> Vec<NodeId> {
        let parent_address = self.address_of(parent);
        self.notify(|observer, tree| {
            observer.begin_remove_rows(tree, parent_address, first, last)
        });

        let detached = parent
            .children(&self.arena)
            .skip(first)
            .take(last + 1 - first)
            .collect::<Vec<_>>();
        for id in &detached {
            id.detach(&mut self.arena);
        }
        self.revision += 1;

        self.notify(|observer, tree| observer.end_remove_rows(tree));
        detached
    }

    /// Inserts a detached `node` at `row` under `parent`, bracketed by insert
    /// notifications.
    pub(super) fn insert_row(&mut self, parent: NodeId, row: usize, node: NodeId) {
        let parent_address = self.address_of(parent);
        self.notify(|observer, tree| observer.begin_insert_rows(tree, parent_address, row, row));

        let sibling = parent.children(&self.arena).nth(row);
        match sibling {
            Some(sibling) => sibling.insert_before(node, &mut self.arena),
            None => parent.append(node, &mut self.arena),
        }

        self.notify(|observer, tree| observer.end_insert_rows(tree));
    }

    pub(super) fn notify(&mut self, mut emit: impl FnMut(&mut (dyn TreeObserver + 'static), &FsTree)) {
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            emit(observer.as_mut(), self);
        }
        self.observers = observers;
    }
}

#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(super)))]
pub enum IndexError {
    #[snafu(display("Address {address} is stale or out of range (tree is at revision {revision})"))]
    InvalidAddress { address: Address, revision: u64 },
    #[snafu(display("Node {node:?} is not part of this tree"))]
    UnknownNode { node: NodeId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::memory::MemoryFileSystem;
    use crate::index::notify::TreeEvent;
    use crate::index::test_support::{lazy_tree, project, Fixture};
    use crate::index::PopulationMode;
    use rstest::*;

    #[test]
    fn lazy_root_lists_top_level_entries() {
        let fs = Arc::new(
            MemoryFileSystem::with_root("/r")
                .dir("/r/a")
                .file("/r/a/inner.txt")
                .file("/r/b.txt"),
        );
        let mut tree = lazy_tree("/r", fs.clone());

        assert_eq!(tree.row_count(Address::root()).unwrap(), 2);
        let a = tree.address_at(0, 0, Address::root()).unwrap();
        let info = tree.data(a).unwrap();
        assert_eq!(info.label, "a");
        assert!(info.is_dir);
        assert!(!tree.node_at(a).unwrap().is_populated());

        assert_eq!(tree.row_count(a).unwrap(), 1);
        assert!(tree.node_at(a).unwrap().is_populated());
        assert_eq!(fs.read_dir_calls("/r/a"), 1);
    }

    #[rstest]
    fn row_count_enumerates_exactly_once(project: Fixture) {
        let Fixture { mut tree, fs, .. } = project;
        let src = tree.find(Path::new("/p/src")).unwrap();

        let docs = tree.address_at(0, 0, Address::root()).unwrap();
        assert_eq!(tree.data(docs).unwrap().label, "docs");
        assert_eq!(fs.read_dir_calls("/p/docs"), 0);

        let first = tree.row_count(docs).unwrap();
        let second = tree.row_count(docs).unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 2);
        assert_eq!(fs.read_dir_calls("/p/docs"), 1);
        // Expansion does not invalidate other addresses.
        assert!(tree.data(src).is_ok());
    }

    #[rstest]
    fn addresses_round_trip_through_their_parent(project: Fixture) {
        let Fixture { mut tree, .. } = project;
        let guide = tree.find(Path::new("/p/docs/guide.md")).unwrap();

        let parent = tree.parent_of(guide).unwrap();
        assert_eq!(tree.data(parent).unwrap().label, "docs");
        assert_eq!(tree.parent_of(parent).unwrap(), Address::root());

        let again = tree.address_at(guide.row(), 0, parent).unwrap();
        assert_eq!(again, guide);
        let node = tree.node_at(guide).unwrap();
        assert_eq!(tree.address_for(node.id()).unwrap(), guide);
    }

    #[rstest]
    fn every_node_is_its_parents_child_at_its_row(project: Fixture) {
        let Fixture { mut tree, .. } = project;
        tree.find(Path::new("/p/src/bin/tool.rs")).unwrap();
        tree.find(Path::new("/p/docs/guide.md")).unwrap();

        let root = tree.root_node();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            for child in node.children() {
                assert_eq!(node.child_at(child.row_in_parent()), Some(child));
                pending.push(child);
            }
        }
    }

    #[rstest]
    #[case(9, 0)]
    #[case(0, 1)]
    fn address_at_out_of_range_is_invalid(
        project: Fixture,
        #[case] row: usize,
        #[case] column: usize,
    ) {
        let Fixture { tree, .. } = project;

        let address = tree.address_at(row, column, Address::root()).unwrap();

        assert!(!address.is_valid());
    }

    #[rstest]
    fn column_count_is_constant(project: Fixture) {
        let Fixture { tree, .. } = project;
        let first = tree.address_at(0, 0, Address::root()).unwrap();

        assert_eq!(tree.column_count(Address::root()), 1);
        assert_eq!(tree.column_count(first), 1);
    }

    #[rstest]
    fn files_have_no_rows(project: Fixture) {
        let Fixture { mut tree, fs, .. } = project;
        let readme = tree.find(Path::new("/p/README.md")).unwrap();

        assert_eq!(tree.row_count(readme).unwrap(), 0);
        assert!(!tree.has_children(readme).unwrap());
        assert_eq!(fs.read_dir_calls("/p/README.md"), 0);
    }

    #[rstest]
    fn has_children_does_not_enumerate(project: Fixture) {
        let Fixture { tree, fs, .. } = project;
        let docs = tree.address_at(0, 0, Address::root()).unwrap();

        assert!(tree.has_children(docs).unwrap());
        assert_eq!(fs.read_dir_calls("/p/docs"), 0);
    }

    #[rstest]
    fn find_returns_none_for_unknown_paths(project: Fixture) {
        let Fixture { mut tree, .. } = project;

        assert!(tree.find(Path::new("/p/nope")).is_none());
        assert!(tree.find(Path::new("/elsewhere")).is_none());
        assert_eq!(tree.find(Path::new("/p")), Some(Address::root()));
    }

    #[rstest]
    fn fetch_more_announces_new_rows(project: Fixture) {
        let Fixture { mut tree, log, .. } = project;
        let docs = tree.address_at(0, 0, Address::root()).unwrap();

        let added = tree.fetch_more(docs).unwrap();

        assert_eq!(added, 2);
        assert_eq!(
            log.take(),
            vec![
                TreeEvent::BeginInsertRows {
                    parent: docs,
                    first: 0,
                    last: 1
                },
                TreeEvent::EndInsertRows,
            ]
        );
        assert_eq!(tree.fetch_more(docs).unwrap(), 0);
        assert!(log.is_empty());
    }

    #[rstest]
    fn unreadable_directory_expands_to_nothing(project: Fixture) {
        let Fixture { mut tree, fs, .. } = project;
        fs.make_unreadable("/p/docs");
        let docs = tree.address_at(0, 0, Address::root()).unwrap();

        assert_eq!(tree.row_count(docs).unwrap(), 0);
        assert!(tree.node_at(docs).unwrap().is_populated());
        assert_eq!(tree.row_count(docs).unwrap(), 0);
        assert_eq!(fs.read_dir_calls("/p/docs"), 1);
    }

    #[rstest]
    fn refresh_replaces_rows_and_invalidates_addresses(project: Fixture) {
        let Fixture { mut tree, fs, log } = project;
        let guide = tree.find(Path::new("/p/docs/guide.md")).unwrap();
        let docs = tree.parent_of(guide).unwrap();
        fs.remove_externally("/p/docs/guide.md");
        log.take();

        let rows = tree.refresh(docs).unwrap();

        assert_eq!(rows, 1);
        let events = log.take();
        assert_eq!(
            events[0],
            TreeEvent::BeginRemoveRows {
                parent: docs,
                first: 0,
                last: 1
            }
        );
        assert_eq!(events[1], TreeEvent::EndRemoveRows);
        assert!(matches!(
            events[2],
            TreeEvent::BeginInsertRows { first: 0, last: 0, .. }
        ));
        assert!(matches!(
            tree.data(guide),
            Err(IndexError::InvalidAddress { .. })
        ));
        let docs = tree.find(Path::new("/p/docs")).unwrap();
        assert_eq!(tree.row_count(docs).unwrap(), 1);
    }

    #[rstest]
    fn set_root_rebuilds_with_bracketed_notifications(project: Fixture) {
        let Fixture { mut tree, log, .. } = project;
        let before = tree.address_at(0, 0, Address::root()).unwrap();

        tree.set_root("/p/src");

        assert_eq!(tree.root_path(), Path::new("/p/src"));
        assert_eq!(tree.row_count(Address::root()).unwrap(), 2);
        assert_eq!(
            log.take(),
            vec![
                TreeEvent::BeginRemoveRows {
                    parent: Address::root(),
                    first: 0,
                    last: 2
                },
                TreeEvent::EndRemoveRows,
                TreeEvent::BeginInsertRows {
                    parent: Address::root(),
                    first: 0,
                    last: 1
                },
                TreeEvent::EndInsertRows,
            ]
        );
        assert!(tree.data(before).is_err());
    }

    #[test]
    fn eager_tree_needs_no_further_enumeration() {
        let fs = Arc::new(
            MemoryFileSystem::with_root("/e")
                .dir("/e/x")
                .dir("/e/x/y")
                .file("/e/x/y/z.txt"),
        );
        let options = TreeOptions {
            mode: PopulationMode::eager(),
            ..Default::default()
        };
        let mut tree = FsTree::new("/e", fs.clone(), options);
        let calls = fs.total_read_dir_calls();

        let z = tree.find(Path::new("/e/x/y/z.txt")).unwrap();

        assert_eq!(tree.data(z).unwrap().label, "z.txt");
        assert_eq!(fs.total_read_dir_calls(), calls);
    }

    #[test]
    fn node_ids_from_before_set_root_are_unknown() {
        let fs = Arc::new(
            MemoryFileSystem::with_root("/r")
                .file("/r/a")
                .dir("/q")
                .file("/q/other"),
        );
        let mut tree = lazy_tree("/r", fs);
        let a = tree.address_at(0, 0, Address::root()).unwrap();
        let old_id = tree.node_at(a).unwrap().id();
        let old_root = tree.root_node().id();

        tree.set_root("/q");

        assert!(tree.node(old_id).is_none());
        assert!(matches!(
            tree.address_for(old_id),
            Err(IndexError::UnknownNode { .. })
        ));
        assert!(tree.node(old_root).is_none());
        let other = tree.address_at(0, 0, Address::root()).unwrap();
        assert_eq!(tree.data(other).unwrap().path, PathBuf::from("/q/other"));
    }

    #[test]
    fn removed_node_has_no_address() {
        let fs = Arc::new(MemoryFileSystem::with_root("/r").file("/r/f"));
        let mut tree = lazy_tree("/r", fs);
        let f = tree.address_at(0, 0, Address::root()).unwrap();
        let id = tree.node_at(f).unwrap().id();

        tree.delete(f).unwrap();

        assert!(tree.node(id).is_none());
        assert!(matches!(
            tree.address_for(id),
            Err(IndexError::UnknownNode { .. })
        ));
    }
}
