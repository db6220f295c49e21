use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use indextree::{Arena, NodeId};

use crate::ext::PathExt;

/// Whether a directory's children reflect a completed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    /// Not enumerated yet. The node has no children in the arena.
    Unpopulated,
    /// Children are a complete, ordered snapshot as of the last scan.
    Populated,
}

/// Metadata cached for every node of the index.
#[derive(Debug, Clone)]
pub struct Entry {
    label: String,
    path: PathBuf,
    is_dir: bool,
    population: Population,
}

impl Entry {
    pub(crate) fn file(path: PathBuf) -> Self {
        Self {
            label: path.leaf_label(),
            path,
            is_dir: false,
            population: Population::Populated,
        }
    }

    pub(crate) fn directory(path: PathBuf) -> Self {
        Self {
            label: path.leaf_label(),
            path,
            is_dir: true,
            population: Population::Unpopulated,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn population(&self) -> Population {
        self.population
    }

    pub fn is_populated(&self) -> bool {
        self.population == Population::Populated
    }

    pub(crate) fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }

    pub(crate) fn mark_populated(&mut self) {
        self.population = Population::Populated;
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.label = path.leaf_label();
        self.path = path;
    }

    pub(crate) fn info(&self) -> EntryInfo {
        EntryInfo {
            label: self.label.clone(),
            path: self.path.clone(),
            is_dir: self.is_dir,
        }
    }

    /// Sibling order: optionally directories first, then case-insensitive
    /// name, then the raw name so that the order is total.
    pub(crate) fn compare(&self, other: &Entry, directories_first: bool) -> Ordering {
        let kind = if directories_first {
            other.is_dir.cmp(&self.is_dir)
        } else {
            Ordering::Equal
        };
        kind.then_with(|| self.label.to_lowercase().cmp(&other.label.to_lowercase()))
            .then_with(|| self.file_name().cmp(other.file_name()))
    }
}

/// Plain record describing a node, detached from the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub label: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Borrowed view of one node and its position in the arena.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    arena: &'a Arena<Entry>,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    /// Caller guarantees `id` is a live node of `arena`.
    pub(crate) fn new(arena: &'a Arena<Entry>, id: NodeId) -> Self {
        Self { arena, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn entry(&self) -> &'a Entry {
        self.arena[self.id].get()
    }

    pub fn child_at(&self, row: usize) -> Option<NodeRef<'a>> {
        self.id
            .children(self.arena)
            .nth(row)
            .map(|id| NodeRef::new(self.arena, id))
    }

    pub fn child_count(&self) -> usize {
        self.id.children(self.arena).count()
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + use<'a> {
        let arena = self.arena;
        self.id
            .children(arena)
            .map(move |id| NodeRef::new(arena, id))
    }

    /// Position among the parent's children; 0 for the root.
    pub fn row_in_parent(&self) -> usize {
        match self.arena[self.id].parent() {
            Some(parent) => parent
                .children(self.arena)
                .position(|sibling| sibling == self.id)
                .unwrap_or(0),
            None => 0,
        }
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.arena[self.id]
            .parent()
            .map(|id| NodeRef::new(self.arena, id))
    }

    pub fn display_label(&self) -> &'a str {
        self.entry().label()
    }

    pub fn path(&self) -> &'a Path {
        self.entry().path()
    }

    pub fn is_dir(&self) -> bool {
        self.entry().is_dir()
    }

    pub fn is_populated(&self) -> bool {
        self.entry().is_populated()
    }

    pub fn info(&self) -> EntryInfo {
        self.entry().info()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.arena, other.arena)
    }
}

impl Eq for NodeRef<'_> {}
