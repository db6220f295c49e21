use std::ffi::OsStr;
use std::path::Path;

use derive_more::Display;
use indextree::{Arena, NodeId};
use tracing::{debug, warn};

use crate::filesystem::{DirEntry, FileSystem, FsError};

use super::node::Entry;

/// How much of the subtree is enumerated when a tree is (re)built.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopulationMode {
    /// Enumerate the root only; directories are expanded on first query.
    #[default]
    #[display("lazy")]
    Lazy,
    /// Enumerate depth-first up front, within the given bounds. `max_depth`
    /// counts directory levels with the root as level 1. Directories left out
    /// by either bound stay unpopulated and expand lazily later.
    #[display("eager (max depth {max_depth}, max entries {max_entries})")]
    Eager { max_depth: usize, max_entries: usize },
}

impl PopulationMode {
    pub const DEFAULT_MAX_DEPTH: usize = 8;
    pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

    pub fn eager() -> Self {
        PopulationMode::Eager {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_entries: Self::DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeOptions {
    pub mode: PopulationMode,
    pub show_hidden: bool,
    pub directories_first: bool,
}

/// Whether an entry named `name` shows up in a listing under `options`.
pub(crate) fn is_listed(name: &OsStr, options: &TreeOptions) -> bool {
    name != "." && name != ".." && (options.show_hidden || !name.to_string_lossy().starts_with('.'))
}

/// Filters and orders a raw listing of `parent` into entries.
pub(crate) fn prepare_entries(
    parent: &Path,
    listing: Vec<DirEntry>,
    options: &TreeOptions,
) -> Vec<Entry> {
    let mut entries = listing
        .into_iter()
        .filter(|entry| is_listed(&entry.name, options))
        .map(|entry| {
            let path = parent.join(&entry.name);
            if entry.is_dir {
                Entry::directory(path)
            } else {
                Entry::file(path)
            }
        })
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| a.compare(b, options.directories_first));
    entries
}

/// Turns an enumeration outcome into entries. Failures are absorbed: the
/// directory is treated as empty.
pub(crate) fn entries_from_outcome(
    parent: &Path,
    outcome: Result<Vec<DirEntry>, FsError>,
    options: &TreeOptions,
) -> Vec<Entry> {
    match outcome {
        Ok(listing) => prepare_entries(parent, listing, options),
        Err(e) => {
            warn!("Treating {} as empty: {}", parent.display(), e);
            Vec::new()
        }
    }
}

pub(crate) fn read_entries(fs: &dyn FileSystem, parent: &Path, options: &TreeOptions) -> Vec<Entry> {
    entries_from_outcome(parent, fs.read_dir(parent), options)
}

/// Appends `entries` below `node` and marks it populated. Returns the number
/// of children added.
pub(crate) fn attach_children(arena: &mut Arena<Entry>, node: NodeId, entries: Vec<Entry>) -> usize {
    let count = entries.len();
    for entry in entries {
        let child = arena.new_node(entry);
        node.append(child, arena);
    }
    arena[node].get_mut().mark_populated();
    count
}

/// Walks a directory and fills an arena according to [`TreeOptions`].
pub(crate) struct TreeBuilder<'a> {
    fs: &'a dyn FileSystem,
    options: &'a TreeOptions,
    remaining: usize,
    exhausted: bool,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(fs: &'a dyn FileSystem, options: &'a TreeOptions) -> Self {
        Self {
            fs,
            options,
            remaining: 0,
            exhausted: false,
        }
    }

    /// Builds a fresh arena rooted at `root`. The root is always enumerated.
    pub(crate) fn build(self, root: &Path) -> (Arena<Entry>, NodeId) {
        let mut arena = Arena::new();
        let root_id = self.build_into(&mut arena, root);
        (arena, root_id)
    }

    /// Builds a detached tree rooted at `root` inside an existing arena.
    pub(crate) fn build_into(mut self, arena: &mut Arena<Entry>, root: &Path) -> NodeId {
        let root_id = arena.new_node(Entry::directory(root.to_path_buf()));
        let top_level = read_entries(self.fs, root, self.options);
        let created = attach_children(arena, root_id, top_level);
        debug!(
            "Enumerated {} top-level entries under {} ({})",
            created,
            root.display(),
            self.options.mode
        );

        if let PopulationMode::Eager {
            max_depth,
            max_entries,
        } = self.options.mode
        {
            self.remaining = max_entries.saturating_sub(created);
            let children = root_id.children(arena).collect::<Vec<_>>();
            for child in children {
                if self.exhausted {
                    break;
                }
                self.populate_eager(arena, child, 2, max_depth);
            }
            if self.exhausted {
                warn!(
                    "Eager scan of {} stopped after {} entries; remaining directories expand lazily",
                    root.display(),
                    max_entries
                );
            }
            debug!("Eager scan created {} nodes", root_id.descendants(arena).count());
        }

        root_id
    }

    fn populate_eager(&mut self, arena: &mut Arena<Entry>, node: NodeId, level: usize, max_depth: usize) {
        let entry = arena[node].get();
        if !entry.is_dir() || level > max_depth {
            return;
        }

        let entries = read_entries(self.fs, entry.path(), self.options);
        if entries.len() > self.remaining {
            self.exhausted = true;
            return;
        }
        self.remaining -= entries.len();
        attach_children(arena, node, entries);

        let children = node.children(arena).collect::<Vec<_>>();
        for child in children {
            if self.exhausted {
                return;
            }
            self.populate_eager(arena, child, level + 1, max_depth);
        }
    }
}
