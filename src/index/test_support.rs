use std::path::PathBuf;
use std::sync::Arc;

use rstest::fixture;

use crate::filesystem::memory::MemoryFileSystem;

use super::{EventLog, FsTree, TreeOptions};

pub(crate) struct Fixture {
    pub(crate) tree: FsTree,
    pub(crate) fs: Arc<MemoryFileSystem>,
    pub(crate) log: EventLog,
}

pub(crate) fn lazy_tree(root: impl Into<PathBuf>, fs: Arc<MemoryFileSystem>) -> FsTree {
    FsTree::new(root, fs, TreeOptions::default())
}

/// Lazy tree over `/p`. Top-level rows are `docs`, `README.md`, `src`.
#[fixture]
pub(crate) fn project() -> Fixture {
    let fs = Arc::new(
        MemoryFileSystem::with_root("/p")
            .dir("/p/docs")
            .file("/p/docs/guide.md")
            .file("/p/docs/api.md")
            .dir("/p/src")
            .file("/p/src/main.rs")
            .dir("/p/src/bin")
            .file("/p/src/bin/tool.rs")
            .file("/p/README.md"),
    );
    let mut tree = lazy_tree("/p", fs.clone());
    let log = EventLog::new();
    tree.subscribe(log.clone());
    Fixture { tree, fs, log }
}
