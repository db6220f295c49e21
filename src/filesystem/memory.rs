use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{DirEntry, FileSystem, FsError};

/// Failure injected into every mutating call of a [`MemoryFileSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    AccessDenied,
    AlreadyExists,
    NotEmpty,
    CrossDevice,
}

impl Failure {
    fn into_error(self, path: &Path) -> FsError {
        let path = path.to_path_buf();
        match self {
            Failure::AccessDenied => FsError::AccessDenied { path },
            Failure::AlreadyExists => FsError::AlreadyExists { path },
            Failure::NotEmpty => FsError::NotEmpty { path },
            Failure::CrossDevice => FsError::CrossDevice { path },
        }
    }
}

#[derive(Debug, Default)]
struct State {
    /// path -> is_dir
    entries: BTreeMap<PathBuf, bool>,
    read_dir_calls: HashMap<PathBuf, usize>,
    unreadable: HashSet<PathBuf>,
    mutation_failure: Option<Failure>,
}

/// In-memory [`FileSystem`] that counts enumerations and can be told to fail.
#[derive(Debug, Default)]
pub(crate) struct MemoryFileSystem {
    state: Mutex<State>,
}

impl MemoryFileSystem {
    /// Creates a filesystem whose only entry is the directory `root`.
    pub(crate) fn with_root(root: impl Into<PathBuf>) -> Self {
        let fs = Self::default();
        fs.state().entries.insert(root.into(), true);
        fs
    }

    pub(crate) fn dir(self, path: impl Into<PathBuf>) -> Self {
        self.state().entries.insert(path.into(), true);
        self
    }

    pub(crate) fn file(self, path: impl Into<PathBuf>) -> Self {
        self.state().entries.insert(path.into(), false);
        self
    }

    pub(crate) fn make_unreadable(&self, path: impl Into<PathBuf>) {
        self.state().unreadable.insert(path.into());
    }

    pub(crate) fn fail_mutations(&self, failure: Failure) {
        self.state().mutation_failure = Some(failure);
    }

    pub(crate) fn read_dir_calls(&self, path: impl AsRef<Path>) -> usize {
        self.state()
            .read_dir_calls
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_read_dir_calls(&self) -> usize {
        self.state().read_dir_calls.values().sum()
    }

    pub(crate) fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.state().entries.contains_key(path.as_ref())
    }

    /// Removes an entry behind the index's back.
    pub(crate) fn remove_externally(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.state().entries.retain(|p, _| !p.starts_with(path));
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_failure(&self, path: &Path) -> Result<(), FsError> {
        match self.state().mutation_failure {
            Some(failure) => Err(failure.into_error(path)),
            None => Ok(()),
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let mut state = self.state();
        *state.read_dir_calls.entry(path.to_path_buf()).or_default() += 1;

        if state.unreadable.contains(path) {
            return Err(FsError::AccessDenied {
                path: path.to_path_buf(),
            });
        }
        if state.entries.get(path) != Some(&true) {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }

        // Reverse order so callers cannot rely on the listing being sorted.
        Ok(state
            .entries
            .iter()
            .rev()
            .filter(|(p, _)| p.parent() == Some(path))
            .filter_map(|(p, is_dir)| {
                p.file_name().map(|name| DirEntry {
                    name: OsString::from(name),
                    is_dir: *is_dir,
                })
            })
            .collect())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.check_failure(from)?;
        let mut state = self.state();
        if !state.entries.contains_key(from) {
            return Err(FsError::NotFound {
                path: from.to_path_buf(),
            });
        }
        if state.entries.contains_key(to) {
            return Err(FsError::AlreadyExists {
                path: to.to_path_buf(),
            });
        }

        let moved = state
            .entries
            .iter()
            .filter(|(p, _)| p.starts_with(from))
            .map(|(p, is_dir)| (p.clone(), *is_dir))
            .collect::<Vec<_>>();
        for (path, is_dir) in moved {
            state.entries.remove(&path);
            let rest = path.strip_prefix(from).unwrap_or(Path::new(""));
            let target = if rest.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(rest)
            };
            state.entries.insert(target, is_dir);
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        self.check_failure(path)?;
        let mut state = self.state();
        match state.entries.get(path) {
            None => Err(FsError::NotFound {
                path: path.to_path_buf(),
            }),
            Some(true) => Err(FsError::IoError {
                path: path.to_path_buf(),
                source: std::io::Error::other("is a directory"),
            }),
            Some(false) => {
                state.entries.remove(path);
                Ok(())
            }
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), FsError> {
        self.check_failure(path)?;
        let mut state = self.state();
        if !state.entries.contains_key(path) {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }
        state.entries.retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}
