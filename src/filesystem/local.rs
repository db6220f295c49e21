use std::fs;
use std::path::Path;

use tracing::debug;

use super::{DirEntry, FileSystem, FsError};

/// [`FileSystem`] backed by the local disk through `std::fs`.
///
/// Symbolic links are reported as plain entries and are never followed, so a
/// link to a directory is listed as a leaf and deleting it removes only the
/// link.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let read_dir = fs::read_dir(path).map_err(|e| FsError::from_io(path, e))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry in {}: {}", path.display(), e);
                    continue;
                }
            };
            let is_dir = match entry.file_type() {
                Ok(file_type) => file_type.is_dir(),
                Err(e) => {
                    debug!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            entries.push(DirEntry {
                name: entry.file_name(),
                is_dir,
            });
        }

        Ok(entries)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        // std::fs::rename silently replaces files on unix. On case-insensitive
        // filesystems a case-only rename finds its own source as the target.
        if to.symlink_metadata().is_ok() && !is_case_variant(from, to) {
            return Err(FsError::AlreadyExists {
                path: to.to_path_buf(),
            });
        }
        fs::rename(from, to).map_err(|e| FsError::from_io(from, e))
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path).map_err(|e| FsError::from_io(path, e))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_dir_all(path).map_err(|e| FsError::from_io(path, e))
    }
}

/// `to` differs from `from` only by letter case and names the same entry.
fn is_case_variant(from: &Path, to: &Path) -> bool {
    let lowercase_name = |path: &Path| {
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
    };
    from != to
        && from.parent() == to.parent()
        && lowercase_name(from) == lowercase_name(to)
        && is_same_entry(from, to)
}

#[cfg(unix)]
fn is_same_entry(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (a.symlink_metadata(), b.symlink_metadata()) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_entry(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
