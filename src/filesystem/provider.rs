use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::Snafu;

use crate::ext::PathExt;

/// A single directory entry as reported by the filesystem, in no particular
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: OsString,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn file(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn directory(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// The filesystem primitives the index relies on.
///
/// Implementations must be usable from worker threads, because directory
/// enumeration can be offloaded to the background scanner.
pub trait FileSystem: Send + Sync {
    /// Lists the immediate children of `path`, without `.` and `..`.
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError>;
    /// Moves `from` to `to`. Must fail with [`FsError::AlreadyExists`] instead
    /// of replacing an existing target.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;
    /// Removes a directory together with everything below it.
    fn remove_dir_all(&self, path: &Path) -> Result<(), FsError>;
}

pub type SharedFileSystem = Arc<dyn FileSystem>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FsError {
    #[snafu(display("No such file or directory: {}", path.best_effort_display()))]
    NotFound { path: PathBuf },
    #[snafu(display("Access denied: {}", path.best_effort_display()))]
    AccessDenied { path: PathBuf },
    #[snafu(display("Target already exists: {}", path.best_effort_display()))]
    AlreadyExists { path: PathBuf },
    #[snafu(display("Directory is not empty: {}", path.best_effort_display()))]
    NotEmpty { path: PathBuf },
    #[snafu(display("Cannot move {} across devices", path.best_effort_display()))]
    CrossDevice { path: PathBuf },
    #[snafu(display("I/O failure on {}", path.best_effort_display()))]
    IoError { path: PathBuf, source: io::Error },
}

impl FsError {
    /// Classifies an [`io::Error`] raised while operating on `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => FsError::NotFound { path },
            io::ErrorKind::PermissionDenied => FsError::AccessDenied { path },
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists { path },
            io::ErrorKind::DirectoryNotEmpty => FsError::NotEmpty { path },
            io::ErrorKind::CrossesDevices => FsError::CrossDevice { path },
            _ => FsError::IoError { path, source },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FsError::NotFound { path }
            | FsError::AccessDenied { path }
            | FsError::AlreadyExists { path }
            | FsError::NotEmpty { path }
            | FsError::CrossDevice { path }
            | FsError::IoError { path, .. } => path,
        }
    }
}
