use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread::available_parallelism;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::filesystem::{DirEntry, FsError, SharedFileSystem};

/// Default number of worker threads when unable to determine system parallelism
const DEFAULT_WORKER_THREADS: NonZeroUsize = NonZeroUsize::MIN;
/// Enumeration is I/O bound; a few workers are enough.
const MAX_WORKER_THREADS: usize = 4;

/// Listing of one directory, produced off-thread.
#[derive(Debug)]
pub struct ScanResult {
    pub path: PathBuf,
    /// Tree revision the scan was requested at.
    pub revision: u64,
    pub outcome: Result<Vec<DirEntry>, FsError>,
}

/// Runs directory enumeration on worker threads.
///
/// The scanner never touches the tree. Results are delivered on the channel
/// returned by [`BackgroundScanner::new`] and must be handed to
/// [`FsTree::apply_scan`](super::FsTree::apply_scan) by the thread that owns
/// the tree. Dropping the scanner stops accepting requests.
pub struct BackgroundScanner {
    dispatcher: Dispatcher,
    fs: SharedFileSystem,
    results: UnboundedSender<ScanResult>,
}

impl BackgroundScanner {
    pub fn new(
        fs: SharedFileSystem,
    ) -> Result<(Self, UnboundedReceiver<ScanResult>), ScannerCreationError> {
        let workers_num = Self::determine_worker_count();
        debug!("Using {} worker threads for directory scans", workers_num);

        let dispatcher = DispatcherBuilder::new()
            .worker_threads(workers_num)
            .build()
            .context(DispatcherSnafu)?;
        let (results, receiver) = mpsc::unbounded();

        Ok((
            Self {
                dispatcher,
                fs,
                results,
            },
            receiver,
        ))
    }

    fn determine_worker_count() -> NonZeroUsize {
        available_parallelism()
            .map(|n| n.get().min(MAX_WORKER_THREADS))
            .ok()
            .and_then(NonZeroUsize::new)
            .unwrap_or(DEFAULT_WORKER_THREADS)
    }

    /// Queues an enumeration of `path`. `revision` is the tree's
    /// [`revision`](super::FsTree::revision) at the time of the request; the
    /// result is discarded if the tree has changed structure since.
    pub fn request(&self, path: impl Into<PathBuf>, revision: u64) -> Result<(), ScanDispatchError> {
        let path = path.into();
        let fs = self.fs.clone();
        let results = self.results.clone();
        let job_path = path.clone();

        self.dispatcher
            .dispatch(move || async move {
                let outcome = fs.read_dir(&job_path);
                let result = ScanResult {
                    path: job_path,
                    revision,
                    outcome,
                };
                if let Err(e) = results.unbounded_send(result) {
                    debug!("Scan result dropped, receiver is gone: {}", e);
                }
            })
            .map_err(|e| ScanDispatchError {
                path: path.clone(),
                error: e.to_string(),
            })?;

        info!("Queued background scan of {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ScannerCreationError {
    #[snafu(display("Failed to create scan dispatcher"))]
    DispatcherError { source: std::io::Error },
}

#[derive(Debug, Snafu)]
#[snafu(display("Failed to dispatch scan of {}: {}", path.display(), error))]
pub struct ScanDispatchError {
    path: PathBuf,
    error: String,
}
