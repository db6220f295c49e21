use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::cli::{Command, NotificationPrinter, TreePrinter};
use dirindex::config::{IndexConfig, IndexConfigError};
use dirindex::filesystem::{LocalFileSystem, SharedFileSystem};
use dirindex::index::{
    Address, BackgroundScanner, FsTree, IndexError, MutationError, ScanDispatchError,
    ScannerCreationError,
};

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let root = app_config.root.canonicalize().context(RootSnafu {
            root: app_config.root.clone(),
        })?;

        let mut config = match &app_config.config_path {
            Some(path) => IndexConfig::from_path(path.clone()).await,
            None => IndexConfig::read(&root).await,
        }
        .context(ConfigSnafu)?;
        app_config.overrides.apply(&mut config);
        debug!("Loaded config: {:?}", config);

        let fs: SharedFileSystem = Arc::new(LocalFileSystem);
        let mut tree = FsTree::new(root.clone(), fs.clone(), config.tree_options());

        match app_config.command {
            Command::Tree { depth, background } => {
                if background {
                    Self::expand_in_background(&mut tree, fs, depth).await?;
                }
                TreePrinter::for_stdout()
                    .print(&mut tree, depth)
                    .context(PrintSnafu)?;
            }
            Command::Rename { path, new_name } => {
                let address = Self::locate(&mut tree, &root, &path)?;
                tree.subscribe(NotificationPrinter);
                let renamed = tree.rename(address, &new_name).context(MutationSnafu)?;
                info!("Entry now at {}", renamed);
            }
            Command::Delete { path } => {
                let address = Self::locate(&mut tree, &root, &path)?;
                tree.subscribe(NotificationPrinter);
                tree.delete(address).context(MutationSnafu)?;
            }
        }

        Ok(())
    }

    fn locate(tree: &mut FsTree, root: &Path, path: &Path) -> Result<Address, ApplicationError> {
        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        tree.find(&full_path)
            .context(NotIndexedSnafu { path: full_path })
    }

    /// Enumerates every directory the printer will reach on the scanner's
    /// workers, one level per round.
    async fn expand_in_background(
        tree: &mut FsTree,
        fs: SharedFileSystem,
        depth: usize,
    ) -> Result<(), ApplicationError> {
        let (scanner, mut results) = BackgroundScanner::new(fs).context(ScannerSnafu)?;

        loop {
            let pending = Self::unpopulated_within(tree, depth);
            if pending.is_empty() {
                return Ok(());
            }
            debug!("Scanning {} directories in the background", pending.len());
            let revision = tree.revision();
            for path in &pending {
                scanner.request(path.clone(), revision).context(ScanRequestSnafu)?;
            }
            for _ in 0..pending.len() {
                let result = results.next().await.context(ScannerClosedSnafu)?;
                tree.apply_scan(result);
            }
        }
    }

    /// Unpopulated directories whose children would be printed at `depth`.
    fn unpopulated_within(tree: &FsTree, depth: usize) -> Vec<PathBuf> {
        let mut pending = vec![(tree.root_node(), 0)];
        let mut found = Vec::new();
        while let Some((node, level)) = pending.pop() {
            for child in node.children() {
                if !child.is_dir() || level + 1 >= depth {
                    continue;
                }
                if child.is_populated() {
                    pending.push((child, level + 1));
                } else {
                    found.push(child.path().to_path_buf());
                }
            }
        }
        found
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Cannot index {}", root.display()))]
    RootError {
        root: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: IndexConfigError },
    #[snafu(display("Failed to start background scanning"))]
    ScannerError { source: ScannerCreationError },
    #[snafu(display("Failed to request a background scan"))]
    ScanRequestError { source: ScanDispatchError },
    #[snafu(display("Background scanner stopped before delivering all results"))]
    ScannerClosed,
    #[snafu(display("Failed to print the index"))]
    PrintError { source: IndexError },
    #[snafu(display("{} is not inside the indexed tree", path.display()))]
    NotIndexed { path: PathBuf },
    #[snafu(display("Failed to modify the tree"))]
    MutationError { source: MutationError },
}
