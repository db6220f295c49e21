use std::path::PathBuf;

use crate::cli::{Cli, Command, IndexOverrides};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub overrides: IndexOverrides,
    pub command: Command,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            root: cli.root,
            config_path: cli.config,
            overrides: cli.overrides,
            command: cli.command,
        }
    }
}
