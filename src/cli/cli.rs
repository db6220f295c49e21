use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;
use dirindex::config::{IndexConfig, PopulationStrategy};

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Browse, rename and delete files through a lazily built index")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    /// The directory to index
    #[clap(long, short, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Config file to use instead of `<root>/dirindex.yaml`
    #[clap(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: IndexOverrides,
}

/// Command line settings that take precedence over the config file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct IndexOverrides {
    /// Enumerate the whole tree up front instead of on demand
    #[clap(long, global = true)]
    pub eager: bool,

    /// Deepest directory level enumerated by an eager build
    #[clap(long, global = true)]
    pub max_depth: Option<usize>,

    /// Upper bound on entries created by an eager build
    #[clap(long, global = true)]
    pub max_entries: Option<usize>,

    /// Include entries whose name starts with a dot
    #[clap(long, global = true)]
    pub show_hidden: bool,

    /// List directories before files
    #[clap(long, global = true)]
    pub directories_first: bool,
}

impl IndexOverrides {
    pub fn apply(&self, config: &mut IndexConfig) {
        if self.eager {
            config.population = PopulationStrategy::Eager;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(max_entries) = self.max_entries {
            config.max_entries = max_entries;
        }
        config.show_hidden |= self.show_hidden;
        config.directories_first |= self.directories_first;
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the index
    Tree {
        /// Number of directory levels to print
        #[clap(long, short, default_value = "2")]
        depth: usize,
        /// Enumerate directories on background workers
        #[clap(long)]
        background: bool,
    },
    /// Rename an entry in place
    Rename {
        /// Entry to rename, relative to the root
        path: PathBuf,
        /// New file name, without any directory part
        new_name: String,
    },
    /// Delete an entry, recursively for directories
    Delete {
        /// Entry to delete, relative to the root
        path: PathBuf,
    },
}
