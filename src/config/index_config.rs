use std::{
    borrow::Cow,
    io::{Cursor, ErrorKind},
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use compio::{fs::File, io::AsyncReadExt, io::BufReader};
use derive_more::Display;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::{
    ext::PathExt,
    index::{PopulationMode, TreeOptions},
};

pub const CONFIG_FILE_NAME: &str = "dirindex.yaml";

fn get_config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PopulationStrategy {
    #[default]
    #[display("lazy")]
    Lazy,
    #[display("eager")]
    Eager,
}

/// Settings for building an index, as read from `dirindex.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub population: PopulationStrategy,
    pub max_depth: usize,
    pub max_entries: usize,
    pub show_hidden: bool,
    pub directories_first: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            population: PopulationStrategy::Lazy,
            max_depth: PopulationMode::DEFAULT_MAX_DEPTH,
            max_entries: PopulationMode::DEFAULT_MAX_ENTRIES,
            show_hidden: false,
            directories_first: false,
        }
    }
}

impl IndexConfig {
    /// Reads `dirindex.yaml` from `root`. A missing file yields the defaults.
    pub async fn read(root: &Path) -> Result<Self, IndexConfigError> {
        let path = get_config_file_path(root);
        match Self::from_path(path.clone()).await {
            Err(IndexConfigError::ReadError { source, .. }) if source.kind() == ErrorKind::NotFound => {
                info!("No {} in {}, using defaults", CONFIG_FILE_NAME, root.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, IndexConfigError> {
        debug!("Opening config file: {}", path.best_effort_display());
        let file = File::open(&path).await.context(ReadSnafu {
            file_path: path.best_effort_display(),
        })?;

        let mut reader = BufReader::new(Cursor::new(file));
        let res = reader.read_to_string(String::new()).await;
        match res.0 {
            Ok(n) => debug!("Successfully read config file: {n} bytes"),
            Err(source) => {
                return Err(IndexConfigError::ReadError {
                    file_path: path.best_effort_display(),
                    source,
                });
            }
        }
        res.1.as_str().try_into()
    }

    pub fn population_mode(&self) -> PopulationMode {
        match self.population {
            PopulationStrategy::Lazy => PopulationMode::Lazy,
            PopulationStrategy::Eager => PopulationMode::Eager {
                max_depth: self.max_depth,
                max_entries: self.max_entries,
            },
        }
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            mode: self.population_mode(),
            show_hidden: self.show_hidden,
            directories_first: self.directories_first,
        }
    }

    fn apply_yaml(&mut self, top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<(), IndexConfigError> {
        for (key, value) in top_level {
            let Yaml::Value(Scalar::String(key)) = key else {
                debug!("Skipping non-string config key: {:?}", key);
                continue;
            };
            match &**key {
                "population" => self.population = parse_strategy(key, value)?,
                "max_depth" => self.max_depth = parse_count(key, value)?,
                "max_entries" => self.max_entries = parse_count(key, value)?,
                "show_hidden" => self.show_hidden = parse_flag(key, value)?,
                "directories_first" => self.directories_first = parse_flag(key, value)?,
                other => debug!("Skipping unknown config key '{}'", other),
            }
        }
        Ok(())
    }
}

fn parse_strategy(key: &Cow<'_, str>, value: &Yaml) -> Result<PopulationStrategy, IndexConfigError> {
    let strategy = match value {
        Yaml::Value(Scalar::String(name)) => PopulationStrategy::from_str(name, true).ok(),
        _ => None,
    };
    strategy.context(InvalidValueSnafu { key: &**key })
}

fn parse_count(key: &Cow<'_, str>, value: &Yaml) -> Result<usize, IndexConfigError> {
    let count = match value {
        Yaml::Value(Scalar::Integer(n)) if *n > 0 => usize::try_from(*n).ok(),
        _ => None,
    };
    count.context(InvalidValueSnafu { key: &**key })
}

fn parse_flag(key: &Cow<'_, str>, value: &Yaml) -> Result<bool, IndexConfigError> {
    match value {
        Yaml::Value(Scalar::Boolean(flag)) => Ok(*flag),
        _ => InvalidValueSnafu { key: &**key }.fail(),
    }
}

impl TryFrom<&str> for IndexConfig {
    type Error = IndexConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let document = documents.first().context(MalformedConfigSnafu)?;
        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        let mut config = IndexConfig::default();
        config.apply_yaml(top_level)?;
        Ok(config)
    }
}

#[derive(Debug, Snafu)]
pub enum IndexConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted config file"))]
    MalformedConfig,
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Invalid value for config key '{}'", key))]
    InvalidValue { key: String },
}
