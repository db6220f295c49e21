mod index_config;

pub use index_config::{CONFIG_FILE_NAME, IndexConfig, IndexConfigError, PopulationStrategy};
