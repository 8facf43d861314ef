use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{DEFAULT_STORE_DIRECTORY, VERBOSITY_NORMAL};
use crate::core::query::FilterMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_directory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub filter_mode: FilterMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbosity: String,
    pub diagnostics_file: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_directory: DEFAULT_STORE_DIRECTORY.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbosity: VERBOSITY_NORMAL.to_string(),
            diagnostics_file: None,
        }
    }
}

impl Config {
    pub fn store_directory(&self) -> PathBuf {
        PathBuf::from(&self.store.base_directory)
    }

    pub fn diagnostics_path(&self) -> Option<PathBuf> {
        self.logging.diagnostics_file.as_ref().map(PathBuf::from)
    }
}
