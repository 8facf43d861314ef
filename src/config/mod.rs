pub mod model;


use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::constants::{VERBOSITY_NORMAL, VERBOSITY_SILENT, VERBOSITY_VERBOSE};

// Re-export main types
pub use self::model::{Config, LoggingConfig, QueryConfig, StoreConfig};

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.base_directory.trim().is_empty() {
            anyhow::bail!("store.base_directory must not be empty");
        }

        if !matches!(
            self.logging.verbosity.as_str(),
            VERBOSITY_SILENT | VERBOSITY_NORMAL | VERBOSITY_VERBOSE
        ) {
            anyhow::bail!("verbosity must be 'silent', 'normal', or 'verbose'");
        }

        if let Some(file) = &self.logging.diagnostics_file {
            if file.trim().is_empty() {
                anyhow::bail!("logging.diagnostics_file must not be empty when set");
            }
        }

        Ok(())
    }
}
