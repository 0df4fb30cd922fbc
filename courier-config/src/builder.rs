// Builder that layers configuration sources into a ConfigManager

use crate::{ConfigManager, FileFormat, Result};
use std::path::PathBuf;

/// Builder for a [`ConfigManager`].
///
/// Sources are applied in order: config files, then `.env`, then the process
/// environment, so later sources override earlier ones.
pub struct ConfigBuilder {
    manager: ConfigManager,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<PathBuf>,
    config_files: Vec<(PathBuf, FileFormat)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            manager: ConfigManager::new(),
            load_env: false,
            load_dotenv: false,
            dotenv_path: None,
            config_files: Vec::new(),
        }
    }

    /// Set environment variable prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.manager = ConfigManager::with_prefix(prefix.into());
        self
    }

    /// Enable loading from environment variables
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Enable loading from a .env file
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Add configuration file to load
    pub fn add_file(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.config_files.push((path.into(), format));
        self
    }

    /// Add a configuration file, detecting its format from the extension
    pub fn add_path(self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = FileFormat::from_path(&path)?;
        Ok(self.add_file(path, format))
    }

    /// Build the configuration manager
    pub fn build(self) -> Result<ConfigManager> {
        for (path, format) in &self.config_files {
            self.manager.load_file(path, *format)?;
        }

        if self.load_dotenv {
            self.manager.load_dotenv(self.dotenv_path.as_deref())?;
        } else if self.load_env {
            self.manager.load_env()?;
        }

        Ok(self.manager)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
