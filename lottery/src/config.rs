//! # Configuration
//!
//! Optional YAML settings for the console. Every field has a default, so an
//! empty file (or no file at all) gives the stock behaviour.
//!
//! Lookup order, first hit wins:
//!
//! 1. `--config <path>`
//! 2. `$EVENT_LOTTERY_CONFIG`
//! 3. `config.yaml` inside the data directory
//! 4. built-in defaults
//!
//! An explicitly named file that cannot be read is an error; a missing
//! `config.yaml` in the data directory is not.

use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::backend::domain::models::Tag;
use crate::backend::domain::{DrawTimings, ExportConfig, NumberingPolicy, TagResolver};
use crate::backend::storage::json::{default_data_directory, DEFAULT_STORAGE_KEY};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "EVENT_LOTTERY_CONFIG";

/// File looked up inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the roster snapshot lives; defaults to ~/Documents/Event Lottery
    pub data_directory: Option<PathBuf>,
    pub storage_key: String,
    pub numbering: NumberingPolicy,
    pub draw: DrawTimings,
    pub export: ExportConfig,
    /// Extra tag spellings on top of the built-in ones
    pub tag_aliases: BTreeMap<String, Tag>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            numbering: NumberingPolicy::default(),
            draw: DrawTimings::default(),
            export: ExportConfig::default(),
            tag_aliases: BTreeMap::new(),
        }
    }
}

/// Where to look for configuration, as given on the command line and in
/// the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub cli_path: Option<PathBuf>,
    pub env_path: Option<PathBuf>,
    pub data_dir_override: Option<PathBuf>,
}

impl ConfigSources {
    /// Sources from parsed CLI flags plus `$EVENT_LOTTERY_CONFIG`
    pub fn from_env(cli_path: Option<PathBuf>, data_dir_override: Option<PathBuf>) -> Self {
        let env_path = std::env::var_os(CONFIG_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self {
            cli_path,
            env_path,
            data_dir_override,
        }
    }
}

impl AppConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(yaml: &str, origin: &Path) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&yaml, path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Find and load the configuration following the documented lookup order.
    /// `data_dir_override` always wins over `data_directory` from the file.
    pub fn resolve(sources: &ConfigSources) -> Result<Self> {
        let explicit = sources.cli_path.as_ref().or(sources.env_path.as_ref());

        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => {
                let data_dir = match &sources.data_dir_override {
                    Some(dir) => dir.clone(),
                    None => default_data_directory()?,
                };
                let candidate = data_dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::load_from(&candidate)?
                } else {
                    debug!("No {} found, using default configuration", candidate.display());
                    Self::default()
                }
            }
        };

        if let Some(dir) = &sources.data_dir_override {
            config.data_directory = Some(dir.clone());
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.draw.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "draw.tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        let key = self.storage_key.trim();
        if key.is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty".to_string()));
        }
        if key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(ConfigError::Invalid(format!(
                "storage_key '{}' must be a plain file name",
                self.storage_key
            )));
        }

        if self.export.file_prefix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "export.file_prefix '{}' must not contain path separators",
                self.export.file_prefix
            )));
        }
        Ok(())
    }

    /// Effective data directory
    pub fn data_directory(&self) -> Result<PathBuf> {
        match &self.data_directory {
            Some(dir) => Ok(dir.clone()),
            None => default_data_directory(),
        }
    }

    /// Built-in tag spellings extended with the configured aliases
    pub fn tag_resolver(&self) -> TagResolver {
        let mut resolver = TagResolver::new();
        for (surface, tag) in &self.tag_aliases {
            resolver.add_alias(surface, *tag);
        }
        resolver
    }
}
