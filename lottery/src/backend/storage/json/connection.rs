use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the data directory created under the user's Documents folder
pub const DEFAULT_DIRECTORY_NAME: &str = "Event Lottery";

/// JsonConnection manages the data directory that snapshot files live in
#[derive(Clone, Debug)]
pub struct JsonConnection {
    base_directory: PathBuf,
}

impl JsonConnection {
    /// Create a new connection rooted at `base_directory`, creating it if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).with_context(|| {
                format!("Failed to create data directory {}", base_path.display())
            })?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Create a connection in the default data directory
    /// (~/Documents/Event Lottery, or ~/Event Lottery without a Documents folder)
    pub fn new_default() -> Result<Self> {
        Self::new(default_data_directory()?)
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Path of the snapshot file stored under `key`
    pub fn snapshot_path(&self, key: &str) -> PathBuf {
        self.base_directory.join(format!("{}.json", key))
    }
}

/// Resolve the default data directory without creating it
pub fn default_data_directory() -> Result<PathBuf> {
    let parent = dirs::document_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(parent.join(DEFAULT_DIRECTORY_NAME))
}
