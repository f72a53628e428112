//! File-backed configuration store.
//!
//! Implements [`ConfigPort`] by reading a JSON document from the SPIFFS
//! mount on the board (`/spiffs/config.json`) or any path on the host.

use std::path::PathBuf;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

/// On-device location of the config document.
pub const DEFAULT_CONFIG_PATH: &str = "/spiffs/config.json";

/// Larger files are rejected before parsing.
const MAX_CONFIG_BYTES: u64 = 4 * 1024;

pub struct FileConfigStore {
    path: PathBuf,
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigPort for FileConfigStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let meta = std::fs::metadata(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::IoError,
        })?;
        if meta.len() > MAX_CONFIG_BYTES {
            warn!("Config: {} is {} bytes, refusing", self.path.display(), meta.len());
            return Err(ConfigError::Corrupted);
        }

        let bytes = std::fs::read(&self.path).map_err(|e| {
            warn!("Config: read {} failed ({})", self.path.display(), e);
            ConfigError::IoError
        })?;
        let config = SystemConfig::from_json(&bytes)?;
        info!("Config: loaded from {}", self.path.display());
        Ok(config)
    }
}
