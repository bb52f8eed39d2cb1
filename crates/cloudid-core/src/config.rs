//! Store configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::SERVICE_NAME;
use crate::{Error, Result};

/// Directory name used under the platform config and data directories.
const APP_DIR: &str = "cloudid";

/// Configuration for an [`crate::AccountStore`] and its backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Account type accounts are listed and created under.
    pub account_type: String,
    /// `SQLite` database holding accounts, metadata and preferences.
    pub database_path: PathBuf,
    /// Keyring service name for passwords and tokens.
    pub keyring_service: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            account_type: APP_DIR.to_string(),
            database_path: default_data_dir().join("cloudid.db"),
            keyring_service: SERVICE_NAME.to_string(),
        }
    }
}

impl StoreConfig {
    /// Default location of the config file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults; unset fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration as pretty-printed JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Database path as a string suitable for a `SQLite` URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the path is not valid UTF-8.
    pub fn database_url_path(&self) -> Result<&str> {
        self.database_path
            .to_str()
            .ok_or_else(|| Error::Config("database path is not valid UTF-8".to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.account_type.trim().is_empty() {
            return Err(Error::Config("account_type must not be empty".to_string()));
        }
        if self.keyring_service.trim().is_empty() {
            return Err(Error::Config("keyring_service must not be empty".to_string()));
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
