//! Client configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! service base URL, endpoint paths, request timeout, and where the session
//! tokens are kept.
//!
//! Configuration is stored at `~/.config/stylentu/config.json`.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH, REQUEST_TIMEOUT_SECS};
use crate::auth::file_store::CREDENTIALS_FILE;
use crate::auth::keyring_store::DEFAULT_SERVICE_NAME;
use crate::auth::{ConfiguredStore, FileStore, KeyringStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "stylentu";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Production service
pub const DEFAULT_BASE_URL: &str = "https://cherryapi.pythonanywhere.com";

/// Where the session tokens live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// OS keychain
    #[default]
    Keyring,
    /// JSON file in the data directory
    File,
}

impl FromStr for CredentialBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(CredentialBackend::Keyring),
            "file" => Ok(CredentialBackend::File),
            other => Err(anyhow::anyhow!(
                "Unknown credential backend '{}' (expected 'keyring' or 'file')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub login_path: String,
    pub refresh_path: String,
    pub credential_backend: CredentialBackend,
    pub keyring_service: String,
    /// Overrides the default credentials file location
    pub credentials_file: Option<PathBuf>,
    pub last_username: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            credential_backend: CredentialBackend::default(),
            keyring_service: DEFAULT_SERVICE_NAME.to_string(),
            credentials_file: None,
            last_username: None,
        }
    }
}

impl ClientConfig {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Location of the file-backed credential store
    pub fn credentials_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.credentials_file {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(CREDENTIALS_FILE))
    }

    /// Open the configured credential store
    pub fn open_store(&self) -> Result<ConfiguredStore> {
        match self.credential_backend {
            CredentialBackend::Keyring => Ok(ConfiguredStore::Keyring(KeyringStore::new(
                self.keyring_service.as_str(),
            ))),
            CredentialBackend::File => Ok(ConfiguredStore::File(FileStore::new(self.credentials_path()?))),
        }
    }
}
