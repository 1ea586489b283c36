//! Secret storage.
//!
//! API keys and endpoint overrides live in secret.json, outside the main
//! configuration file, so config.toml can be shared or committed without
//! leaking credentials.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use confab_core::error::{ConfabError, Result};

use crate::paths::ConfabPaths;

/// Secret configuration stored in secret.json.
///
/// Every field is optional; a missing field falls back to environment
/// variables and then to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretConfig {
    /// API key sent with generation and store requests.
    pub api_key: Option<String>,
    /// Override for the text-completion endpoint URL.
    pub text_endpoint: Option<String>,
    /// Override for the image-generation endpoint URL.
    pub image_endpoint: Option<String>,
    /// Model selector forwarded with text requests.
    pub model: Option<String>,
    /// API key for the hosted document store backend.
    pub store_api_key: Option<String>,
}

/// Reads secret configuration from a JSON file.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates a storage reading from the default location
    /// (`~/.config/confab/secret.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be resolved.
    pub fn default_location() -> Result<Self> {
        let path = ConfabPaths::secret_file()
            .map_err(|e| ConfabError::config(format!("failed to resolve secret path: {e}")))?;
        Ok(Self::new(path))
    }

    /// Creates a storage reading from an explicit path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads the secret file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(config))`: file exists and parsed
    /// - `Ok(None)`: file does not exist
    /// - `Err(_)`: file exists but cannot be read or parsed
    pub async fn load(&self) -> Result<Option<SecretConfig>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let config = serde_json::from_str(&contents)?;
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = SecretStorage::new(dir.path().join("secret.json"));
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_secret_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.json");
        tokio::fs::write(&path, r#"{"api_key": "sk-test"}"#)
            .await
            .unwrap();

        let config = SecretStorage::new(&path).load().await.unwrap().unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert!(config.model.is_none());
    }

    #[tokio::test]
    async fn test_malformed_secret_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.json");
        tokio::fs::write(&path, "{broken").await.unwrap();

        assert!(SecretStorage::new(&path).load().await.is_err());
    }
}
