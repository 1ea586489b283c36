//! Application configuration.
//!
//! The root configuration lives in `~/.config/confab/config.toml`. Every
//! section and field has a default, so a missing or partial file always
//! yields a usable configuration.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

use confab_core::error::{ConfabError, Result};

use crate::paths::ConfabPaths;

/// Which conversation store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local JSON files, one per conversation.
    Dir,
    /// Hosted document database over HTTP.
    Http,
}

/// Conversation store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Base directory for the dir backend. Defaults to the platform config
    /// directory when unset.
    pub base_dir: Option<PathBuf>,
    /// Endpoint URL for the http backend.
    pub endpoint: Option<String>,
    /// Project id sent with http backend requests.
    pub project_id: Option<String>,
    /// Database id for the http backend.
    pub database_id: Option<String>,
    /// Collection id holding conversation documents.
    pub collection_id: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Dir,
            base_dir: None,
            endpoint: None,
            project_id: None,
            database_id: None,
            collection_id: None,
        }
    }
}

/// Generation gateway settings. Secrets (API keys) do not belong here;
/// see [`crate::secret::SecretConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub text_endpoint: Option<String>,
    pub image_endpoint: Option<String>,
    pub model: Option<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            text_endpoint: None,
            image_endpoint: None,
            model: None,
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Owner id attached to every conversation.
    pub owner_id: String,
    /// Number of prior turns sent as completion context.
    pub history_window: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            owner_id: "local".to_string(),
            history_window: 10,
        }
    }
}

/// Root configuration for confab.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    pub store: StoreConfig,
    pub gateway: GatewaySettings,
    pub session: SessionSettings,
}

/// Configuration service that loads and caches the root configuration.
///
/// The configuration is loaded lazily on first access. A missing file is
/// not an error; a malformed file is logged and replaced by defaults.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Creates a service reading from the default location
    /// (`~/.config/confab/config.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be resolved.
    pub fn default_location() -> Result<Self> {
        let path = ConfabPaths::config_file()
            .map_err(|e| ConfabError::config(format!("failed to resolve config path: {e}")))?;
        Ok(Self::new(path))
    }

    /// Creates a service reading from an explicit path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the root configuration, loading from file if not cached.
    pub fn get_config(&self) -> RootConfig {
        {
            let read_lock = self.config.read().unwrap();
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match self.load_config() {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %self.path.display(), "failed to load config, using defaults: {err}");
                RootConfig::default()
            }
        };

        {
            let mut write_lock = self.config.write().unwrap();
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap();
        *write_lock = None;
    }

    fn load_config(&self) -> Result<RootConfig> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RootConfig::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(toml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let service = ConfigService::new(dir.path().join("config.toml"));
        let config = service.get_config();
        assert_eq!(config.store.backend, StoreBackend::Dir);
        assert_eq!(config.session.owner_id, "local");
        assert_eq!(config.session.history_window, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[store]\nbackend = \"http\"\nendpoint = \"https://db.example\"\n",
        )
        .unwrap();

        let config = ConfigService::new(&path).get_config();
        assert_eq!(config.store.backend, StoreBackend::Http);
        assert_eq!(config.store.endpoint.as_deref(), Some("https://db.example"));
        assert_eq!(config.session.owner_id, "local");
    }

    #[test]
    fn test_malformed_file_degrades_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not toml [[[").unwrap();

        let config = ConfigService::new(&path).get_config();
        assert_eq!(config.store.backend, StoreBackend::Dir);
    }

    #[test]
    fn test_cache_survives_file_change_until_invalidated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nowner_id = \"alice\"\n").unwrap();

        let service = ConfigService::new(&path);
        assert_eq!(service.get_config().session.owner_id, "alice");

        std::fs::write(&path, "[session]\nowner_id = \"bob\"\n").unwrap();
        assert_eq!(service.get_config().session.owner_id, "alice");

        service.invalidate_cache();
        assert_eq!(service.get_config().session.owner_id, "bob");
    }
}
