//! Storage backends and configuration for confab.
//!
//! Provides the two [`ConversationStore`] implementations (local directory
//! and hosted document database), plus configuration and secret loading.

pub mod config;
pub mod dir_store;
pub mod http_store;
pub mod paths;
pub mod secret;

use std::sync::Arc;

use confab_core::error::{ConfabError, Result};
use confab_core::store::ConversationStore;

pub use config::{ConfigService, GatewaySettings, RootConfig, SessionSettings, StoreBackend};
pub use dir_store::DirConversationStore;
pub use http_store::{HttpDocumentStore, HttpStoreConfig};
pub use paths::ConfabPaths;
pub use secret::{SecretConfig, SecretStorage};

/// Environment variable carrying the hosted store API key.
pub const STORE_API_KEY_ENV: &str = "CONFAB_STORE_API_KEY";

/// Builds the conversation store selected by configuration.
///
/// The dir backend falls back to the default conversations directory when
/// `base_dir` is unset. The http backend requires endpoint, project,
/// database, and collection ids in the config, and takes its API key from
/// secret.json or the `CONFAB_STORE_API_KEY` environment variable.
///
/// # Errors
///
/// Returns a config error when a required http backend field is missing,
/// or an I/O error when the dir backend cannot create its directory.
pub async fn store_from_config(
    config: &RootConfig,
    secrets: Option<&SecretConfig>,
) -> Result<Arc<dyn ConversationStore>> {
    match config.store.backend {
        StoreBackend::Dir => {
            let store = match &config.store.base_dir {
                Some(base_dir) => DirConversationStore::new(base_dir).await?,
                None => DirConversationStore::default_location().await?,
            };
            Ok(Arc::new(store))
        }
        StoreBackend::Http => {
            let api_key = secrets
                .and_then(|s| s.store_api_key.clone())
                .or_else(|| std::env::var(STORE_API_KEY_ENV).ok())
                .ok_or_else(|| {
                    ConfabError::config(format!(
                        "http store backend needs an API key in secret.json or {STORE_API_KEY_ENV}"
                    ))
                })?;
            let store = HttpDocumentStore::new(HttpStoreConfig {
                endpoint: require(&config.store.endpoint, "store.endpoint")?,
                project_id: require(&config.store.project_id, "store.project_id")?,
                api_key,
                database_id: require(&config.store.database_id, "store.database_id")?,
                collection_id: require(&config.store.collection_id, "store.collection_id")?,
            });
            Ok(Arc::new(store))
        }
    }
}

fn require(value: &Option<String>, field: &str) -> Result<String> {
    value
        .clone()
        .ok_or_else(|| ConfabError::config(format!("http store backend needs {field}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dir_backend_uses_configured_base() {
        let dir = TempDir::new().unwrap();
        let mut config = RootConfig::default();
        config.store.base_dir = Some(dir.path().join("convs"));

        let store = store_from_config(&config, None).await.unwrap();
        store.create("owner-1", "Hello").await.unwrap();

        assert!(dir.path().join("convs").is_dir());
    }

    #[tokio::test]
    async fn test_http_backend_requires_endpoint() {
        let mut config = RootConfig::default();
        config.store.backend = StoreBackend::Http;

        let secrets = SecretConfig {
            store_api_key: Some("key".to_string()),
            ..Default::default()
        };
        let err = store_from_config(&config, Some(&secrets)).await.unwrap_err();
        assert!(err.to_string().contains("store.endpoint"));
    }
}
