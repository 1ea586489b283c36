pub mod chat;
pub mod conversations;

use std::sync::Arc;

use anyhow::{Context, Result};

use confab_core::store::ConversationStore;
use confab_store::{ConfigService, RootConfig, SecretConfig, SecretStorage, store_from_config};

/// Loaded configuration plus the store it selects.
pub struct Setup {
    pub config: RootConfig,
    pub secrets: Option<SecretConfig>,
    pub store: Arc<dyn ConversationStore>,
}

/// Loads config.toml and secret.json and builds the configured store.
pub async fn setup() -> Result<Setup> {
    let config = ConfigService::default_location()
        .context("failed to resolve configuration path")?
        .get_config();
    let secrets = SecretStorage::default_location()
        .context("failed to resolve secret path")?
        .load()
        .await
        .context("failed to read secret.json")?;
    let store = store_from_config(&config, secrets.as_ref())
        .await
        .context("failed to initialize conversation store")?;
    Ok(Setup {
        config,
        secrets,
        store,
    })
}
