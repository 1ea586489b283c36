//! Gateway endpoint configuration.
//!
//! Resolution order for every field: secret.json, then environment
//! variables, then config.toml. Endpoints have no built-in default; a
//! gateway cannot be constructed without them.

use confab_core::error::{ConfabError, Result};
use confab_store::{GatewaySettings, SecretConfig};

/// Environment variable carrying the gateway API key.
pub const API_KEY_ENV: &str = "CONFAB_API_KEY";
/// Environment variable carrying the text-completion endpoint URL.
pub const TEXT_ENDPOINT_ENV: &str = "CONFAB_TEXT_ENDPOINT";
/// Environment variable carrying the image-generation endpoint URL.
pub const IMAGE_ENDPOINT_ENV: &str = "CONFAB_IMAGE_ENDPOINT";
/// Environment variable carrying the model selector.
pub const MODEL_ENV: &str = "CONFAB_MODEL";

/// Default model selector forwarded with text requests.
pub const DEFAULT_MODEL: &str = "standard";

/// Resolved connection settings for the generation gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub text_endpoint: String,
    pub image_endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl GatewayConfig {
    /// Resolves a complete configuration from secrets, environment, and
    /// settings, in that priority order.
    ///
    /// # Errors
    ///
    /// Returns a config error when either endpoint is missing from all
    /// three sources.
    pub fn resolve(settings: &GatewaySettings, secrets: Option<&SecretConfig>) -> Result<Self> {
        let text_endpoint = pick(
            secrets.and_then(|s| s.text_endpoint.clone()),
            TEXT_ENDPOINT_ENV,
            settings.text_endpoint.clone(),
        )
        .ok_or_else(|| missing("text endpoint", "gateway.text_endpoint", TEXT_ENDPOINT_ENV))?;

        let image_endpoint = pick(
            secrets.and_then(|s| s.image_endpoint.clone()),
            IMAGE_ENDPOINT_ENV,
            settings.image_endpoint.clone(),
        )
        .ok_or_else(|| missing("image endpoint", "gateway.image_endpoint", IMAGE_ENDPOINT_ENV))?;

        let model = pick(
            secrets.and_then(|s| s.model.clone()),
            MODEL_ENV,
            settings.model.clone(),
        )
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let api_key = secrets
            .and_then(|s| s.api_key.clone())
            .or_else(|| std::env::var(API_KEY_ENV).ok());

        Ok(Self {
            text_endpoint,
            image_endpoint,
            model,
            api_key,
        })
    }
}

fn pick(secret: Option<String>, env_var: &str, setting: Option<String>) -> Option<String> {
    secret
        .or_else(|| std::env::var(env_var).ok())
        .or(setting)
}

fn missing(what: &str, config_field: &str, env_var: &str) -> ConfabError {
    ConfabError::config(format!(
        "no {what} configured; set {config_field} in config.toml, {env_var}, or secret.json"
    ))
}
