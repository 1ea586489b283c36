//! HTTP implementation of the generation gateway.
//!
//! Wraps the text-completion and image-generation endpoints behind the
//! [`GenerationGateway`] trait, sharing one HTTP client and one resolved
//! configuration.

pub mod config;
mod image_client;
mod text_client;

use async_trait::async_trait;

use confab_core::error::Result;
use confab_core::gateway::{GenerationError, GenerationGateway, HistoryTurn};
use confab_store::{GatewaySettings, SecretConfig};

pub use config::GatewayConfig;
use image_client::ImageGenerationClient;
use text_client::TextCompletionClient;

pub struct HttpGenerationGateway {
    text: TextCompletionClient,
    image: ImageGenerationClient,
}

impl HttpGenerationGateway {
    /// Creates a gateway from resolved configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let client = reqwest::Client::new();
        Self {
            text: TextCompletionClient::new(
                client.clone(),
                config.text_endpoint,
                config.model,
                config.api_key.clone(),
            ),
            image: ImageGenerationClient::new(client, config.image_endpoint, config.api_key),
        }
    }

    /// Resolves configuration from settings and secrets, then creates the
    /// gateway.
    ///
    /// # Errors
    ///
    /// Returns a config error when an endpoint is missing from every
    /// source.
    pub fn from_settings(
        settings: &GatewaySettings,
        secrets: Option<&SecretConfig>,
    ) -> Result<Self> {
        Ok(Self::new(GatewayConfig::resolve(settings, secrets)?))
    }
}

#[async_trait]
impl GenerationGateway for HttpGenerationGateway {
    async fn complete_text(
        &self,
        message: &str,
        history: &[HistoryTurn],
    ) -> std::result::Result<String, GenerationError> {
        self.text.complete(message, history).await
    }

    async fn generate_image(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        self.image.generate(prompt).await
    }
}
