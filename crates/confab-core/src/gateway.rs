//! Generation gateway boundary.
//!
//! The gateway wraps external text-completion and image-generation
//! endpoints behind one normalized result shape. Failures are classified so
//! the controller can show a specific explanation for content-policy and
//! rate-limit rejections; every failure is terminal, nothing is retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::MessageRole;

/// User-facing explanation for a content-policy rejection.
pub const CONTENT_POLICY_MESSAGE: &str =
    "That request was declined by the content policy. Please try a different prompt.";

/// User-facing explanation for a rate-limit rejection.
pub const RATE_LIMIT_MESSAGE: &str =
    "The service is receiving too many requests right now. Please try again in a moment.";

/// User-facing explanation for any other failure.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while generating a response. Please try again.";

/// Classified failure kinds for generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    /// The prompt was rejected by the provider's content policy.
    ContentPolicy,
    /// The provider is throttling requests.
    RateLimit,
    /// Authentication or authorization failure.
    Auth,
    /// Any other transport, protocol, or provider failure.
    Other,
}

/// A terminal, non-retryable generation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("generation failed ({kind:?}): {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a generic failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Other, message)
    }

    /// Returns the human-readable explanation shown inside the
    /// conversation when this failure resolves a placeholder message.
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            GenerationErrorKind::ContentPolicy => CONTENT_POLICY_MESSAGE,
            GenerationErrorKind::RateLimit => RATE_LIMIT_MESSAGE,
            GenerationErrorKind::Auth | GenerationErrorKind::Other => GENERIC_FAILURE_MESSAGE,
        }
    }
}

/// One prior turn submitted as context to the text endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: MessageRole,
    pub content: String,
}

impl HistoryTurn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Normalized access to external generation endpoints.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Submits the current message plus a bounded trailing window of prior
    /// turns and returns the assistant's reply text.
    async fn complete_text(
        &self,
        message: &str,
        history: &[HistoryTurn],
    ) -> std::result::Result<String, GenerationError>;

    /// Submits an image prompt and returns the URL of the generated image.
    async fn generate_image(
        &self,
        prompt: &str,
    ) -> std::result::Result<String, GenerationError>;
}
