//! Text-completion endpoint client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use confab_core::gateway::{GenerationError, GenerationErrorKind, HistoryTurn};
use confab_core::model::MessageRole;

pub struct TextCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl TextCompletionClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        model: String,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint,
            model,
            api_key,
        }
    }

    /// Submits the message with its context window and returns the reply.
    pub async fn complete(
        &self,
        message: &str,
        history: &[HistoryTurn],
    ) -> Result<String, GenerationError> {
        let body = ChatRequest {
            message,
            chat_history: history.iter().map(HistoryEntry::from).collect(),
            model_selector: &self.model,
        };
        debug!(turns = history.len(), "sending completion request");

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::other(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let reply: ChatResponse = response.json().await.map_err(|e| {
            GenerationError::other(format!("completion response decode failed: {e}"))
        })?;
        Ok(reply.message)
    }
}

/// Maps an HTTP failure status to a classified generation error.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> GenerationError {
    let kind = match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationErrorKind::RateLimit,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationErrorKind::Auth,
        _ => GenerationErrorKind::Other,
    };
    GenerationError::new(kind, format!("endpoint returned {status}: {body}"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    message: &'a str,
    chat_history: Vec<HistoryEntry>,
    model_selector: &'a str,
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    role: &'static str,
    content: String,
}

impl From<&HistoryTurn> for HistoryEntry {
    fn from(turn: &HistoryTurn) -> Self {
        Self {
            role: match turn.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            },
            content: turn.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: String,
}
