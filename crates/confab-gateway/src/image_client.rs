//! Image-generation endpoint client.
//!
//! The image endpoint signals rejections in the response body as well as
//! the status line: a JSON `errorType` field distinguishes content-policy
//! rejections from throttling, so body classification is tried before
//! falling back to the HTTP status.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use confab_core::gateway::{GenerationError, GenerationErrorKind};

use crate::text_client::classify_status;

pub struct ImageGenerationClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ImageGenerationClient {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }

    /// Submits a prompt and returns the generated image URL.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!("sending image generation request");
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&ImageRequest { prompt });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::other(format!("image request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::other(format!("image response read failed: {e}")))?;

        if status.is_success() {
            let reply: ImageResponse = serde_json::from_str(&body).map_err(|e| {
                GenerationError::other(format!("image response decode failed: {e}"))
            })?;
            return Ok(reply.image_url);
        }
        Err(classify_failure(status, &body))
    }
}

/// Classifies a failed image response, preferring the body's `errorType`
/// over the HTTP status.
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> GenerationError {
    if let Ok(error) = serde_json::from_str::<ImageErrorResponse>(body) {
        let kind = match error.error_type.as_deref() {
            Some("content_policy") => GenerationErrorKind::ContentPolicy,
            Some("rate_limit") => GenerationErrorKind::RateLimit,
            _ => return classify_status(status, &error.error),
        };
        return GenerationError::new(kind, error.error);
    }
    classify_status(status, body)
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    image_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response_decodes() {
        let reply: ImageResponse =
            serde_json::from_str(r#"{"imageUrl": "https://img.example/a.png"}"#).unwrap();
        assert_eq!(reply.image_url, "https://img.example/a.png");
    }

    #[test]
    fn test_content_policy_body_classified() {
        let error = classify_failure(
            StatusCode::BAD_REQUEST,
            r#"{"error": "prompt rejected", "errorType": "content_policy"}"#,
        );
        assert_eq!(error.kind, GenerationErrorKind::ContentPolicy);
        assert_eq!(error.message, "prompt rejected");
    }

    #[test]
    fn test_rate_limit_body_classified() {
        let error = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": "slow down", "errorType": "rate_limit"}"#,
        );
        assert_eq!(error.kind, GenerationErrorKind::RateLimit);
    }

    #[test]
    fn test_unknown_error_type_falls_back_to_status() {
        let error = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": "mystery", "errorType": "novel_failure"}"#,
        );
        assert_eq!(error.kind, GenerationErrorKind::RateLimit);
    }

    #[test]
    fn test_non_json_body_falls_back_to_status() {
        let error = classify_failure(StatusCode::BAD_GATEWAY, "upstream exploded");
        assert_eq!(error.kind, GenerationErrorKind::Other);
        assert!(error.message.contains("upstream exploded"));
    }
}
