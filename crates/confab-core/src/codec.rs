//! Message list codec.
//!
//! A conversation's messages are persisted as one JSON text blob inside a
//! single bounded document field, not as a relational schema. This module
//! converts between the in-memory ordered message list and that blob.
//!
//! Decoding is deliberately forgiving: a corrupt or legacy record must not
//! make a conversation permanently inaccessible, so every parse failure
//! degrades to an empty list with a logged diagnostic instead of an error.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::model::{ChatMessage, MessageRole, next_message_id, now_timestamp};

/// Encodes a message list into the JSON text blob stored in the
/// conversation's `messages` field.
///
/// Timestamps are normalized to a fixed, sortable RFC 3339 form and absent
/// optional fields are omitted to keep the payload small.
///
/// # Errors
///
/// Returns an error if serialization fails (which only happens for
/// non-string map keys and similar pathologies, never for well-formed
/// messages).
pub fn encode(messages: &[ChatMessage]) -> Result<String> {
    let normalized: Vec<ChatMessage> = messages
        .iter()
        .cloned()
        .map(normalize_timestamp)
        .collect();
    Ok(serde_json::to_string(&normalized)?)
}

/// Decodes the stored text blob back into a message list.
///
/// Tolerates missing input and empty blobs. Never fails: malformed JSON
/// yields an empty list plus a logged diagnostic.
pub fn decode(raw: Option<&str>) -> Vec<ChatMessage> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => decode_value(&value),
        Err(err) => {
            warn!("discarding unreadable message blob: {err}");
            Vec::new()
        }
    }
}

/// Decodes a raw document field value.
///
/// Handles both the normal shape (a JSON string containing the encoded
/// array) and the legacy shape where the field holds the array of message
/// objects directly. Anything else yields an empty list.
pub fn decode_value(value: &Value) -> Vec<ChatMessage> {
    match value {
        Value::Null => Vec::new(),
        Value::String(blob) => decode(Some(blob)),
        Value::Array(items) => items.iter().filter_map(decode_item).collect(),
        other => {
            warn!("unexpected message blob shape: {}", value_kind(other));
            Vec::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Raw message shape used for defensive decoding. Every field is optional
/// so partially written or legacy records still come back usable.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    uploaded_image_url: Option<String>,
    #[serde(default)]
    is_generating_image: Option<bool>,
}

fn decode_item(item: &Value) -> Option<ChatMessage> {
    let raw: RawMessage = match serde_json::from_value(item.clone()) {
        Ok(raw) => raw,
        Err(err) => {
            warn!("skipping unreadable message record: {err}");
            return None;
        }
    };

    let role = match raw.role.as_deref() {
        Some("user") => MessageRole::User,
        // Missing or unknown roles default to assistant.
        _ => MessageRole::Assistant,
    };

    Some(ChatMessage {
        id: raw.id.unwrap_or_else(next_message_id),
        role,
        content: raw.content.unwrap_or_default(),
        timestamp: raw.timestamp.unwrap_or_else(now_timestamp),
        image_url: raw.image_url,
        uploaded_image_url: raw.uploaded_image_url,
        is_generating_image: raw.is_generating_image.unwrap_or(false),
        pending: false,
    })
}

fn normalize_timestamp(mut msg: ChatMessage) -> ChatMessage {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&msg.timestamp) {
        msg.timestamp = parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_preserves_observable_fields() {
        let mut image = ChatMessage::assistant("here you go");
        image.image_url = Some("https://img.example/cat.png".to_string());
        let mut upload = ChatMessage::user("look at this");
        upload.uploaded_image_url = Some("https://img.example/up.png".to_string());
        let messages = vec![ChatMessage::user("Hello"), image, upload];

        let encoded = encode(&messages).unwrap();
        let decoded = decode(Some(&encoded));

        assert_eq!(decoded.len(), messages.len());
        for (original, restored) in messages.iter().zip(&decoded) {
            assert_eq!(original.id, restored.id);
            assert_eq!(original.role, restored.role);
            assert_eq!(original.content, restored.content);
            assert_eq!(original.image_url, restored.image_url);
            assert_eq!(original.uploaded_image_url, restored.uploaded_image_url);
        }
    }

    #[test]
    fn test_decode_empty_inputs() {
        assert!(decode(None).is_empty());
        assert!(decode(Some("")).is_empty());
        assert!(decode(Some("   ")).is_empty());
        assert!(decode(Some("[]")).is_empty());
    }

    #[test]
    fn test_decode_malformed_json_yields_empty_list() {
        assert!(decode(Some("{not json")).is_empty());
        assert!(decode(Some("42")).is_empty());
        assert!(decode(Some("\"just a string\"")).is_empty());
    }

    #[test]
    fn test_decode_value_legacy_array_shape() {
        let value = json!([
            { "id": "1", "role": "user", "content": "hi", "timestamp": "2024-01-01T00:00:00.000Z" }
        ]);
        let decoded = decode_value(&value);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].role, MessageRole::User);
        assert_eq!(decoded[0].content, "hi");
    }

    #[test]
    fn test_decode_value_nested_string_shape() {
        let blob = r#"[{"id":"1","role":"assistant","content":"hey","timestamp":"2024-01-01T00:00:00.000Z"}]"#;
        let decoded = decode_value(&json!(blob));
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].content, "hey");
    }

    #[test]
    fn test_decode_fills_missing_fields() {
        let decoded = decode(Some(r#"[{"content":"orphan"}]"#));
        assert_eq!(decoded.len(), 1);
        let msg = &decoded[0];
        assert!(!msg.id.is_empty());
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, "orphan");
        assert!(!msg.timestamp.is_empty());
    }

    #[test]
    fn test_decode_unknown_role_defaults_to_assistant() {
        let decoded = decode(Some(r#"[{"role":"system","content":"x"}]"#));
        assert_eq!(decoded[0].role, MessageRole::Assistant);
    }

    #[test]
    fn test_decode_skips_non_object_items() {
        let decoded = decode(Some(r#"[1, {"content":"kept"}, "stray"]"#));
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].content, "kept");
    }

    #[test]
    fn test_encode_normalizes_timestamps() {
        let mut msg = ChatMessage::user("hi");
        msg.timestamp = "2024-06-01T12:30:45+02:00".to_string();
        let encoded = encode(&[msg]).unwrap();
        assert!(encoded.contains("2024-06-01T10:30:45.000Z"));
    }

    #[test]
    fn test_pending_flag_does_not_survive_encoding() {
        let placeholder = ChatMessage::placeholder();
        let encoded = encode(&[placeholder]).unwrap();
        let decoded = decode(Some(&encoded));
        assert!(!decoded[0].pending);
    }
}
