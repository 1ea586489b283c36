//! Conversation domain model.
//!
//! This module contains the core entities the session controller operates
//! on: `Conversation` (the persisted record) and `ChatMessage` (one turn
//! inside a conversation's serialized message list).

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Title given to explicitly created conversations before the first
/// successful exchange renames them.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

/// Maximum number of characters carried over from a message into a
/// derived conversation title.
pub const TITLE_MAX_CHARS: usize = 30;

/// Represents the sender of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

/// A single turn within a conversation.
///
/// Serialized camelCase to match the wire shape stored in the document
/// field. Optional fields are omitted entirely when absent so the encoded
/// blob stays small against the store's bounded field length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Client-generated id, unique within the conversation.
    pub id: String,
    /// The role of the message sender.
    pub role: MessageRole,
    /// The text content of the message.
    pub content: String,
    /// Timestamp when the message was created (RFC 3339).
    pub timestamp: String,
    /// URL of a remotely generated image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// URL of a user-uploaded image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_image_url: Option<String>,
    /// True while an image generation request for this message is in flight.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_generating_image: bool,
    /// Marks a text placeholder still waiting for its remote completion.
    /// In-memory only, never serialized.
    #[serde(skip)]
    pub pending: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ChatMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: next_message_id(),
            role,
            content: content.into(),
            timestamp: now_timestamp(),
            image_url: None,
            uploaded_image_url: None,
            is_generating_image: false,
            pending: false,
        }
    }

    /// Creates a user message with the given content.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message with the given content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Creates an empty assistant placeholder awaiting a text completion.
    pub fn placeholder() -> Self {
        let mut msg = Self::new(MessageRole::Assistant, "");
        msg.pending = true;
        msg
    }

    /// Creates an assistant placeholder awaiting a generated image.
    pub fn image_placeholder() -> Self {
        let mut msg = Self::new(MessageRole::Assistant, "");
        msg.is_generating_image = true;
        msg
    }
}

/// A conversation record as held by the document store.
///
/// The message list lives inside the `messages` field as a single JSON
/// text blob (see the `codec` module); an empty blob is a valid record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Store-assigned identifier.
    pub id: String,
    /// Id of the user owning this conversation.
    pub owner_id: String,
    /// Human-readable title, user-editable or derived from the first message.
    pub title: String,
    /// JSON-encoded message list. Empty string means no messages yet.
    #[serde(default)]
    pub messages: String,
    /// Timestamp when the conversation was created (RFC 3339).
    pub created_at: String,
    /// Timestamp of the last message update (RFC 3339); drives list ordering.
    pub updated_at: String,
}

/// Returns the current time in the fixed, sortable form used for all
/// persisted timestamps (RFC 3339 UTC, millisecond precision).
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generates a timestamp-derived message id.
///
/// The trailing sequence number keeps ids unique within a process even
/// when several messages are created in the same millisecond. Ids are not
/// globally unique; they only need to be unique within one conversation.
pub fn next_message_id() -> String {
    let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", Utc::now().timestamp_millis(), seq)
}

/// Derives a conversation title from message text: the first
/// [`TITLE_MAX_CHARS`] characters, with an ellipsis appended when truncated.
pub fn derive_title(text: &str) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let title: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{title}…")
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_title_short_text() {
        assert_eq!(derive_title("Hello"), "Hello");
    }

    #[test]
    fn test_derive_title_truncates_long_text() {
        let text = "a".repeat(50);
        let title = derive_title(&text);
        assert_eq!(title, format!("{}…", "a".repeat(30)));
    }

    #[test]
    fn test_derive_title_exact_boundary() {
        let text = "b".repeat(30);
        assert_eq!(derive_title(&text), text);
    }

    #[test]
    fn test_derive_title_counts_characters_not_bytes() {
        let text = "é".repeat(31);
        let title = derive_title(&text);
        assert_eq!(title.chars().count(), 31); // 30 chars + ellipsis
        assert!(title.ends_with('…'));
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = next_message_id();
        let b = next_message_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let msg = ChatMessage::user("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("imageUrl"));
        assert!(!json.contains("uploadedImageUrl"));
        assert!(!json.contains("isGeneratingImage"));
        assert!(!json.contains("pending"));
    }

    #[test]
    fn test_image_placeholder_serializes_flag() {
        let msg = ChatMessage::image_placeholder();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"isGeneratingImage\":true"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
