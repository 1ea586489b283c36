use serde::{Deserialize, Serialize};

/// State-change notifications published by the session controller.
///
/// A UI subscribes to these instead of polling; each event names what
/// changed so consumers can refresh the matching view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The conversation list changed (order, titles, additions, removals).
    ConversationsChanged,
    /// A different conversation became active (or none is active anymore).
    ActiveConversationChanged {
        conversation_id: Option<String>,
    },
    /// The message list of a conversation was mutated.
    MessagesChanged {
        conversation_id: String,
    },
    /// A send/generation started or finished.
    SendStateChanged {
        sending: bool,
    },
}
