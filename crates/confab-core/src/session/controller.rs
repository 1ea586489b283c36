use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

use super::command::{self, ParsedInput};
use super::event::SessionEvent;
use crate::codec;
use crate::error::{ConfabError, Result};
use crate::gateway::{GenerationGateway, HistoryTurn};
use crate::model::{
    ChatMessage, Conversation, DEFAULT_CONVERSATION_TITLE, derive_title, now_timestamp,
};
use crate::store::ConversationStore;

/// Default number of prior turns submitted as context with a text request.
const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The outcome of a `send_message` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was empty or another send is already in flight; nothing changed.
    Ignored,
    /// The exchange completed: the placeholder now holds the reply or an
    /// inline error explanation.
    Completed { conversation_id: String },
    /// A locally generated reply was appended without any generation call.
    LocalReply { conversation_id: String },
}

/// Ephemeral session state: a client-side projection of the owner's
/// conversations, rebuilt from the store on load.
#[derive(Default)]
struct SessionState {
    /// Conversations ordered most-recently-updated first.
    conversations: Vec<Conversation>,
    /// Decoded message lists, keyed by conversation id. Absence means the
    /// conversation's messages have not been loaded yet.
    messages: HashMap<String, Vec<ChatMessage>>,
    /// Currently active conversation, if any.
    active_id: Option<String>,
    /// True while a send/generation is in flight for this session.
    sending: bool,
}

/// The single source of truth for what conversation and messages are
/// currently displayed, and the only component permitted to trigger
/// persistence.
///
/// `SessionController` is responsible for:
/// - Loading the owner's conversation list from the store
/// - Creating, selecting, renaming, and deleting conversations
/// - Appending optimistic messages and resolving generation placeholders
/// - Persisting the encoded message list after every content mutation
///
/// Store and gateway dependencies are injected; a UI consumes state via
/// the snapshot accessors and the [`SessionEvent`] subscription.
pub struct SessionController {
    owner_id: String,
    store: Arc<dyn ConversationStore>,
    gateway: Arc<dyn GenerationGateway>,
    state: Arc<RwLock<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    history_window: usize,
}

enum GenerationRequest {
    Text,
    Image { prompt: String },
}

enum ReplyBody {
    Text(String),
    Image(String),
}

impl SessionController {
    /// Creates a controller for the given owner with injected dependencies.
    pub fn new(
        owner_id: impl Into<String>,
        store: Arc<dyn ConversationStore>,
        gateway: Arc<dyn GenerationGateway>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            owner_id: owner_id.into(),
            store,
            gateway,
            state: Arc::new(RwLock::new(SessionState::default())),
            events,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// Overrides the number of prior turns sent as completion context.
    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Subscribes to state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Rebuilds the session from the store and auto-selects the most
    /// recent conversation, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation list cannot be fetched.
    /// Failures while loading the selected conversation's messages are
    /// logged and degrade to an empty message list instead.
    pub async fn load(&self) -> Result<()> {
        let conversations = self.store.list(&self.owner_id).await?;
        let most_recent = conversations.first().map(|c| c.id.clone());
        {
            let mut state = self.state.write().await;
            state.conversations = conversations;
            state.messages.clear();
            state.active_id = None;
        }
        self.emit(SessionEvent::ConversationsChanged);
        if let Some(id) = most_recent {
            self.select_conversation(&id).await?;
        }
        Ok(())
    }

    /// Creates a new empty conversation, makes it active, and clears the
    /// displayed message list. No network message is sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the create.
    pub async fn create_conversation(&self) -> Result<String> {
        let conversation = self
            .store
            .create(&self.owner_id, DEFAULT_CONVERSATION_TITLE)
            .await?;
        let id = conversation.id.clone();
        {
            let mut state = self.state.write().await;
            state.conversations.insert(0, conversation);
            state.messages.insert(id.clone(), Vec::new());
            state.active_id = Some(id.clone());
        }
        self.emit(SessionEvent::ConversationsChanged);
        self.emit(SessionEvent::ActiveConversationChanged {
            conversation_id: Some(id.clone()),
        });
        self.emit(SessionEvent::MessagesChanged {
            conversation_id: id.clone(),
        });
        Ok(id)
    }

    /// Makes the given conversation active, fetching and decoding its
    /// messages unless they are already in memory.
    ///
    /// A fetch or decode failure is not an error state: the conversation
    /// is shown with an empty message list (an empty blob is a valid
    /// document shape) and a diagnostic is logged.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not in the loaded conversation list.
    pub async fn select_conversation(&self, conversation_id: &str) -> Result<()> {
        let already_loaded = {
            let state = self.state.read().await;
            if !state.conversations.iter().any(|c| c.id == conversation_id) {
                return Err(ConfabError::not_found("Conversation", conversation_id));
            }
            state.messages.contains_key(conversation_id)
        };

        if !already_loaded {
            let messages = match self.store.find_by_id(conversation_id).await {
                Ok(Some(record)) => codec::decode(Some(&record.messages)),
                Ok(None) => {
                    warn!(conversation_id, "conversation record missing; showing empty");
                    Vec::new()
                }
                Err(err) => {
                    warn!(conversation_id, "failed to load conversation: {err}");
                    Vec::new()
                }
            };
            let mut state = self.state.write().await;
            state.messages.insert(conversation_id.to_string(), messages);
        }

        {
            let mut state = self.state.write().await;
            state.active_id = Some(conversation_id.to_string());
        }
        self.emit(SessionEvent::ActiveConversationChanged {
            conversation_id: Some(conversation_id.to_string()),
        });
        self.emit(SessionEvent::MessagesChanged {
            conversation_id: conversation_id.to_string(),
        });
        Ok(())
    }

    /// Sends user input through the session.
    ///
    /// Empty input and overlapping sends are ignored. Command-prefixed
    /// input is intercepted before the text path: `/imagine <prompt>`
    /// routes to the image endpoint, while `/imagine` without a prompt and
    /// `/help` are answered locally with no generation call. With no
    /// active conversation, one is created implicitly with a title derived
    /// from the input text.
    ///
    /// # Errors
    ///
    /// Returns an error only when the implicit conversation create fails;
    /// generation failures resolve the placeholder with a user-facing
    /// explanation instead.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(SendOutcome::Ignored);
        }
        match command::parse_input(trimmed) {
            ParsedInput::Help => self.append_local_reply(trimmed, command::help_text()).await,
            ParsedInput::ImagineMissingPrompt => {
                self.append_local_reply(trimmed, command::imagine_usage())
                    .await
            }
            ParsedInput::Imagine { prompt } => {
                self.run_generation(trimmed, GenerationRequest::Image { prompt })
                    .await
            }
            ParsedInput::Plain => self.run_generation(trimmed, GenerationRequest::Text).await,
        }
    }

    /// Appends a user message carrying an uploaded image reference.
    ///
    /// The upload path is a direct success: no generation call is made,
    /// the message is persisted like any other mutation.
    pub async fn add_uploaded_image(&self, url: &str) -> Result<()> {
        let conversation_id = {
            let mut state = self.state.write().await;
            let id = self.ensure_active(&mut state, "Image upload").await?;
            let mut message = ChatMessage::user("");
            message.uploaded_image_url = Some(url.to_string());
            state
                .messages
                .entry(id.clone())
                .or_default()
                .push(message);
            touch_conversation(&mut state, &id);
            id
        };
        self.emit(SessionEvent::MessagesChanged {
            conversation_id: conversation_id.clone(),
        });
        self.emit(SessionEvent::ConversationsChanged);
        self.persist(&conversation_id).await;
        Ok(())
    }

    /// Renames a conversation. Empty titles (after trim) are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the rename.
    pub async fn rename_conversation(&self, conversation_id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(());
        }
        self.store.rename(conversation_id, title).await?;
        {
            let mut state = self.state.write().await;
            if let Some(conversation) = state
                .conversations
                .iter_mut()
                .find(|c| c.id == conversation_id)
            {
                conversation.title = title.to_string();
            }
        }
        self.emit(SessionEvent::ConversationsChanged);
        Ok(())
    }

    /// Deletes a conversation.
    ///
    /// When the deleted conversation was active, the new most recent
    /// remaining conversation is selected deterministically; with nothing
    /// left the session enters the explicit no-active-conversation state.
    /// The active id never dangles.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.store.delete(conversation_id).await?;

        let replacement = {
            let mut state = self.state.write().await;
            state.conversations.retain(|c| c.id != conversation_id);
            state.messages.remove(conversation_id);
            if state.active_id.as_deref() == Some(conversation_id) {
                state.active_id = None;
                Some(state.conversations.first().map(|c| c.id.clone()))
            } else {
                None
            }
        };
        self.emit(SessionEvent::ConversationsChanged);

        match replacement {
            // The active conversation was deleted and another one remains.
            Some(Some(next_id)) => self.select_conversation(&next_id).await?,
            // The active conversation was deleted and none remain.
            Some(None) => {
                self.emit(SessionEvent::ActiveConversationChanged {
                    conversation_id: None,
                });
            }
            // A background conversation was deleted; active is untouched.
            None => {}
        }
        Ok(())
    }

    /// Clears the active conversation's messages and persists the empty
    /// list. No-op without an active conversation.
    pub async fn clear_messages(&self) -> Result<()> {
        let conversation_id = {
            let mut state = self.state.write().await;
            let Some(id) = state.active_id.clone() else {
                return Ok(());
            };
            state.messages.insert(id.clone(), Vec::new());
            touch_conversation(&mut state, &id);
            id
        };
        self.emit(SessionEvent::MessagesChanged {
            conversation_id: conversation_id.clone(),
        });
        self.emit(SessionEvent::ConversationsChanged);
        self.persist(&conversation_id).await;
        Ok(())
    }

    /// Returns a snapshot of the conversation list, most recent first.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.read().await.conversations.clone()
    }

    /// Returns the active conversation id, if any.
    pub async fn active_conversation_id(&self) -> Option<String> {
        self.state.read().await.active_id.clone()
    }

    /// Returns a snapshot of the active conversation's messages.
    pub async fn active_messages(&self) -> Vec<ChatMessage> {
        let state = self.state.read().await;
        state
            .active_id
            .as_ref()
            .and_then(|id| state.messages.get(id))
            .cloned()
            .unwrap_or_default()
    }

    /// True while a send/generation is in flight.
    pub async fn is_sending(&self) -> bool {
        self.state.read().await.sending
    }

    /// Encodes and persists the active snapshot of a conversation's
    /// messages, awaiting the store call. Intended for graceful shutdown;
    /// normal mutations persist fire-and-forget.
    pub async fn flush(&self, conversation_id: &str) -> Result<()> {
        let encoded = {
            let state = self.state.read().await;
            match state.messages.get(conversation_id) {
                Some(messages) => codec::encode(messages)?,
                None => return Ok(()),
            }
        };
        self.store.update_messages(conversation_id, &encoded).await
    }

    async fn append_local_reply(&self, input: &str, reply: String) -> Result<SendOutcome> {
        let conversation_id = {
            let mut state = self.state.write().await;
            if state.sending {
                debug!("send already in flight; ignoring input");
                return Ok(SendOutcome::Ignored);
            }
            let id = self.ensure_active(&mut state, input).await?;
            let messages = state.messages.entry(id.clone()).or_default();
            messages.push(ChatMessage::user(input));
            messages.push(ChatMessage::assistant(reply));
            touch_conversation(&mut state, &id);
            id
        };
        self.emit(SessionEvent::MessagesChanged {
            conversation_id: conversation_id.clone(),
        });
        self.emit(SessionEvent::ConversationsChanged);
        self.persist(&conversation_id).await;
        Ok(SendOutcome::LocalReply { conversation_id })
    }

    async fn run_generation(
        &self,
        input: &str,
        request: GenerationRequest,
    ) -> Result<SendOutcome> {
        // Phase 1: optimistic mutation. The user message and a placeholder
        // are appended before any network call resolves.
        let (conversation_id, placeholder_id, history) = {
            let mut state = self.state.write().await;
            if state.sending {
                debug!("send already in flight; ignoring input");
                return Ok(SendOutcome::Ignored);
            }
            let conversation_id = self.ensure_active(&mut state, input).await?;
            let messages = state.messages.entry(conversation_id.clone()).or_default();
            let history = history_window(messages, self.history_window);
            messages.push(ChatMessage::user(input));
            let placeholder = match &request {
                GenerationRequest::Text => ChatMessage::placeholder(),
                GenerationRequest::Image { .. } => ChatMessage::image_placeholder(),
            };
            let placeholder_id = placeholder.id.clone();
            messages.push(placeholder);
            state.sending = true;
            (conversation_id, placeholder_id, history)
        };
        self.emit(SessionEvent::MessagesChanged {
            conversation_id: conversation_id.clone(),
        });
        self.emit(SessionEvent::SendStateChanged { sending: true });
        self.persist(&conversation_id).await;

        // Phase 2: the remote call, without holding the state lock.
        let result = match &request {
            GenerationRequest::Text => self
                .gateway
                .complete_text(input, &history)
                .await
                .map(ReplyBody::Text),
            GenerationRequest::Image { prompt } => self
                .gateway
                .generate_image(prompt)
                .await
                .map(ReplyBody::Image),
        };
        let succeeded = result.is_ok();

        // Phase 3: resolve the placeholder in place. Failures keep the
        // exchange in history with a user-facing explanation; nothing is
        // rolled back.
        {
            let mut state = self.state.write().await;
            if let Some(messages) = state.messages.get_mut(&conversation_id) {
                if let Some(placeholder) =
                    messages.iter_mut().find(|m| m.id == placeholder_id)
                {
                    match result {
                        Ok(ReplyBody::Text(reply)) => {
                            placeholder.content = reply;
                        }
                        Ok(ReplyBody::Image(url)) => {
                            placeholder.content = "Here is the image you asked for.".to_string();
                            placeholder.image_url = Some(url);
                        }
                        Err(err) => {
                            warn!(conversation_id, "generation failed: {err}");
                            placeholder.content = err.user_message().to_string();
                        }
                    }
                    placeholder.pending = false;
                    placeholder.is_generating_image = false;
                }
            }
            state.sending = false;
            touch_conversation(&mut state, &conversation_id);
        }
        self.emit(SessionEvent::MessagesChanged {
            conversation_id: conversation_id.clone(),
        });
        self.emit(SessionEvent::SendStateChanged { sending: false });
        self.emit(SessionEvent::ConversationsChanged);

        if succeeded {
            self.maybe_auto_title(&conversation_id, input).await;
        }
        self.persist(&conversation_id).await;
        Ok(SendOutcome::Completed { conversation_id })
    }

    /// Returns the active conversation id, creating a conversation seeded
    /// with a title derived from the input when none is active.
    async fn ensure_active(&self, state: &mut SessionState, seed: &str) -> Result<String> {
        if let Some(id) = &state.active_id {
            return Ok(id.clone());
        }
        let conversation = self
            .store
            .create(&self.owner_id, &derive_title(seed))
            .await?;
        let id = conversation.id.clone();
        state.conversations.insert(0, conversation);
        state.messages.insert(id.clone(), Vec::new());
        state.active_id = Some(id.clone());
        self.emit(SessionEvent::ConversationsChanged);
        self.emit(SessionEvent::ActiveConversationChanged {
            conversation_id: Some(id.clone()),
        });
        Ok(id)
    }

    /// Renames a conversation still holding the default title after its
    /// first successful exchange. Rename failures are logged and leave the
    /// default title in place so a later exchange may try again.
    async fn maybe_auto_title(&self, conversation_id: &str, first_message: &str) {
        let needs_title = {
            let state = self.state.read().await;
            state
                .conversations
                .iter()
                .find(|c| c.id == conversation_id)
                .map(|c| c.title == DEFAULT_CONVERSATION_TITLE)
                .unwrap_or(false)
        };
        if !needs_title {
            return;
        }
        let title = derive_title(first_message);
        if let Err(err) = self.store.rename(conversation_id, &title).await {
            warn!(conversation_id, "auto-title rename failed: {err}");
            return;
        }
        {
            let mut state = self.state.write().await;
            if let Some(conversation) = state
                .conversations
                .iter_mut()
                .find(|c| c.id == conversation_id)
            {
                conversation.title = title;
            }
        }
        self.emit(SessionEvent::ConversationsChanged);
    }

    /// Persists the current encoded message list, fire-and-forget.
    ///
    /// The UI never blocks on persistence; failures are logged, not
    /// retried, and the in-memory state is not rolled back.
    async fn persist(&self, conversation_id: &str) {
        let encoded = {
            let state = self.state.read().await;
            let Some(messages) = state.messages.get(conversation_id) else {
                return;
            };
            match codec::encode(messages) {
                Ok(encoded) => encoded,
                Err(err) => {
                    warn!(conversation_id, "failed to encode messages: {err}");
                    return;
                }
            }
        };
        let store = Arc::clone(&self.store);
        let id = conversation_id.to_string();
        tokio::spawn(async move {
            if let Err(err) = store.update_messages(&id, &encoded).await {
                warn!(conversation_id = %id, "failed to persist messages: {err}");
            }
        });
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

/// Bumps a conversation to the front of the list with a fresh timestamp.
fn touch_conversation(state: &mut SessionState, conversation_id: &str) {
    if let Some(pos) = state
        .conversations
        .iter()
        .position(|c| c.id == conversation_id)
    {
        let mut conversation = state.conversations.remove(pos);
        conversation.updated_at = now_timestamp();
        state.conversations.insert(0, conversation);
    }
}

/// Maps the most recent `limit` settled turns into gateway history.
fn history_window(messages: &[ChatMessage], limit: usize) -> Vec<HistoryTurn> {
    messages
        .iter()
        .filter(|m| !m.pending && !m.is_generating_image)
        .rev()
        .take(limit)
        .map(|m| HistoryTurn::new(m.role, m.content.clone()))
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}
