//! Conversation store trait.
//!
//! Defines the interface for conversation persistence. Implementations are
//! the only components that talk to the backing document store.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Conversation;

/// An abstract adapter over the document collection holding conversations.
///
/// This trait decouples the session controller from the specific storage
/// mechanism (local JSON files, a hosted document database, an in-memory
/// test double).
///
/// # Failure policy
///
/// Every operation may fail due to network or auth errors from the
/// underlying service. Failures are surfaced to the caller as `Err` values,
/// never swallowed at this layer; it is the caller's decision whether a
/// failure is fatal or merely logged.
#[async_trait]
pub trait ConversationStore: Send + Sync + std::fmt::Debug {
    /// Lists all conversations owned by `owner_id`, ordered by
    /// `updated_at` descending.
    ///
    /// The ordering is load-bearing: callers treat index 0 as "most
    /// recent" without re-sorting.
    async fn list(&self, owner_id: &str) -> Result<Vec<Conversation>>;

    /// Fetches a single conversation by id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(conversation))`: record found
    /// - `Ok(None)`: no record with this id
    /// - `Err(_)`: transport or decode failure
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Creates a conversation with an empty encoded message list and
    /// returns the record including its store-assigned id.
    async fn create(&self, owner_id: &str, title: &str) -> Result<Conversation>;

    /// Overwrites the encoded message blob and bumps `updated_at` to now.
    ///
    /// The store has no append or patch semantics for this field; callers
    /// must always pass the full re-encoded list.
    async fn update_messages(&self, conversation_id: &str, encoded: &str) -> Result<()>;

    /// Updates the conversation title. Does not bump `updated_at`;
    /// ordering is driven by message activity only.
    async fn rename(&self, conversation_id: &str, title: &str) -> Result<()>;

    /// Deletes a conversation unconditionally. Deleting a missing record
    /// is not an error.
    async fn delete(&self, conversation_id: &str) -> Result<()>;
}
