//! Core types and session logic for confab.
//!
//! This crate holds everything that does not touch a concrete backend:
//! the message codec, the conversation store trait, the generation
//! gateway trait, and the session controller that drives an interactive
//! chat session on top of them.

pub mod codec;
pub mod error;
pub mod gateway;
pub mod model;
pub mod session;
pub mod store;

pub use error::{ConfabError, Result};
pub use gateway::{GenerationError, GenerationErrorKind, GenerationGateway, HistoryTurn};
pub use model::{ChatMessage, Conversation, MessageRole};
pub use session::{SendOutcome, SessionController, SessionEvent};
pub use store::ConversationStore;
