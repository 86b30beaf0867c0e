//! Persistence traits for characters, conversations and messages.
//!
//! The chat core only reads characters and never writes messages itself;
//! the surrounding application persists both sides of a send through
//! [`MessageStore`] after the orchestrator returns.

use crate::character::{Character, CharacterCategory};
use crate::error::Result;
use crate::message::ConversationId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user–character chat thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: String,
    pub character_id: String,
    pub title: String,

    /// Preview of the latest message, set when a send completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Input for creating a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConversation {
    pub user_id: String,
    pub character_id: String,
    pub title: String,
}

/// Listing row for a user's conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub character_name: String,
    pub message_count: usize,
}

/// Who wrote a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "AI")]
    Ai,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: ConversationId,
    pub kind: MessageKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Read-only access to the character catalogue.
///
/// Inactive characters are invisible to every method.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    /// Look up an active character by id.
    async fn get_character(&self, id: &str) -> Result<Option<Character>>;

    /// Look up an active character by its exact display name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Character>>;

    /// List active characters, optionally restricted to one category.
    async fn list_characters(&self, category: Option<CharacterCategory>) -> Result<Vec<Character>>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, new: NewConversation) -> Result<Conversation>;

    async fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>>;

    /// A user's conversations, most recently updated first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>>;

    /// Returns `true` if a conversation was removed.
    async fn delete_conversation(&self, id: &ConversationId) -> Result<bool>;

    /// Bump `updated_at` and record the latest message preview.
    async fn touch_conversation(&self, id: &ConversationId, last_message: &str) -> Result<()>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(
        &self,
        conversation_id: &ConversationId,
        kind: MessageKind,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<StoredMessage>;

    /// Messages of a conversation in creation order.
    async fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<StoredMessage>>;

    async fn count_messages(&self, conversation_id: &ConversationId) -> Result<usize>;

    /// Remove every message of a conversation, returning how many were dropped.
    async fn delete_messages(&self, conversation_id: &ConversationId) -> Result<usize>;
}
