//! In-memory conversation and message store, useful for tests and
//! single-process deployments.

use async_trait::async_trait;
use chatwithyou_core::error::{Error, Result};
use chatwithyou_core::message::ConversationId;
use chatwithyou_core::store::{
    Conversation, ConversationStore, MessageKind, MessageStore, NewConversation, StoredMessage,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Characters kept in a conversation's `last_message` preview.
const PREVIEW_CHARS: usize = 100;

#[derive(Default)]
struct State {
    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<ConversationId, Vec<StoredMessage>>,
}

/// Conversations and messages held in process memory.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn create_conversation(&self, new: NewConversation) -> Result<Conversation> {
        if new.user_id.trim().is_empty() {
            return Err(Error::Validation("user_id is required".into()));
        }
        let now = Utc::now();
        let conversation = Conversation {
            id: ConversationId::new(),
            user_id: new.user_id,
            character_id: new.character_id,
            title: new.title,
            last_message: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .write()
            .await
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        Ok(self.state.read().await.conversations.get(id).cloned())
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let state = self.state.read().await;
        let mut list: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<bool> {
        let mut state = self.state.write().await;
        state.messages.remove(id);
        Ok(state.conversations.remove(id).is_some())
    }

    async fn touch_conversation(&self, id: &ConversationId, last_message: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let conversation = state
            .conversations
            .get_mut(id)
            .ok_or_else(|| Error::not_found("Conversation", id.as_str()))?;
        conversation.last_message = Some(last_message.chars().take(PREVIEW_CHARS).collect());
        conversation.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn save_message(
        &self,
        conversation_id: &ConversationId,
        kind: MessageKind,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<StoredMessage> {
        let mut state = self.state.write().await;
        if !state.conversations.contains_key(conversation_id) {
            return Err(Error::not_found("Conversation", conversation_id.as_str()));
        }
        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.clone(),
            kind,
            content: content.to_string(),
            created_at,
        };
        state
            .messages
            .entry(conversation_id.clone())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<StoredMessage>> {
        Ok(self
            .state
            .read()
            .await
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn count_messages(&self, conversation_id: &ConversationId) -> Result<usize> {
        Ok(self
            .state
            .read()
            .await
            .messages
            .get(conversation_id)
            .map_or(0, Vec::len))
    }

    async fn delete_messages(&self, conversation_id: &ConversationId) -> Result<usize> {
        Ok(self
            .state
            .write()
            .await
            .messages
            .remove(conversation_id)
            .map_or(0, |m| m.len()))
    }
}
