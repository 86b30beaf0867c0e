//! `/v1` routes.
//!
//! - `GET    /v1/characters?category=`: list active characters
//! - `GET    /v1/characters/{id}`: character detail
//! - `POST   /v1/conversations`: start a conversation
//! - `GET    /v1/conversations?user_id=`: a user's conversations
//! - `GET    /v1/conversations/{id}?user_id=`: conversation with messages
//! - `DELETE /v1/conversations/{id}?user_id=`: delete and forget context
//! - `POST   /v1/chat/send`: send a message, get the reply
//! - `GET    /v1/models`: model ids across providers
//! - `GET    /v1/providers`: provider reachability

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use chatwithyou_core::{
    Character, CharacterCategory, Conversation, ConversationId, ConversationSummary, Error,
    MessageKind, NewConversation, Provider, StoredMessage,
};
use chatwithyou_providers::ProviderHealth;

use crate::error::ApiResult;
use crate::{AppState, SharedState};

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/characters", get(list_characters_handler))
        .route("/characters/{id}", get(get_character_handler))
        .route(
            "/conversations",
            get(list_conversations_handler).post(create_conversation_handler),
        )
        .route(
            "/conversations/{id}",
            get(get_conversation_handler).delete(delete_conversation_handler),
        )
        .route("/chat/send", post(send_handler))
        .route("/models", get(models_handler))
        .route("/providers", get(providers_handler))
        .with_state(state)
}

// ── Envelope and DTOs ─────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
    })
}

/// The character fields a chat screen needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub category: CharacterCategory,
}

impl From<&Character> for CharacterSummary {
    fn from(c: &Character) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            avatar: c.avatar.clone(),
            category: c.category,
        }
    }
}

#[derive(Deserialize)]
struct CategoryQuery {
    #[serde(default)]
    category: Option<String>,
}

#[derive(Deserialize)]
struct UserQuery {
    #[serde(default)]
    user_id: String,
}

#[derive(Deserialize)]
struct CreateConversationRequest {
    user_id: String,
    character_id: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Serialize)]
struct ConversationDetail {
    #[serde(flatten)]
    conversation: Conversation,
    #[serde(skip_serializing_if = "Option::is_none")]
    character: Option<CharacterSummary>,
    messages: Vec<StoredMessage>,
}

#[derive(Deserialize)]
struct SendRequest {
    conversation_id: ConversationId,
    user_id: String,
    message: String,
}

#[derive(Serialize)]
struct SendResponse {
    user_message: StoredMessage,
    ai_message: StoredMessage,
    character: CharacterSummary,
    fallback: bool,
}

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<String>,
}

fn require_user(user_id: &str) -> Result<(), Error> {
    if user_id.trim().is_empty() {
        return Err(Error::Validation("user_id is required".into()));
    }
    Ok(())
}

// ── Characters ────────────────────────────────────────────────────────────

async fn list_characters_handler(
    State(state): State<SharedState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<Envelope<Vec<Character>>>> {
    let category = query
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::parse::<CharacterCategory>)
        .transpose()?;
    let characters = state.characters.list_characters(category).await?;
    Ok(ok(characters))
}

async fn get_character_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Character>>> {
    Ok(ok(state.character(&id).await?))
}

// ── Conversations ─────────────────────────────────────────────────────────

async fn create_conversation_handler(
    State(state): State<SharedState>,
    Json(req): Json<CreateConversationRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<Conversation>>)> {
    require_user(&req.user_id)?;
    let character = state.character(&req.character_id).await?;
    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("与{}的对话", character.name));

    let conversation = state
        .conversations
        .create_conversation(NewConversation {
            user_id: req.user_id,
            character_id: character.id.clone(),
            title,
        })
        .await?;

    info!(
        conversation_id = %conversation.id,
        character = %character.name,
        "Conversation created"
    );
    Ok((StatusCode::CREATED, ok(conversation)))
}

async fn list_conversations_handler(
    State(state): State<SharedState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Envelope<Vec<ConversationSummary>>>> {
    require_user(&query.user_id)?;
    let conversations = state.conversations.list_conversations(&query.user_id).await?;

    let mut summaries = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let character_name = state
            .characters
            .get_character(&conversation.character_id)
            .await?
            .map_or_else(|| conversation.character_id.clone(), |c| c.name);
        let message_count = state.messages.count_messages(&conversation.id).await?;
        summaries.push(ConversationSummary {
            conversation,
            character_name,
            message_count,
        });
    }
    Ok(ok(summaries))
}

async fn get_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Envelope<ConversationDetail>>> {
    require_user(&query.user_id)?;
    let conversation = state
        .owned_conversation(&ConversationId::from(id), &query.user_id)
        .await?;
    let character = state
        .characters
        .get_character(&conversation.character_id)
        .await?
        .as_ref()
        .map(CharacterSummary::from);
    let messages = state.messages.list_messages(&conversation.id).await?;

    Ok(ok(ConversationDetail {
        conversation,
        character,
        messages,
    }))
}

async fn delete_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Envelope<Value>>> {
    require_user(&query.user_id)?;
    let id = ConversationId::from(id);
    state.owned_conversation(&id, &query.user_id).await?;

    state.conversations.delete_conversation(&id).await?;
    state.orchestrator.clear_context(&id);
    info!(conversation_id = %id, "Conversation deleted");

    Ok(ok(json!({ "id": id, "deleted": true })))
}

// ── Chat ──────────────────────────────────────────────────────────────────

async fn send_handler(
    State(state): State<SharedState>,
    Json(req): Json<SendRequest>,
) -> ApiResult<Json<Envelope<SendResponse>>> {
    require_user(&req.user_id)?;
    if req.message.trim().is_empty() {
        return Err(Error::Validation("message must not be empty".into()).into());
    }
    let max = state.server.max_message_chars;
    if req.message.chars().count() > max {
        return Err(Error::Validation(format!("message too long (max {max} characters)")).into());
    }

    let permit = state.send_locks.acquire(&req.conversation_id);
    let result = {
        let _guard = permit.lock().await;
        deliver(&state, &req).await
    };
    drop(permit);

    Ok(ok(result?))
}

/// Persist the user message, get the reply, persist it, touch the conversation.
async fn deliver(state: &AppState, req: &SendRequest) -> Result<SendResponse, Error> {
    let conversation = state
        .owned_conversation(&req.conversation_id, &req.user_id)
        .await?;
    let character = state.character(&conversation.character_id).await?;

    let user_message = state
        .messages
        .save_message(&conversation.id, MessageKind::User, &req.message, Utc::now())
        .await?;

    let reply = state
        .orchestrator
        .respond(&character, &conversation.id, &req.message)
        .await;

    let ai_message = state
        .messages
        .save_message(&conversation.id, MessageKind::Ai, &reply.text, Utc::now())
        .await?;
    state
        .conversations
        .touch_conversation(&conversation.id, &reply.text)
        .await?;

    Ok(SendResponse {
        user_message,
        ai_message,
        character: CharacterSummary::from(&character),
        fallback: reply.fallback,
    })
}

// ── Providers ─────────────────────────────────────────────────────────────

async fn models_handler(State(state): State<SharedState>) -> Json<Envelope<ModelsResponse>> {
    let models = state
        .gateway
        .list_models()
        .await
        .unwrap_or_else(|_| state.gateway.configured_models());
    ok(ModelsResponse { models })
}

async fn providers_handler(State(state): State<SharedState>) -> Json<Envelope<Vec<ProviderHealth>>> {
    ok(state.gateway.health().await)
}
