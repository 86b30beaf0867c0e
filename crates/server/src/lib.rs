//! HTTP API for ChatWithYou.
//!
//! Exposes the character catalogue, conversation management and the chat
//! send flow over axum. Every `/v1` route answers with the envelope
//! `{ "success": true, "data": ... }`.
//!
//! Layers, outermost first: HTTP trace logging, CORS, rate limiting,
//! request body limit, and bearer authentication on `/v1`.

pub mod api;
pub mod error;
pub mod locks;
pub mod rate_limit;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::{Json, Response};
use axum::{Router, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use chatwithyou_config::{AppConfig, ServerConfig};
use chatwithyou_core::{
    Character, CharacterStore, Conversation, ConversationId, ConversationStore, Error,
    MessageStore, Result,
};
use chatwithyou_persona::{ChatOrchestrator, ContextStore};
use chatwithyou_providers::CompletionGateway;
use chatwithyou_store::{CharacterCatalogue, InMemoryStore};

use crate::error::ApiError;
use crate::locks::SendLocks;
use crate::rate_limit::{RateLimiter, rate_limit_middleware};

/// Request body cap for every route.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Shared application state.
pub struct AppState {
    pub characters: Arc<dyn CharacterStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub messages: Arc<dyn MessageStore>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub gateway: Arc<CompletionGateway>,
    pub server: ServerConfig,
    pub send_locks: SendLocks,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: &AppConfig,
        characters: Arc<dyn CharacterStore>,
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        gateway: Arc<CompletionGateway>,
    ) -> Self {
        let context = Arc::new(ContextStore::new(
            config.context.max_turns,
            config.context.max_conversations,
        ));
        let orchestrator = ChatOrchestrator::from_config(config, gateway.clone(), context);
        Self {
            characters,
            conversations,
            messages,
            orchestrator: Arc::new(orchestrator),
            gateway,
            server: config.server.clone(),
            send_locks: SendLocks::new(),
        }
    }

    /// State backed by the seeded catalogue and an in-memory store.
    pub fn in_memory(config: &AppConfig, gateway: Arc<CompletionGateway>) -> Result<Self> {
        let catalogue = Arc::new(CharacterCatalogue::seeded()?);
        let store = Arc::new(InMemoryStore::new());
        Ok(Self::new(config, catalogue, store.clone(), store, gateway))
    }

    pub(crate) async fn character(&self, id: &str) -> Result<Character> {
        self.characters
            .get_character(id)
            .await?
            .ok_or_else(|| Error::not_found("Character", id))
    }

    /// Load a conversation, rejecting callers that do not own it.
    pub(crate) async fn owned_conversation(
        &self,
        id: &ConversationId,
        user_id: &str,
    ) -> Result<Conversation> {
        let conversation = self
            .conversations
            .get_conversation(id)
            .await?
            .ok_or_else(|| Error::not_found("Conversation", id.as_str()))?;
        if !conversation.is_owned_by(user_id) {
            return Err(Error::Forbidden(
                "Conversation belongs to another user".into(),
            ));
        }
        Ok(conversation)
    }
}

/// Build the full router: `/health` plus the `/v1` API.
pub fn build_router(state: SharedState) -> Router {
    let v1 = api::v1_router(state.clone())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(std::time::Duration::from_secs(3600));

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES));

    let per_minute = state.server.rate_limit_per_minute;
    if per_minute > 0 {
        let limiter = Arc::new(RateLimiter::per_minute(per_minute));
        app = app.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    app.layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let gateway = Arc::new(chatwithyou_providers::build_from_config(&config));
    if gateway.is_empty() {
        warn!("No completion provider has an API key; every reply will be a fallback line");
    }

    let state = Arc::new(AppState::in_memory(&config, gateway.clone())?);
    let context = state.orchestrator.context().clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, providers = ?gateway.provider_names(), "ChatWithYou server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let flushed = context.flush();
    info!(conversations = flushed, "Context flushed, server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Requires `Authorization: Bearer <token>` on `/v1` when tokens are configured.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    if state.server.api_tokens.is_empty() {
        return Ok(next.run(req).await);
    }

    let authorized = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| state.server.api_tokens.iter().any(|t| t == token));

    if !authorized {
        warn!("Unauthorized request to /v1, missing or invalid bearer token");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state_with(server: ServerConfig) -> SharedState {
        let mut config = AppConfig::default();
        config.server = server;
        let gateway = Arc::new(CompletionGateway::new("empty"));
        Arc::new(AppState::in_memory(&config, gateway).unwrap())
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(state_with(ServerConfig::default()));
        let response = app.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bearer_token_required_when_configured() {
        let app = build_router(state_with(ServerConfig {
            api_tokens: vec!["secret".into()],
            ..ServerConfig::default()
        }));

        let denied = app.clone().oneshot(get("/v1/characters", None)).await.unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .clone()
            .oneshot(get("/v1/characters", Some("guess")))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .clone()
            .oneshot(get("/v1/characters", Some("secret")))
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);

        let health = app.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limit_rejects_excess_but_not_health() {
        let app = build_router(state_with(ServerConfig {
            rate_limit_per_minute: 2,
            ..ServerConfig::default()
        }));

        for _ in 0..2 {
            let ok = app.clone().oneshot(get("/v1/characters", None)).await.unwrap();
            assert_eq!(ok.status(), StatusCode::OK);
        }
        let limited = app.clone().oneshot(get("/v1/characters", None)).await.unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

        for _ in 0..5 {
            let health = app.clone().oneshot(get("/health", None)).await.unwrap();
            assert_eq!(health.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn zero_rate_limit_disables_limiting() {
        let app = build_router(state_with(ServerConfig {
            rate_limit_per_minute: 0,
            ..ServerConfig::default()
        }));
        for _ in 0..10 {
            let ok = app.clone().oneshot(get("/v1/characters", None)).await.unwrap();
            assert_eq!(ok.status(), StatusCode::OK);
        }
    }
}
