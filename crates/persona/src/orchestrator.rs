//! Chat orchestrator: one send through context, prompt, gateway and
//! response processing, with canned lines when the gateway gives up.
//!
//! ```text
//! Received → ContextLoaded → PromptBuilt → AwaitingCompletion
//!          → Completed | Fallback → ContextUpdated → Returned
//! ```
//!
//! Gateway failures never reach the caller. Sends on the same conversation
//! must be serialized by the caller so turns land in send order.

use crate::context::ContextStore;
use crate::fallback::FallbackLines;
use crate::prompt::PromptBuilder;
use crate::response::ResponseProcessor;
use chatwithyou_config::{AppConfig, GenerationConfig};
use chatwithyou_core::character::Character;
use chatwithyou_core::error::ProviderError;
use chatwithyou_core::message::{ConversationId, Role};
use chatwithyou_core::provider::{Provider, ProviderRequest};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Sampling parameters attached to every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(g: &GenerationConfig) -> Self {
        Self {
            temperature: g.temperature,
            max_tokens: g.max_tokens,
            top_p: g.top_p,
            frequency_penalty: g.frequency_penalty,
            presence_penalty: g.presence_penalty,
        }
    }
}

/// Pipeline stages of a single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    ContextLoaded,
    PromptBuilt,
    AwaitingCompletion,
    Completed,
    Fallback,
    ContextUpdated,
}

/// What a send produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    /// Final assistant text, never empty.
    pub text: String,
    /// True when the text is a canned line.
    pub fallback: bool,
    /// Result of the advisory quality check; always true for canned lines.
    pub quality_ok: bool,
    /// Model that answered, when a provider did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Context statistics for one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextStats {
    pub message_count: usize,
}

pub struct ChatOrchestrator {
    gateway: Arc<dyn Provider>,
    context: Arc<ContextStore>,
    prompts: PromptBuilder,
    params: GenerationParams,
    fallback: FallbackLines,
}

impl ChatOrchestrator {
    pub fn new(gateway: Arc<dyn Provider>, context: Arc<ContextStore>) -> Self {
        Self {
            gateway,
            context,
            prompts: PromptBuilder::default(),
            params: GenerationParams::default(),
            fallback: FallbackLines,
        }
    }

    /// Wire an orchestrator with the generation and context settings of `config`.
    pub fn from_config(config: &AppConfig, gateway: Arc<dyn Provider>, context: Arc<ContextStore>) -> Self {
        Self::new(gateway, context)
            .with_params(GenerationParams::from(&config.generation))
            .with_prompt_builder(PromptBuilder::new(config.context.history_window))
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn context(&self) -> &Arc<ContextStore> {
        &self.context
    }

    /// Produce the character's reply to `user_message` and record both turns.
    pub async fn respond(
        &self,
        character: &Character,
        conversation_id: &ConversationId,
        user_message: &str,
    ) -> ChatReply {
        let history = self
            .context
            .recent_turns(conversation_id, self.prompts.history_window());
        self.trace(conversation_id, Stage::ContextLoaded);

        let assembly = self.prompts.build(character, &history, user_message);
        self.trace(conversation_id, Stage::PromptBuilt);

        let request = ProviderRequest {
            model: String::new(),
            messages: assembly.messages,
            temperature: self.params.temperature,
            max_tokens: Some(self.params.max_tokens),
            top_p: self.params.top_p,
            frequency_penalty: self.params.frequency_penalty,
            presence_penalty: self.params.presence_penalty,
        };

        self.trace(conversation_id, Stage::AwaitingCompletion);
        let reply = match self.complete(character, request).await {
            Ok(reply) => {
                self.trace(conversation_id, Stage::Completed);
                reply
            }
            Err(e) => {
                error!(
                    conversation_id = %conversation_id,
                    character = %character.name,
                    kind = ?e.kind(),
                    error = %e,
                    "All completion providers failed, using fallback line"
                );
                self.trace(conversation_id, Stage::Fallback);
                ChatReply {
                    text: self.fallback.pick(&character.name).to_string(),
                    fallback: true,
                    quality_ok: true,
                    model: None,
                }
            }
        };

        self.context.append(conversation_id, Role::User, user_message);
        self.context.append(conversation_id, Role::Assistant, reply.text.clone());
        self.trace(conversation_id, Stage::ContextUpdated);

        info!(
            conversation_id = %conversation_id,
            character = %character.name,
            fallback = reply.fallback,
            chars = reply.text.chars().count(),
            "Reply ready"
        );
        reply
    }

    /// Call the gateway, then clean and check the text.
    async fn complete(
        &self,
        character: &Character,
        request: ProviderRequest,
    ) -> Result<ChatReply, ProviderError> {
        let response = self.gateway.complete(request).await?;

        let text = ResponseProcessor::clean(&response.content, &character.name);
        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "Reply was empty after cleaning".into(),
            ));
        }

        let quality_ok = ResponseProcessor::validate(&text, character);
        if !quality_ok {
            warn!(
                character = %character.name,
                reply = %text,
                "Low quality response"
            );
        }

        Ok(ChatReply {
            text,
            fallback: false,
            quality_ok,
            model: (!response.model.is_empty()).then_some(response.model),
        })
    }

    /// Forget a conversation's context.
    pub fn clear_context(&self, conversation_id: &ConversationId) {
        self.context.clear(conversation_id);
    }

    pub fn context_stats(&self, conversation_id: &ConversationId) -> ContextStats {
        ContextStats {
            message_count: self.context.turn_count(conversation_id),
        }
    }

    fn trace(&self, conversation_id: &ConversationId, stage: Stage) {
        debug!(conversation_id = %conversation_id, stage = ?stage, "Send stage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatwithyou_core::character::CharacterCategory;
    use chatwithyou_core::message::ChatMessage;
    use chatwithyou_core::provider::ProviderResponse;
    use std::sync::Mutex;

    /// Replies with a fixed text and records every request it sees.
    struct ScriptedProvider {
        reply: String,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn last_messages(&self) -> Vec<ChatMessage> {
            self.requests
                .lock()
                .unwrap()
                .last()
                .map(|r| r.messages.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            Ok(ProviderResponse {
                content: self.reply.clone(),
                model: "scripted-model".into(),
                usage: None,
            })
        }
    }

    struct DownProvider;

    #[async_trait]
    impl Provider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            Err(ProviderError::ServerError {
                status_code: 503,
                message: "unavailable".into(),
            })
        }
    }

    fn character(name: &str) -> Character {
        Character {
            id: "c".into(),
            name: name.into(),
            avatar: None,
            background: "背景".into(),
            personality: vec!["睿智".into()],
            speaking_style: "温和".into(),
            quotes: vec![],
            category: CharacterCategory::Historical,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn completed_reply_is_cleaned_and_recorded() {
        let provider = Arc::new(ScriptedProvider::new("孔子：作为AI，学而时习之，不亦说乎？"));
        let context = Arc::new(ContextStore::default());
        let orch = ChatOrchestrator::new(provider.clone(), context.clone());
        let conv = ConversationId::from("c-1");

        let reply = orch.respond(&character("孔子"), &conv, "怎么学习？").await;
        assert_eq!(reply.text, "学而时习之，不亦说乎？");
        assert!(!reply.fallback);
        assert_eq!(reply.model.as_deref(), Some("scripted-model"));

        let turns = context.recent_turns(&conv, 6);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "怎么学习？");
        assert_eq!(turns[1].content, "学而时习之，不亦说乎？");
    }

    #[tokio::test]
    async fn history_flows_into_the_next_prompt() {
        let provider = Arc::new(ScriptedProvider::new("好好读书，天天向上吧。"));
        let orch = ChatOrchestrator::new(provider.clone(), Arc::new(ContextStore::default()));
        let conv = ConversationId::from("c-2");
        let c = character("孔子");

        orch.respond(&c, &conv, "第一问").await;
        orch.respond(&c, &conv, "第二问").await;

        let messages = provider.last_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("用户：第一问"));
        assert_eq!(messages[1].content, "第一问");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].content, "第二问");
    }

    #[tokio::test]
    async fn total_failure_uses_canned_line_and_still_records_turns() {
        let context = Arc::new(ContextStore::default());
        let orch = ChatOrchestrator::new(Arc::new(DownProvider), context.clone());
        let conv = ConversationId::from("c-3");

        let reply = orch.respond(&character("鲁迅"), &conv, "你好").await;
        assert!(reply.fallback);
        assert!(!reply.text.is_empty());
        assert!(FallbackLines.lines_for("鲁迅").contains(&reply.text.as_str()));

        let turns = context.recent_turns(&conv, 6);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, reply.text);
        assert_eq!(orch.context_stats(&conv).message_count, 2);
    }

    #[tokio::test]
    async fn reply_that_cleans_to_nothing_falls_back() {
        let orch = ChatOrchestrator::new(
            Arc::new(ScriptedProvider::new("  作为AI  ")),
            Arc::new(ContextStore::default()),
        );
        let reply = orch
            .respond(&character("无名氏"), &ConversationId::from("c-4"), "hi")
            .await;
        assert!(reply.fallback);
        assert!(FallbackLines.lines_for("无名氏").contains(&reply.text.as_str()));
    }

    #[tokio::test]
    async fn low_quality_reply_is_still_returned() {
        let orch = ChatOrchestrator::new(
            Arc::new(ScriptedProvider::new("嗯")),
            Arc::new(ContextStore::default()),
        );
        let reply = orch
            .respond(&character("孔子"), &ConversationId::from("c-5"), "hi")
            .await;
        assert_eq!(reply.text, "嗯");
        assert!(!reply.quality_ok);
        assert!(!reply.fallback);
    }

    #[tokio::test]
    async fn generation_params_reach_the_request() {
        let provider = Arc::new(ScriptedProvider::new("学而时习之，不亦说乎？"));
        let orch = ChatOrchestrator::new(provider.clone(), Arc::new(ContextStore::default()))
            .with_params(GenerationParams {
                temperature: 0.5,
                max_tokens: 120,
                top_p: Some(0.9),
                frequency_penalty: Some(0.3),
                presence_penalty: None,
            });
        orch.respond(&character("孔子"), &ConversationId::from("c-6"), "hi")
            .await;

        let requests = provider.requests.lock().unwrap();
        let req = &requests[0];
        assert_eq!(req.max_tokens, Some(120));
        assert_eq!(req.top_p, Some(0.9));
        assert!(req.presence_penalty.is_none());
    }

    #[tokio::test]
    async fn clear_context_resets_stats() {
        let orch = ChatOrchestrator::new(Arc::new(DownProvider), Arc::new(ContextStore::default()));
        let conv = ConversationId::from("c-7");
        orch.respond(&character("孔子"), &conv, "hi").await;
        orch.clear_context(&conv);
        orch.clear_context(&conv);
        assert_eq!(orch.context_stats(&conv).message_count, 0);
    }
}
