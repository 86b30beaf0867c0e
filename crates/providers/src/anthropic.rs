//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Reply text arrives as `content` blocks rather than `choices`

use async_trait::async_trait;
use chatwithyou_core::error::ProviderError;
use chatwithyou_core::message::{ChatMessage, Role};
use chatwithyou_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: "anthropic".into(),
            base_url: ANTHROPIC_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Register under a different provider name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url
            .into()
            .trim_end_matches('/')
            .trim_end_matches("/v1")
            .to_string();
        self
    }

    /// Split system messages out of the list.
    /// Anthropic puts the system prompt in a top-level field.
    fn extract_system(messages: &[ChatMessage]) -> (Option<String>, Vec<AnthropicMessage<'_>>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut rest = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                Role::User | Role::Assistant => rest.push(AnthropicMessage {
                    role: msg.role.as_str(),
                    content: &msg.content,
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system, rest)
    }

    fn parse_completion(body: &str) -> std::result::Result<ProviderResponse, ProviderError> {
        let resp: AnthropicResponse = serde_json::from_str(body).map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        let text: Vec<&str> = resp
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } if !text.trim().is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "No text block in Anthropic response".into(),
            ));
        }

        Ok(ProviderResponse {
            content: text.join("\n"),
            model: resp.model,
            usage: resp.usage.map(|u| Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let (system, messages) = Self::extract_system(&request.messages);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature.min(1.0),
        });

        if let Some(sys) = system {
            body["system"] = serde_json::json!(sys);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if status != 200 {
            warn!(provider = %self.name, status, body = %text, "Anthropic API error");
            return Err(ProviderError::from_status(status, text));
        }

        Self::parse_completion(&text)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        // No listing without an admin key; report the chat-suitable models.
        Ok(vec![
            "claude-3-5-haiku-latest".into(),
            "claude-sonnet-4-20250514".into(),
        ])
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": "claude-3-5-haiku-latest",
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 1,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        // 401 = bad key, anything else means the endpoint is reachable
        Ok(response.status().as_u16() != 401)
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: String,
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, ANTHROPIC_BASE_URL);
    }

    #[test]
    fn base_url_accepts_versioned_form() {
        let provider = AnthropicProvider::new("k").with_base_url("https://proxy.local/v1/");
        assert_eq!(provider.base_url, "https://proxy.local");
    }

    #[test]
    fn system_extraction() {
        let messages = vec![
            ChatMessage::system("你现在要扮演鲁迅。"),
            ChatMessage::user("你好"),
            ChatMessage::assistant("嗯。"),
        ];
        let (system, rest) = AnthropicProvider::extract_system(&messages);
        assert_eq!(system.as_deref(), Some("你现在要扮演鲁迅。"));
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].role, "user");
        assert_eq!(rest[1].role, "assistant");
    }

    #[test]
    fn parse_text_response() {
        let pr = AnthropicProvider::parse_completion(
            r#"{
                "id": "msg_01",
                "model": "claude-3-5-haiku-latest",
                "content": [{"type": "text", "text": "横眉冷对千夫指。"}],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();
        assert_eq!(pr.content, "横眉冷对千夫指。");
        assert_eq!(pr.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn response_without_text_is_malformed() {
        let err = AnthropicProvider::parse_completion(
            r#"{"model":"m","content":[{"type":"thinking","thinking":"..."}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));

        let err = AnthropicProvider::parse_completion(
            r#"{"model":"m","content":[{"type":"text","text":"  "}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn list_models_returns_known_models() {
        let provider = AnthropicProvider::new("sk-test");
        let models = provider.list_models().await.unwrap();
        assert!(models.iter().all(|m| m.contains("claude")));
    }
}
