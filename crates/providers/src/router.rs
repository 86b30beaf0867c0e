//! Builds the completion gateway from configuration.

use crate::anthropic::{ANTHROPIC_BASE_URL, AnthropicProvider};
use crate::fallback::CompletionGateway;
use crate::openai_compat::OpenAiCompatProvider;
use chatwithyou_config::{AppConfig, ProviderConfig, ProviderKind};
use chatwithyou_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Build one provider from its config entry.
pub fn build_provider(config: &ProviderConfig) -> Arc<dyn Provider> {
    let api_key = config.api_key.clone().unwrap_or_default();
    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.name, config.kind));

    match config.kind {
        ProviderKind::Anthropic => Arc::new(
            AnthropicProvider::new(api_key)
                .with_name(&config.name)
                .with_base_url(base_url),
        ),
        ProviderKind::OpenAi => Arc::new(OpenAiCompatProvider::new(&config.name, base_url, api_key)),
    }
}

/// Build the gateway from every provider that has an API key.
///
/// Entries without a key are skipped; an empty gateway makes every send
/// fall back to canned lines.
pub fn build_from_config(config: &AppConfig) -> CompletionGateway {
    let mut gateway = CompletionGateway::new("gateway");

    for provider_config in &config.providers {
        if provider_config.api_key.is_none() {
            warn!(
                provider = %provider_config.name,
                "Skipping provider without an API key"
            );
            continue;
        }

        let provider = build_provider(provider_config);
        let timeout = Duration::from_secs(provider_config.timeout_secs.max(1));
        debug!(
            provider = %provider_config.name,
            model = %provider_config.model,
            primary = provider_config.primary,
            "Registered provider"
        );

        gateway = if provider_config.primary {
            gateway.add_primary(provider, &provider_config.model, timeout)
        } else {
            gateway.add(provider, &provider_config.model, timeout)
        };
    }

    gateway
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str, kind: ProviderKind) -> String {
    if kind == ProviderKind::Anthropic {
        return ANTHROPIC_BASE_URL.into();
    }
    match provider_name {
        "openai" => crate::openai_compat::OPENAI_BASE_URL.into(),
        "qiniu" => "https://api.qnaigc.com/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        _ => crate::openai_compat::OPENAI_BASE_URL.into(),
    }
}
