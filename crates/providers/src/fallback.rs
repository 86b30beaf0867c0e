//! Completion gateway: an ordered provider chain with per-provider timeouts.
//!
//! Each provider is tried once, primary entries first. The first success
//! wins; when every entry fails the last classified error is returned.

use async_trait::async_trait;
use chatwithyou_core::error::ProviderError;
use chatwithyou_core::provider::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends a prompt through the configured providers until one answers.
pub struct CompletionGateway {
    name: String,
    chain: Vec<GatewayEntry>,
    /// Number of primary entries at the head of `chain`.
    primaries: usize,
}

/// A single entry in the provider chain.
struct GatewayEntry {
    provider: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
}

/// Reachability of one chain entry.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub name: String,
    pub model: String,
    pub primary: bool,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompletionGateway {
    /// Create a gateway with no providers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
            primaries: 0,
        }
    }

    /// Append a secondary provider with a custom timeout.
    pub fn add(
        mut self,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        self.chain.push(GatewayEntry {
            provider,
            model: model.into(),
            timeout,
        });
        self
    }

    /// Add a primary provider; primaries run before every secondary, in insertion order.
    pub fn add_primary(
        mut self,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        self.chain.insert(
            self.primaries,
            GatewayEntry {
                provider,
                model: model.into(),
                timeout,
            },
        );
        self.primaries += 1;
        self
    }

    /// Append a secondary provider with the default timeout (30s).
    pub fn add_default(self, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        self.add(provider, model, DEFAULT_TIMEOUT)
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Provider names in attempt order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.chain.iter().map(|e| e.provider.name()).collect()
    }

    /// Configured model ids in attempt order.
    pub fn configured_models(&self) -> Vec<String> {
        let mut models: Vec<String> = Vec::new();
        for entry in &self.chain {
            if !models.contains(&entry.model) {
                models.push(entry.model.clone());
            }
        }
        models
    }

    /// Probe every provider in the chain.
    pub async fn health(&self) -> Vec<ProviderHealth> {
        let mut report = Vec::with_capacity(self.chain.len());
        for (i, entry) in self.chain.iter().enumerate() {
            let probe = tokio::time::timeout(entry.timeout, entry.provider.health_check()).await;
            let (healthy, error) = match probe {
                Ok(Ok(ok)) => (ok, None),
                Ok(Err(e)) => (false, Some(e.to_string())),
                Err(_) => (false, Some("health check timed out".to_string())),
            };
            report.push(ProviderHealth {
                name: entry.provider.name().to_string(),
                model: entry.model.clone(),
                primary: i < self.primaries,
                healthy,
                error,
            });
        }
        report
    }
}

#[async_trait]
impl Provider for CompletionGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut last_error = ProviderError::NotConfigured("No providers in gateway chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let provider_name = entry.provider.name().to_string();

            info!(
                provider = %provider_name,
                model = %entry.model,
                attempt = i + 1,
                total = self.chain.len(),
                "Gateway: trying provider"
            );

            let mut attempt = request.clone();
            attempt.model = entry.model.clone();

            match tokio::time::timeout(entry.timeout, entry.provider.complete(attempt)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    warn!(
                        provider = %provider_name,
                        kind = ?e.kind(),
                        error = %e,
                        "Gateway: provider failed, trying next"
                    );
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        provider = %provider_name,
                        timeout_secs = entry.timeout.as_secs_f32(),
                        "Gateway: provider timed out, trying next"
                    );
                    last_error = ProviderError::Timeout(format!(
                        "Provider '{}' timed out after {:?}",
                        provider_name, entry.timeout
                    ));
                }
            }
        }

        Err(last_error)
    }

    /// Union of every provider's models; the configured ids when none answer.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let mut all_models: Vec<String> = Vec::new();
        for entry in &self.chain {
            match tokio::time::timeout(entry.timeout, entry.provider.list_models()).await {
                Ok(Ok(models)) => {
                    for m in models {
                        if !all_models.contains(&m) {
                            all_models.push(m);
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!(provider = %entry.provider.name(), error = %e, "Model listing failed");
                }
                Err(_) => {
                    warn!(provider = %entry.provider.name(), "Model listing timed out");
                }
            }
        }
        if all_models.is_empty() {
            all_models = self.configured_models();
        }
        Ok(all_models)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(self.health().await.iter().any(|h| h.healthy))
    }
}
