//! Completion provider implementations for ChatWithYou.
//!
//! All providers implement the `chatwithyou_core::Provider` trait.
//! [`CompletionGateway`] chains them with primary-first fallback.

pub mod anthropic;
pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use fallback::{CompletionGateway, ProviderHealth};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, build_provider};
