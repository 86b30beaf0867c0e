//! # ChatWithYou Persona
//!
//! The chat core: turns a character, its recent conversation and a new user
//! message into an in-character reply.
//!
//! - [`PromptBuilder`] renders the persona prompt and message list
//! - [`ContextStore`] keeps a bounded window of turns per conversation
//! - [`ResponseProcessor`] cleans and checks generated text
//! - [`FallbackLines`] supplies canned lines when every provider fails
//! - [`ChatOrchestrator`] runs the whole send

pub mod context;
pub mod fallback;
pub mod orchestrator;
pub mod prompt;
pub mod response;

pub use context::ContextStore;
pub use fallback::FallbackLines;
pub use orchestrator::{ChatOrchestrator, ChatReply, ContextStats, GenerationParams};
pub use prompt::{PromptAssembly, PromptBuilder};
pub use response::ResponseProcessor;
