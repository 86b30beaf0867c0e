//! # ChatWithYou Core
//!
//! Domain types, traits, and error definitions for the ChatWithYou persona
//! chat service. This crate has **no framework dependencies**: it defines the
//! domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`] for upstream completion endpoints
//! - [`CharacterStore`], [`ConversationStore`], [`MessageStore`] for persistence
//!
//! Implementations live in their respective crates, so tests can substitute
//! fakes without touching global state.

pub mod character;
pub mod error;
pub mod message;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use character::{Character, CharacterCategory, CharacterId};
pub use error::{Error, FailureKind, ProviderError, Result};
pub use message::{ChatMessage, ConversationId, Role, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use store::{
    CharacterStore, Conversation, ConversationStore, ConversationSummary, MessageKind,
    MessageStore, NewConversation, StoredMessage,
};
