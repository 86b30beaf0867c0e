//! Store implementations for ChatWithYou.
//!
//! - [`CharacterCatalogue`]: the seeded, read-only character set
//! - [`InMemoryStore`]: conversations and messages in process memory

pub mod catalogue;
pub mod in_memory;

pub use catalogue::CharacterCatalogue;
pub use in_memory::InMemoryStore;
