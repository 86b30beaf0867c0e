//! Character (persona) definitions.
//!
//! Characters are owned by the external store and are read-only to the chat
//! core. Personality is never empty and the category is fixed at creation.

use serde::{Deserialize, Serialize};

/// Identifier of a character in the catalogue.
pub type CharacterId = String;

/// The broad kind of persona, which selects category-specific prompt guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CharacterCategory {
    Historical,
    Fictional,
    Celebrity,
    Custom,
}

impl CharacterCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Historical => "HISTORICAL",
            Self::Fictional => "FICTIONAL",
            Self::Celebrity => "CELEBRITY",
            Self::Custom => "CUSTOM",
        }
    }
}

impl std::fmt::Display for CharacterCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CharacterCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HISTORICAL" => Ok(Self::Historical),
            "FICTIONAL" => Ok(Self::Fictional),
            "CELEBRITY" => Ok(Self::Celebrity),
            "CUSTOM" => Ok(Self::Custom),
            other => Err(crate::Error::Validation(format!(
                "unknown character category '{other}'"
            ))),
        }
    }
}

/// A persona the service impersonates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub background: String,
    /// Ordered personality traits (non-empty).
    pub personality: Vec<String>,
    pub speaking_style: String,
    /// Ordered quote bank.
    #[serde(default)]
    pub quotes: Vec<String>,
    pub category: CharacterCategory,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Character {
    /// Check the invariants a character must satisfy before the core uses it.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::Validation(format!(
                "character '{}' has an empty name",
                self.id
            )));
        }
        if self.personality.iter().all(|t| t.trim().is_empty()) {
            return Err(crate::Error::Validation(format!(
                "character '{}' must have at least one personality trait",
                self.name
            )));
        }
        Ok(())
    }
}
