//! The character catalogue, seeded from `data/characters.toml`.

use async_trait::async_trait;
use chatwithyou_core::character::{Character, CharacterCategory};
use chatwithyou_core::error::{Error, Result};
use chatwithyou_core::store::CharacterStore;
use serde::Deserialize;

const SEED: &str = include_str!("../data/characters.toml");

#[derive(Deserialize)]
struct CatalogueFile {
    characters: Vec<Character>,
}

/// Read-only character catalogue held in memory.
#[derive(Debug, Clone)]
pub struct CharacterCatalogue {
    characters: Vec<Character>,
}

impl CharacterCatalogue {
    /// Build a catalogue, rejecting invalid or duplicate entries.
    pub fn new(characters: Vec<Character>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for c in &characters {
            c.validate()?;
            if !seen.insert(c.id.as_str()) {
                return Err(Error::Validation(format!("duplicate character id '{}'", c.id)));
            }
        }
        Ok(Self { characters })
    }

    /// The catalogue shipped with the service.
    pub fn seeded() -> Result<Self> {
        Self::from_toml(SEED)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CatalogueFile = toml::from_str(content)
            .map_err(|e| Error::Store(format!("invalid character catalogue: {e}")))?;
        Self::new(file.characters)
    }

    fn active(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter().filter(|c| c.is_active)
    }

    /// Resolve a character by id or exact name.
    pub fn resolve(&self, id_or_name: &str) -> Option<&Character> {
        self.active()
            .find(|c| c.id == id_or_name)
            .or_else(|| self.active().find(|c| c.name == id_or_name))
    }
}

#[async_trait]
impl CharacterStore for CharacterCatalogue {
    async fn get_character(&self, id: &str) -> Result<Option<Character>> {
        Ok(self.active().find(|c| c.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Character>> {
        Ok(self.active().find(|c| c.name == name).cloned())
    }

    async fn list_characters(&self, category: Option<CharacterCategory>) -> Result<Vec<Character>> {
        Ok(self
            .active()
            .filter(|c| category.is_none_or(|cat| c.category == cat))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_parses() {
        let catalogue = CharacterCatalogue::seeded().unwrap();
        assert_eq!(catalogue.characters.len(), 13);
        let confucius = catalogue.resolve("confucius").unwrap();
        assert_eq!(confucius.name, "孔子");
        assert_eq!(confucius.category, CharacterCategory::Historical);
        assert_eq!(confucius.personality.len(), 6);
        assert_eq!(confucius.quotes.len(), 5);
        assert!(catalogue.resolve("鲁迅").is_some());
    }

    #[tokio::test]
    async fn list_filters_by_category() {
        let catalogue = CharacterCatalogue::seeded().unwrap();
        let all = catalogue.list_characters(None).await.unwrap();
        assert_eq!(all.len(), 13);

        let celebrities = catalogue
            .list_characters(Some(CharacterCategory::Celebrity))
            .await
            .unwrap();
        assert_eq!(celebrities.len(), 2);
        assert!(celebrities.iter().all(|c| c.category == CharacterCategory::Celebrity));

        let historical = catalogue
            .list_characters(Some(CharacterCategory::Historical))
            .await
            .unwrap();
        assert_eq!(historical.len(), 6);
    }

    #[tokio::test]
    async fn inactive_characters_are_hidden() {
        let catalogue = CharacterCatalogue::from_toml(
            r#"
[[characters]]
id = "ghost"
name = "幽灵"
category = "CUSTOM"
background = "b"
personality = ["安静"]
speaking_style = "s"
is_active = false
"#,
        )
        .unwrap();
        assert!(catalogue.get_character("ghost").await.unwrap().is_none());
        assert!(catalogue.find_by_name("幽灵").await.unwrap().is_none());
        assert!(catalogue.list_characters(None).await.unwrap().is_empty());
    }

    #[test]
    fn rejects_empty_personality_and_duplicates() {
        let bad = r#"
[[characters]]
id = "x"
name = "X"
category = "CUSTOM"
background = "b"
personality = []
speaking_style = "s"
"#;
        assert!(CharacterCatalogue::from_toml(bad).is_err());

        let c = CharacterCatalogue::seeded().unwrap().characters[0].clone();
        assert!(CharacterCatalogue::new(vec![c.clone(), c]).is_err());
    }
}
