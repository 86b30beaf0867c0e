//! `chatwithyou characters`: list the catalogue.

use chatwithyou_core::{CharacterCategory, CharacterStore};
use chatwithyou_store::CharacterCatalogue;

pub async fn run(category: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let category = category.map(str::parse::<CharacterCategory>).transpose()?;
    let catalogue = CharacterCatalogue::seeded()?;
    let characters = catalogue.list_characters(category).await?;

    if characters.is_empty() {
        println!("  No characters in this category.");
        return Ok(());
    }

    println!("  {:<18} {:<12} {:<11} PERSONALITY", "ID", "NAME", "CATEGORY");
    for c in &characters {
        println!(
            "  {:<18} {:<12} {:<11} {}",
            c.id,
            c.name,
            c.category.as_str(),
            c.personality.join("、")
        );
    }
    println!("\n  {} character(s)", characters.len());

    Ok(())
}
