//! `chatwithyou chat`: one-shot or interactive chat with a character.

use std::io::Write;
use std::sync::Arc;

use chatwithyou_core::{Character, ConversationId};
use chatwithyou_persona::{ChatOrchestrator, ContextStore};
use chatwithyou_store::CharacterCatalogue;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(character: &str, message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let catalogue = CharacterCatalogue::seeded()?;
    let character = find_character(&catalogue, character)?;

    let gateway = Arc::new(chatwithyou_providers::build_from_config(&config));
    if gateway.is_empty() {
        eprintln!("  No provider has an API key; replies will be canned fallback lines.");
        eprintln!("  Set OPENAI_API_KEY or QINIU_API_KEY, or edit {}", chatwithyou_config::AppConfig::config_path().display());
    }
    let context = Arc::new(ContextStore::new(
        config.context.max_turns,
        config.context.max_conversations,
    ));
    let orchestrator = ChatOrchestrator::from_config(&config, gateway, context);
    let conversation_id = ConversationId::new();

    if let Some(msg) = message {
        let reply = orchestrator.respond(&character, &conversation_id, &msg).await;
        println!("{}", reply.text);
        return Ok(());
    }

    println!();
    println!("  ChatWithYou: {} ({})", character.name, character.category);
    println!("  {}", character.background);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        let reply = orchestrator.respond(&character, &conversation_id, line).await;
        eprint!("\r     \r");
        println!();
        for text_line in reply.text.lines() {
            println!("  {} > {text_line}", character.name);
        }
        if reply.fallback {
            eprintln!("  [fallback line, providers unavailable]");
        }
        println!();
    }

    println!();
    println!("  再会！");
    println!();
    Ok(())
}

fn find_character(
    catalogue: &CharacterCatalogue,
    id_or_name: &str,
) -> Result<Character, Box<dyn std::error::Error>> {
    catalogue.resolve(id_or_name).cloned().ok_or_else(|| {
        format!("Unknown character '{id_or_name}'. Run `chatwithyou characters` to see the list.").into()
    })
}
