//! ChatWithYou CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a starter config file
//! - `serve`: Start the HTTP API server
//! - `chat`: Talk with a character, one-shot or interactive
//! - `characters`: List the character catalogue
//! - `doctor`: Validate config and probe providers

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "chatwithyou",
    about = "ChatWithYou: talk with historical, fictional and celebrity personas",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with a character
    Chat {
        /// Character id or name (e.g. `confucius` or `孔子`)
        #[arg(short, long)]
        character: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List available characters
    Characters {
        /// Only show one category (historical, fictional, celebrity, custom)
        #[arg(long)]
        category: Option<String>,
    },

    /// Check configuration and provider reachability
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Init { force } => commands::init::run(force)?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { character, message } => commands::chat::run(&character, message).await?,
        Commands::Characters { category } => commands::characters::run(category.as_deref()).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
