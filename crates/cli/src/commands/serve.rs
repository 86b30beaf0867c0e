//! `chatwithyou serve`: start the HTTP API server.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.server.port = port;
    }

    println!("ChatWithYou API");
    println!("   Listening: {}:{}", config.server.host, config.server.port);
    println!("   Auth:      {}", if config.server.api_tokens.is_empty() { "open" } else { "bearer token" });
    println!("   Providers: {}", config.usable_providers().count());

    chatwithyou_server::start(config).await?;

    Ok(())
}
