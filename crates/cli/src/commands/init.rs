//! `chatwithyou init`: write a starter config file.

use chatwithyou_config::AppConfig;

pub fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_path();

    println!("ChatWithYou Setup");
    println!("=================\n");

    if let Some(dir) = config_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("  Created config directory: {}", dir.display());
        }
    }

    if config_path.exists() && !force {
        println!("  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or re-run with --force to overwrite.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Wrote config: {}", config_path.display());
    println!("\n  Next steps:");
    println!("   1. Add an api_key under [[providers]], or export OPENAI_API_KEY / QINIU_API_KEY");
    println!("   2. Run: chatwithyou chat --character confucius");
    println!("   3. Or serve the API: chatwithyou serve\n");

    Ok(())
}
