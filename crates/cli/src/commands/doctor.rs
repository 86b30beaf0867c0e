//! `chatwithyou doctor`: diagnose configuration and provider health.

use chatwithyou_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("ChatWithYou Doctor");
    println!("==================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ok   Config file: {}", config_path.display());
    } else {
        println!("  --   No config file, using defaults (run `chatwithyou init`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ok   Config valid");
            config
        }
        Err(e) => {
            println!("  FAIL Config invalid: {e}");
            println!("\n  1 issue found.");
            return Ok(());
        }
    };

    let gateway = chatwithyou_providers::build_from_config(&config);
    if gateway.is_empty() {
        println!("  FAIL No provider has an API key; every reply will be a fallback line");
        issues += 1;
    }

    for report in gateway.health().await {
        let role = if report.primary { "primary" } else { "secondary" };
        if report.healthy {
            println!("  ok   {} ({role}, {})", report.name, report.model);
        } else {
            println!(
                "  FAIL {} ({role}, {}): {}",
                report.name,
                report.model,
                report.error.as_deref().unwrap_or("unreachable")
            );
            issues += 1;
        }
    }

    match chatwithyou_store::CharacterCatalogue::seeded() {
        Ok(_) => println!("  ok   Character catalogue loaded"),
        Err(e) => {
            println!("  FAIL Character catalogue: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
