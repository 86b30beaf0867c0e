pub mod characters;
pub mod chat;
pub mod doctor;
pub mod init;
pub mod serve;

use chatwithyou_config::AppConfig;

/// Load the config file with environment overrides applied.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}
