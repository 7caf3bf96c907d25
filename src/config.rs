use serde::Deserialize;
use std::collections::HashSet;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub upload_directory: String,
    pub static_directory: String,
    pub allowed_extensions: HashSet<String>,
    pub web_port: u16,
    pub log_level: String,
    pub oracle: OracleConfig,
}

/// Connection settings for the hosted vision model.
#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: String,
}

impl AppConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", config_dir)))
            .add_source(File::with_name(&format!("{}/{}", config_dir, env)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            .add_source(Environment::with_prefix("FACE_SIMILARITY").separator("__"))
            .set_override_option("oracle.api_key", std::env::var("GEMINI_API_KEY").ok())?
            .build()?;

        s.try_deserialize()
    }
}
