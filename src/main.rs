mod comparator;
mod config;
mod error;
mod normalizer;
mod oracle;
mod oracle_clients;
mod storage;
mod web_server;

use crate::comparator::Comparator;
use crate::config::AppConfig;
use crate::oracle::FaceOracle;
use crate::oracle_clients::gemini::GeminiClient;
use crate::storage::ImageStore;
use anyhow::Result;
use clap::Parser;
use log::info;
use std::sync::Arc;

/// Compares two uploaded face images with a hosted vision model.
#[derive(Parser, Debug)]
#[command(name = "face-similarity", version)]
struct Cli {
    /// Directory holding default.toml and optional per-mode overrides.
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Overrides `web_port` from the configuration.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config_dir)?;
    if let Some(port) = cli.port {
        config.web_port = port;
    }

    // Initialize env_logger based on config.log_level
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting face-similarity");
    let store = ImageStore::from_config(&config);
    info!("Storing uploads in {:?}", store.root());
    let oracle: Arc<dyn FaceOracle> = Arc::new(GeminiClient::new(&config.oracle)?);
    let comparator = Comparator::new(store.clone(), oracle);

    if let Err(e) = web_server::start_web_server(Arc::new(config), store, comparator).await {
        log::error!("Web server error: {}", e);
    }

    info!("face-similarity finished");

    Ok(())
}
