use anyhow::{bail, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use image_studio::config::Config;
use image_studio::gemini::GeminiClient;
use image_studio::server;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load_or_default();

    let Some(api_key) = config.resolved_api_key() else {
        bail!(
            "No Gemini API key configured. Set GEMINI_API_KEY or add \"api_key\" to {}",
            Config::config_path()?.display()
        );
    };

    let client = GeminiClient::new(&api_key, &config.model)?;

    info!("image-studio starting, model={}", config.model);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    server::serve(addr, Arc::new(client)).await
}
