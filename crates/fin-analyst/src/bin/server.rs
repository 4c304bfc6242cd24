//! Financial analyst server binary
//!
//! Run with: cargo run -p fin-analyst --bin fin-analyst-server

use std::path::PathBuf;

use fin_analyst::{config::AppConfig, server::FinAnalystServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Optional path to a TOML config file
const CONFIG_ENV: &str = "FIN_ANALYST_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fin_analyst=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let config_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Top k: {}", config.retrieval.top_k);

    if config.llm.api_key.is_none() {
        tracing::warn!(
            "{} is not set; clients must supply a key per session before uploading",
            fin_analyst::config::API_KEY_ENV
        );
    }

    let server = FinAnalystServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/sessions                  - Start a session");
    println!("  PUT  /api/sessions/:id/credentials  - Set Gemini API key");
    println!("  POST /api/sessions/:id/documents    - Upload a financial PDF");
    println!("  POST /api/sessions/:id/ask          - Ask a question");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
