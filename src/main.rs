use clap::Parser;
use tracing_subscriber::EnvFilter;

use coleta_api::cli::{self, Cli};
use coleta_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coleta_api=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Starting Coleta API in {:?} mode", config.environment);

    cli::run(Cli::parse(), config).await
}
