use anyhow::Result;
use clap::Parser;
use content_assistant::cli::{run, Cli};
use content_assistant::config::AppConfig;
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("content_assistant=info,rocket::server=off")),
        )
        .init();

    let config = AppConfig::load()?;

    info!(
        "Environment: {}",
        std::env::var("APP_ENV").unwrap_or_else(|_| "local".to_string())
    );
    info!("Database: {}", config.database_path.display());
    info!("Generation service: {}", config.generation_url);

    let cli = Cli::parse();
    run(cli, config).await
}
