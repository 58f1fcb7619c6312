use fileserver::{Config, FileServerApi, ServerState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::load();

    if config.root_paths.is_empty() {
        tracing::warn!("No ROOT_PATHS configured, the archive will be empty");
    }
    for root in &config.root_paths {
        tracing::info!("Serving root {}", root.display());
    }

    let state = match ServerState::from_config(&config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to open watch log: {}", e);
            return;
        }
    };

    if let Err(e) = FileServerApi::new(state).serve(&config.host, config.port).await {
        tracing::error!("File server error: {}", e);
    }
}
