//! Agro Recommendation Server
//!
//! HTTP serving layer for the three fitted recommendation services.
//! All models are trained once at startup from the configured dataset;
//! after that the serving state is immutable and lock-free.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::dataset;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dataset_path: String,
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            dataset_path: std::env::var("DATASET_PATH")
                .unwrap_or_else(|_| "./data/crop_recommendation.csv".to_string()),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|s| !s.is_empty()),
        }
    }
}

/// Start the server with the given configuration. Fits all three models
/// before binding; a training failure means the process never serves.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    info!(dataset = %config.dataset_path, "Loading training dataset");
    let df = dataset::load_csv(Path::new(&config.dataset_path))?;
    info!(rows = df.height(), columns = df.width(), "Dataset loaded");

    let state = Arc::new(AppState::fit(&df)?);
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        host = %config.host,
        port = config.port,
        pid = std::process::id(),
        "Server listening and ready to accept connections"
    );
    info!(url = %format!("http://{}/api/health", addr), "Health endpoint available");

    let shutdown_signal = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, stopping server gracefully");
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
    }
}
