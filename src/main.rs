//! Agro Recommend - Main Entry Point
//!
//! Trains the recommendation models from a dataset and serves them over
//! HTTP, or runs a one-off training pass to report held-out metrics.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use agro_recommend::dataset;
use agro_recommend::server::{run_server, ServerConfig};
use agro_recommend::services::{CropService, FertilizerService, NutrientService};

#[derive(Parser)]
#[command(name = "agro-recommend", about = "Agronomic recommendation services", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train all models and serve predictions over HTTP
    Serve {
        /// Bind host (overrides API_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides API_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Training dataset CSV (overrides DATASET_PATH)
        #[arg(long)]
        data: Option<String>,
    },
    /// Train all models once and report held-out metrics
    Train {
        /// Training dataset CSV
        #[arg(long)]
        data: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agro_recommend=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port, data } => {
            let mut config = ServerConfig::default();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data) = data {
                config.dataset_path = data;
            }
            run_server(config).await?;
        }
        Commands::Train { data } => {
            let df = dataset::load_csv(&data)?;
            info!(rows = df.height(), columns = df.width(), "Dataset loaded");

            let crop = CropService::fit(&df)?;
            info!(test_accuracy = crop.test_accuracy(), "Crop model trained");

            let nutrients = NutrientService::fit(&df)?;
            let mse = nutrients.test_mse();
            info!(
                nitrogen_mse = mse[0],
                phosphorus_mse = mse[1],
                potassium_mse = mse[2],
                "Nutrient model trained"
            );

            let fertilizer = FertilizerService::fit(&df)?;
            info!(test_accuracy = fertilizer.test_accuracy(), "Fertilizer model trained");
        }
    }

    Ok(())
}
