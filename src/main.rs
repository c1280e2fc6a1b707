//! Novacast - consensus price forecasting service
//!
//! # Usage
//! ```sh
//! novacast                      # same as `novacast serve`
//! novacast status
//! novacast predict --symbol AAPL --timeframe 7d --csv bars.csv
//! ```
//!
//! # Environment Variables
//! - `MODEL_PATH` - Directory holding the model artifacts (default: ./models)
//! - `API_KEY` - Shared secret for the `X-API-Key` header
//! - `PORT` / `BIND_ADDRESS` - Listen address (default: 0.0.0.0:8000)
//! - `METRICS_ENABLED` - Expose `/metrics` (default: true)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use novacast::application::forecast_service::{ForecastService, PredictRequest};
use novacast::config::Config;
use novacast::domain::market::timeframe::Timeframe;
use novacast::infrastructure::bars_csv;
use novacast::infrastructure::ml::FileModelLoader;
use novacast::infrastructure::observability::Metrics;
use novacast::interfaces::http::{self, AppState};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Load the models and print their status as JSON
    Status,
    /// Predict offline from a CSV of historical bars
    Predict {
        /// Instrument symbol echoed in the response
        #[arg(short, long)]
        symbol: String,

        /// Forecast horizon (1d, 7d or 30d)
        #[arg(short, long, default_value = "1d")]
        timeframe: String,

        /// CSV file with a `close` (or `c`) column
        #[arg(long)]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!(
        "Novacast {} starting, models from {:?}",
        env!("CARGO_PKG_VERSION"),
        config.models.model_path
    );

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Status => {
            let service = build_service(&config);
            println!("{}", serde_json::to_string_pretty(&service.status())?);
            Ok(())
        }
        Commands::Predict {
            symbol,
            timeframe,
            csv,
        } => {
            let timeframe = Timeframe::from_str(&timeframe)?;
            let bars = bars_csv::load_bars(&csv)?;
            info!("Read {} bars from {:?}", bars.len(), csv);

            let service = build_service(&config);
            let response = service
                .predict(&PredictRequest {
                    symbol,
                    timeframe,
                    historical_data: Some(bars),
                })
                .context("Prediction failed")?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

fn build_service(config: &Config) -> ForecastService {
    let service = ForecastService::load(config.model_sources(), Arc::new(FileModelLoader));

    if !config.observability.metrics_enabled {
        info!("Metrics disabled.");
        return service;
    }

    match Metrics::new() {
        Ok(metrics) => service.with_metrics(metrics),
        Err(e) => {
            warn!("Failed to register metrics, continuing without: {}", e);
            service
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let sources = config.model_sources();
    let service = tokio::task::spawn_blocking({
        let config = config.clone();
        move || build_service(&config)
    })
    .await?;

    let status = service.status();
    let loaded = sources
        .iter()
        .filter(|s| status.get(s.role).loaded)
        .count();
    info!("{}/{} models loaded", loaded, sources.len());

    let state = Arc::new(AppState::new(
        Arc::new(service),
        config.server.api_key.clone(),
    ));
    http::serve(state, &config.server.socket_address()).await
}
