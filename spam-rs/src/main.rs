//! spam-rs server and command-line tool
//!
//! ```bash
//! # Run the REST API (default)
//! spam-rs serve --config config.toml
//!
//! # Retrain from a JSON file of {"text": ..., "label": 0|1} rows
//! spam-rs train --data samples.json --replace
//!
//! # One-off classification
//! spam-rs classify "Win a free prize now!" --threshold 0.7
//! spam-rs ocr screenshot.png
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use spam_rs::api::ApiServer;
use spam_rs::config::{Config, LoggingConfig};
use spam_rs::spam::{RawTrainingRow, RetrainMode, SpamManager, TrainingSet};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "spam-rs", version)]
#[command(about = "Spam classification for text and images", long_about = None)]
struct Cli {
    /// Configuration file (TOML); `config.toml` is used when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST API server
    Serve,
    /// Retrain the model from a JSON file of labelled rows
    Train {
        /// JSON array of {"text", "label"} objects
        #[arg(short, long)]
        data: PathBuf,
        /// Replace the stored corpus instead of appending to it
        #[arg(long)]
        replace: bool,
    },
    /// Classify a piece of text
    Classify {
        text: String,
        /// Override the configured spam threshold
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Extract text from an image file
    Ocr {
        image: PathBuf,
        /// Also classify the extracted text
        #[arg(long)]
        classify: bool,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("spam_rs={level},tower_http={level}", level = logging.level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format.as_str() {
        "json" => registry.with(fmt::layer().json()).init(),
        _ => registry.with(fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await?,
        Commands::Train { data, replace } => {
            let manager = SpamManager::open(&config)?;
            let content = std::fs::read_to_string(&data)
                .with_context(|| format!("Failed to read {}", data.display()))?;
            let rows: Vec<RawTrainingRow> = serde_json::from_str(&content)
                .with_context(|| format!("Invalid training file {}", data.display()))?;

            let mode = if replace {
                RetrainMode::Replace
            } else {
                RetrainMode::Append
            };
            let report = manager.retrain(TrainingSet::from_raw_rows(rows), mode)?;

            println!("✓ Model retrained");
            println!("  Total samples: {}", report.total_samples);
            println!("  New samples:   {}", report.new_samples);
            println!("  Spam / ham:    {} / {}", report.spam_samples, report.ham_samples);
            println!("  Accuracy:      {:.3}", report.accuracy);
        }
        Commands::Classify { text, threshold } => {
            let manager = SpamManager::open(&config)?;
            let result = manager.classify_text(&text, threshold)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Ocr { image, classify } => {
            let manager = SpamManager::open(&config)?;
            let bytes = std::fs::read(&image)
                .with_context(|| format!("Failed to read {}", image.display()))?;

            if classify {
                let classification = manager.classify_image(&bytes, None)?;
                println!("{}", serde_json::to_string_pretty(&classification)?);
            } else {
                let result = manager.extractor().extract(&bytes)?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
    }

    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Starting spam-rs server");
    info!("  Listening on: {}", config.server.listen_addr);
    info!("  Model path: {}", config.classifier.model_path.display());
    info!("  Threshold: {}", config.classifier.threshold);

    let manager = Arc::new(SpamManager::open(&config)?);

    let engine = manager.extractor().engine();
    if !engine.is_available() {
        warn!(
            engine = engine.name(),
            hint = %engine.availability_hint(),
            "OCR engine unavailable, image analysis will fail"
        );
    }

    let server = ApiServer::new(manager, &config);
    server.run().await?;

    Ok(())
}
