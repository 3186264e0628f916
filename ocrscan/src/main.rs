use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocrscan::config::Config;
use ocrscan::ocr::{decode_image, OcrEngine, PreprocessOptions};

#[derive(Parser)]
#[command(name = "ocrscan")]
#[command(about = "Extract Arabic and Latin text from a photo using cloud OCR")]
struct Args {
    /// Image file to scan (PNG, JPEG, ...)
    image: PathBuf,

    /// Send the image as is, without preprocessing
    #[arg(long)]
    no_preprocess: bool,

    /// Convert to pure black and white before upload
    #[arg(long)]
    binarize: bool,

    /// Longest edge in pixels after resizing
    #[arg(long)]
    max_resolution: Option<u32>,

    /// Backend in provider/model form, e.g. vision/TEXT_DETECTION
    #[arg(long)]
    model: Option<String>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocrscan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::from_env();
    if let Some(model) = args.model {
        config.ocr.model = model;
    }
    if let Some(max_resolution) = args.max_resolution {
        config.preprocessing.max_resolution = max_resolution;
    }
    if args.binarize {
        config.preprocessing.binarize = true;
    }
    if args.no_preprocess {
        config.preprocessing.enabled = false;
    }

    let options = config
        .preprocessing
        .enabled
        .then(|| PreprocessOptions::from(&config.preprocessing));

    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let image = decode_image(&bytes)?;

    tracing::info!("Initializing OCR backend: {}...", config.ocr.model);
    let engine = OcrEngine::from_config(&config);

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    let result = engine
        .process_with_cancellation(image, options, cancel_token)
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.error().is_none() {
        println!("{}", result.text());
        eprintln!(
            "{} | confidence {:.2} | {} words | {} ms via {}",
            result.language(),
            result.confidence(),
            result.word_count(),
            result.processing_time_ms(),
            result.method()
        );
    }

    if let Some(error) = result.error() {
        return Err(anyhow::anyhow!("{}", error));
    }

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
        return;
    }

    tracing::info!("Interrupt received, cancelling scan...");
    cancel_token.cancel();
}
