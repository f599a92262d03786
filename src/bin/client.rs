//! # Client Binary Entry Point
//!
//! Submits an ID photo and a selfie to the verification backend and prints
//! the outcome.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin client -- --id-image ./id.jpg --selfie ./selfie.jpg
//! ```
//!
//! Against a device-reachable backend, with metrics:
//! ```bash
//! cargo run --bin client -- --config config/client.toml \
//!   --api-url http://192.168.1.20:8000 \
//!   --id-image file:///tmp/id.jpg --selfie file:///tmp/selfie.jpg \
//!   --metrics-output ./metrics/client.json
//! ```
//!
//! The client will:
//! 1. Load configuration (file optional, defaults otherwise)
//! 2. Start a background warmup unless `--skip-warmup` is given
//! 3. Submit both images and wait for the verdict or the timeout
//! 4. Print the rendered result (or raw JSON with `--json`)
//!
//! Exits with status 1 when verification ends in an error and 2 when an image
//! is missing. A `fail` or `spoof_detected` verdict is a result and exits 0.

use clap::Parser;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use face_verify::client::display::render;
use face_verify::client::session::SessionError;
use face_verify::client::{ClientConfig, ClientMetrics, VerificationSession, VerifyClient, ViewState};
use face_verify::common::logging::init_logger;

/// Command-line arguments for the client binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the client configuration file (TOML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Backend base URL, overrides the configuration file
    #[arg(long)]
    api_url: Option<String>,

    /// ID photo / reference image (path or file:// URI)
    #[arg(long)]
    id_image: Option<String>,

    /// Selfie image (path or file:// URI)
    #[arg(long)]
    selfie: Option<String>,

    /// Do not prime the backend models before verifying
    #[arg(long)]
    skip_warmup: bool,

    /// Print the raw verification result as JSON
    #[arg(long)]
    json: bool,

    /// Path to write metrics JSON output (optional)
    #[arg(long)]
    metrics_output: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_logger();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = args.api_url {
        config.api.base_url = url;
    }

    let mut client = VerifyClient::from_config(&config)?;
    let metrics = args.metrics_output.as_ref().map(|_| {
        Arc::new(Mutex::new(ClientMetrics::new(config.client.name.clone())))
    });
    if let Some(metrics) = &metrics {
        client = client.with_metrics(metrics.clone());
    }

    if !args.skip_warmup {
        client.spawn_warmup();
    }

    let mut session = VerificationSession::new();
    session.set_id_image(args.id_image.map(Into::into));
    session.set_selfie_image(args.selfie.map(Into::into));

    let exit = match session.submit(&client).await {
        Ok(ViewState::Completed(result)) if args.json => {
            println!("{}", serde_json::to_string_pretty(result)?);
            ExitCode::SUCCESS
        }
        Ok(state @ ViewState::Completed(_)) => {
            println!("{}", render(state));
            ExitCode::SUCCESS
        }
        Ok(state) => {
            eprintln!("{}", render(state));
            ExitCode::FAILURE
        }
        Err(SessionError::MissingImages) => {
            eprintln!("{}", render(session.view_state()));
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    };

    // Export metrics if enabled
    if let (Some(metrics), Some(path)) = (metrics, args.metrics_output) {
        match metrics.lock() {
            Ok(metrics) => {
                metrics.export_to_json(&path)?;
                println!("Metrics exported to: {}", path);
            }
            Err(_) => anyhow::bail!("metrics lock poisoned"),
        }
    }

    Ok(exit)
}
