//! # Server Binary Entry Point
//!
//! Runs the development verification backend.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin server -- --config config/server.toml
//! cargo run --bin server -- --bind 0.0.0.0:8000
//! ```
//!
//! Verdicts come from the `[verdict]` section of the configuration, so the
//! client's pass, fail and spoof paths can all be reproduced locally.

use clap::Parser;
use std::sync::Arc;

use face_verify::common::logging::init_logger;
use face_verify::server::{ScriptedVerifier, ServerConfig};

/// Command-line arguments for the server binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the server configuration file (TOML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Address to listen on, overrides the configuration file
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    let verifier = Arc::new(ScriptedVerifier::new(config.verdict.clone()));

    // Runs until the process is stopped
    face_verify::server::run(config, verifier).await
}
