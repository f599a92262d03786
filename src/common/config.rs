//! # Configuration Utilities
//!
//! Shared configuration helpers used by both the client and the development backend.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Backend address used when neither the build nor a config file provides one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Resolve the backend base URL baked in at build time.
///
/// Set `FACE_VERIFY_API_URL` when compiling to point release builds at a
/// deployed backend; otherwise the local loopback address is used.
pub fn build_time_api_url() -> String {
    option_env!("FACE_VERIFY_API_URL")
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(DEFAULT_API_URL)
        .to_string()
}

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: ClientConfig = load_config("config/client.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content =
        fs::read_to_string(path).with_context(|| format!("reading config file {}", path))?;
    let config: T =
        toml::from_str(&content).with_context(|| format!("parsing config file {}", path))?;
    Ok(config)
}
