//! Development backend configuration.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::config::load_config;

/// # Example TOML
///
/// ```toml
/// [server]
/// bind_address = "0.0.0.0:8000"
///
/// [models]
/// warmup_delay_ms = 3000
/// request_latency_ms = 500
///
/// [verdict]
/// liveness_real = false
/// spoof_reason = "Screen replay detected."
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerInfo,
    #[serde(default)]
    pub models: ModelConfig,
    #[serde(default)]
    pub verdict: VerdictConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Largest accepted request body (both images together)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Simulated model behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Time the first warmup (or first verify) spends "loading models"
    #[serde(default)]
    pub warmup_delay_ms: u64,
    /// Extra time added to every verify call
    #[serde(default)]
    pub request_latency_ms: u64,
}

impl ModelConfig {
    pub fn warmup_delay(&self) -> Duration {
        Duration::from_millis(self.warmup_delay_ms)
    }

    pub fn request_latency(&self) -> Duration {
        Duration::from_millis(self.request_latency_ms)
    }
}

/// Scores returned by the scripted verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictConfig {
    #[serde(default = "default_true")]
    pub liveness_real: bool,
    #[serde(default = "default_liveness_confidence")]
    pub liveness_confidence: f64,
    #[serde(default)]
    pub spoof_reason: Option<String>,
    #[serde(default = "default_true")]
    pub face_verified: bool,
    #[serde(default = "default_face_confidence")]
    pub face_confidence: f64,
    #[serde(default = "default_face_distance")]
    pub face_distance: f64,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            liveness_real: true,
            liveness_confidence: default_liveness_confidence(),
            spoof_reason: None,
            face_verified: true,
            face_confidence: default_face_confidence(),
            face_distance: default_face_distance(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_liveness_confidence() -> f64 {
    0.97
}

fn default_face_confidence() -> f64 {
    0.88
}

fn default_face_distance() -> f64 {
    0.21
}

impl ServerConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        load_config(path)
    }
}
