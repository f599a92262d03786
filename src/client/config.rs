//! Client configuration loaded from TOML.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::config::{build_time_api_url, load_config};

/// Complete client configuration.
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// client pointed at the build-time backend address with 5 minute budgets.
///
/// # Example TOML
///
/// ```toml
/// [client]
/// name = "kiosk-3"
///
/// [api]
/// base_url = "http://192.168.1.20:8000"
///
/// [timeouts]
/// warmup_secs = 300
/// verify_secs = 300
/// # verify_ms = 1500   # millisecond override, also warmup_ms
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub client: ClientInfo,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Name used in log lines and metrics exports
    #[serde(default = "default_client_name")]
    pub name: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: default_client_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL without a trailing path (e.g. "http://localhost:8000")
    #[serde(default = "build_time_api_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: build_time_api_url(),
        }
    }
}

/// Independent budgets for the two backend calls.
///
/// Both default to 5 minutes: the first verify after a cold start has to wait
/// for the backend to load its models before inference even begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_timeout_secs")]
    pub warmup_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub verify_secs: u64,
    /// Overrides `warmup_secs` with millisecond precision when set
    #[serde(default)]
    pub warmup_ms: Option<u64>,
    /// Overrides `verify_secs` with millisecond precision when set
    #[serde(default)]
    pub verify_ms: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            warmup_secs: default_timeout_secs(),
            verify_secs: default_timeout_secs(),
            warmup_ms: None,
            verify_ms: None,
        }
    }
}

impl TimeoutConfig {
    pub fn warmup(&self) -> Duration {
        budget(self.warmup_ms, self.warmup_secs)
    }

    pub fn verify(&self) -> Duration {
        budget(self.verify_ms, self.verify_secs)
    }

    /// Reject budgets that would expire before any request could finish.
    pub fn validate(&self) -> Result<()> {
        if self.warmup().is_zero() {
            bail!("timeouts: warmup budget must be greater than zero");
        }
        if self.verify().is_zero() {
            bail!("timeouts: verify budget must be greater than zero");
        }
        Ok(())
    }
}

fn budget(millis: Option<u64>, secs: u64) -> Duration {
    match millis {
        Some(ms) => Duration::from_millis(ms),
        None => Duration::from_secs(secs),
    }
}

fn default_client_name() -> String {
    "face-verify".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl ClientConfig {
    /// Loads client configuration from a TOML file.
    ///
    /// ```rust,ignore
    /// let config = ClientConfig::from_file("config/client.toml")?;
    /// println!("Backend: {}", config.api.base_url);
    /// ```
    pub fn from_file(path: &str) -> Result<Self> {
        let config: Self = load_config(path)?;
        config.timeouts.validate()?;
        Ok(config)
    }

    /// Configuration for a given backend with default budgets.
    pub fn for_backend(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
            },
            ..Self::default()
        }
    }
}
