//! # Client Components
//!
//! ## Core Client ([`client`])
//! Talks to the verification backend: best-effort warmup and the verify call,
//! each with its own timeout.
//!
//! ## Session ([`session`])
//! Presentation state for one verification screen:
//! - Image selection
//! - Loading / error / result states
//! - Single-flight submission and reset
//!
//! ## Supporting modules
//! - [`error`]: normalized error taxonomy and the error-body extractor chain
//! - [`image_source`]: reads the bytes behind an image reference
//! - [`background`]: fire-and-forget tasks whose failures never propagate
//! - [`display`]: text rendering of the presentation states
//! - [`metrics`]: per-call latency and outcome recording
//! - [`config`]: TOML configuration

pub mod background;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod image_source;
pub mod metrics;
pub mod session;

// Re-export for convenience
pub use client::{VerificationRequest, VerifyClient};
pub use config::ClientConfig;
pub use error::VerifyError;
pub use image_source::{FileImageSource, ImageReference, ImageSource};
pub use metrics::ClientMetrics;
pub use session::{VerificationSession, ViewState};
