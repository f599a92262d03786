//! # Verification Errors
//!
//! Every failed verify call resolves to exactly one [`VerifyError`]. Its
//! `Display` output is the single string the presentation layer shows.
//!
//! ## Server error bodies
//!
//! Non-success responses carry their message in one of several shapes. The
//! [`EXTRACTORS`] chain is tried in order and the first non-empty message wins:
//!
//! 1. `{"detail": "<string>"}`
//! 2. `{"detail": [{"msg": "<string>"}, ...]}` (first element)
//! 3. `{"message": "<string>"}`
//!
//! When the body is not JSON or no extractor matches, [`FALLBACK_MESSAGE`] is used.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::image_source::ImageReference;

/// Message used when a server error body yields nothing readable.
pub const FALLBACK_MESSAGE: &str = "Verification failed";

/// Message used when a transport error carries no text of its own.
pub const NETWORK_FALLBACK_MESSAGE: &str = "Network request failed";

/// Normalized failure of a verification attempt.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Submission attempted without both images.
    #[error("Please provide both ID photo and selfie")]
    MissingImages,

    /// The image source could not produce bytes for a reference.
    #[error("Could not read image {reference}: {reason}")]
    ImageUnavailable {
        reference: ImageReference,
        reason: String,
    },

    /// Transport failure before any response arrived.
    #[error("{}", network_message(.0))]
    Network(String),

    /// The call exceeded its budget and the transfer was aborted.
    #[error(
        "Request timed out after {}. The first verification can take several minutes while the backend loads its models.",
        format_budget(.after)
    )]
    Timeout { after: Duration },

    /// Non-success HTTP status; `message` comes from the extractor chain.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A success status whose body could not be decoded.
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl VerifyError {
    /// Short machine-friendly label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::MissingImages => "missing_images",
            VerifyError::ImageUnavailable { .. } => "image_unavailable",
            VerifyError::Network(_) => "network",
            VerifyError::Timeout { .. } => "timeout",
            VerifyError::Server { .. } => "server_error",
            VerifyError::InvalidResponse(_) => "invalid_response",
        }
    }

    /// Build a [`VerifyError::Server`] from a raw error body.
    pub fn from_error_body(status: u16, body: &[u8]) -> Self {
        VerifyError::Server {
            status,
            message: extract_error_message(body),
        }
    }
}

/// Human form of a timeout budget: `200ms`, `45s`, `5 minutes`.
fn format_budget(after: &Duration) -> String {
    let millis = after.as_millis();
    if millis % 1000 != 0 {
        return format!("{}ms", millis);
    }
    match after.as_secs() {
        60 => "1 minute".to_string(),
        secs if secs > 0 && secs % 60 == 0 => format!("{} minutes", secs / 60),
        secs => format!("{}s", secs),
    }
}

fn network_message(raw: &str) -> &str {
    if raw.trim().is_empty() {
        NETWORK_FALLBACK_MESSAGE
    } else {
        raw
    }
}

// ============================================================================
// ERROR MESSAGE EXTRACTION
// ============================================================================

/// One attempt at pulling a human-readable message out of an error body.
pub struct ErrorExtractor {
    /// Shape this extractor recognises, for logging
    pub name: &'static str,
    extract: fn(&Value) -> Option<&str>,
}

impl ErrorExtractor {
    /// Apply the extractor; empty strings count as no match.
    pub fn apply<'a>(&self, body: &'a Value) -> Option<&'a str> {
        (self.extract)(body).filter(|msg| !msg.is_empty())
    }
}

/// Extraction chain in priority order.
pub const EXTRACTORS: &[ErrorExtractor] = &[
    ErrorExtractor {
        name: "detail",
        extract: detail_string,
    },
    ErrorExtractor {
        name: "detail[0].msg",
        extract: first_detail_msg,
    },
    ErrorExtractor {
        name: "message",
        extract: message_field,
    },
];

fn detail_string(body: &Value) -> Option<&str> {
    body.get("detail")?.as_str()
}

fn first_detail_msg(body: &Value) -> Option<&str> {
    body.get("detail")?.as_array()?.first()?.get("msg")?.as_str()
}

fn message_field(body: &Value) -> Option<&str> {
    body.get("message")?.as_str()
}

/// Run the extractor chain over an already-decoded body.
pub fn extract_from_value(body: &Value) -> Option<String> {
    EXTRACTORS
        .iter()
        .find_map(|extractor| extractor.apply(body))
        .map(str::to_string)
}

/// Decode an error body and extract its message, falling back to [`FALLBACK_MESSAGE`].
pub fn extract_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| extract_from_value(&value))
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}
