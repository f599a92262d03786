//! # Message Protocol
//!
//! Defines the JSON bodies exchanged with the verification backend:
//! - The `/api/verify` success body ([`VerificationResult`])
//! - Error bodies returned on non-success statuses ([`ErrorResponse`], [`ValidationError`])
//! - The `/api/warmup` acknowledgement ([`WarmupResponse`])
//!
//! Field names are part of the contract and are case-sensitive. The client side
//! tolerates omitted fields: every field of the result decodes into an `Option`
//! so a partial body is represented as partially absent rather than rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// VERIFY RESPONSE
// ============================================================================

/// Server-side liveness (anti-spoofing) verdict for the selfie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LivenessCheck {
    /// Whether the selfie was captured from a live subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_real: Option<bool>,
    /// Liveness confidence in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Server-side 1:1 face comparison between the ID photo and the selfie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceVerification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Match confidence in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Embedding distance, `>= 0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Final verdict as decided by the server.
///
/// The client never derives this from the sub-checks. Values outside the three
/// known verdicts are kept verbatim in [`OverallResult::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OverallResult {
    Pass,
    Fail,
    SpoofDetected,
    Other(String),
}

impl OverallResult {
    pub fn as_str(&self) -> &str {
        match self {
            OverallResult::Pass => "pass",
            OverallResult::Fail => "fail",
            OverallResult::SpoofDetected => "spoof_detected",
            OverallResult::Other(raw) => raw,
        }
    }
}

impl From<String> for OverallResult {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pass" => OverallResult::Pass,
            "fail" => OverallResult::Fail,
            "spoof_detected" => OverallResult::SpoofDetected,
            _ => OverallResult::Other(raw),
        }
    }
}

impl From<OverallResult> for String {
    fn from(result: OverallResult) -> Self {
        result.as_str().to_string()
    }
}

impl fmt::Display for OverallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a successful `POST /api/verify`.
///
/// # JSON shape
/// ```text
/// {
///   "liveness_check": { "is_real": bool, "confidence": number },
///   "face_verification": { "verified": bool, "confidence": number, "distance": number },
///   "overall_result": "pass" | "fail" | "spoof_detected",
///   "message": string
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_check: Option<LivenessCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_verification: Option<FaceVerification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_result: Option<OverallResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerificationResult {
    /// Build a fully populated result (used by the development backend).
    pub fn complete(
        is_real: bool,
        liveness_confidence: f64,
        verified: bool,
        face_confidence: f64,
        distance: f64,
        overall_result: OverallResult,
        message: impl Into<String>,
    ) -> Self {
        Self {
            liveness_check: Some(LivenessCheck {
                is_real: Some(is_real),
                confidence: Some(liveness_confidence),
            }),
            face_verification: Some(FaceVerification {
                verified: Some(verified),
                confidence: Some(face_confidence),
                distance: Some(distance),
            }),
            overall_result: Some(overall_result),
            message: Some(message.into()),
        }
    }

    pub fn is_real(&self) -> Option<bool> {
        self.liveness_check.as_ref().and_then(|l| l.is_real)
    }

    pub fn face_verified(&self) -> Option<bool> {
        self.face_verification.as_ref().and_then(|f| f.verified)
    }
}

// ============================================================================
// ERROR AND ACKNOWLEDGEMENT BODIES
// ============================================================================

/// One entry of a structured validation failure (`{"detail": [{...}]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Error detail: either a flat message or a list of validation failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationError>),
}

/// Error body returned by the backend on any non-success status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: ErrorDetail,
}

impl ErrorResponse {
    pub fn message(detail: impl Into<String>) -> Self {
        Self {
            detail: ErrorDetail::Message(detail.into()),
        }
    }

    /// Validation failure listing required multipart fields that were not sent.
    pub fn missing_fields(fields: &[&str]) -> Self {
        Self {
            detail: ErrorDetail::Validation(
                fields
                    .iter()
                    .map(|field| ValidationError {
                        loc: vec!["body".to_string(), field.to_string()],
                        msg: "Field required".to_string(),
                        kind: "missing".to_string(),
                    })
                    .collect(),
            ),
        }
    }
}

/// Body of a successful `POST /api/warmup`. The client ignores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupResponse {
    pub status: String,
    pub message: String,
    pub elapsed_sec: f64,
}
