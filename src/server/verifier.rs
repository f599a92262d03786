//! # Verifier Seam
//!
//! The development backend does not run any model. Liveness and face matching
//! go through the [`Verifier`] trait; the shipped [`ScriptedVerifier`] answers
//! with the scores from configuration so every client path can be exercised.

use anyhow::Result;

use super::config::VerdictConfig;
use crate::common::messages::{OverallResult, VerificationResult};

/// Default explanation when a spoof is reported without a reason.
pub const DEFAULT_SPOOF_REASON: &str =
    "The selfie appears to be fake (printed photo or screen replay).";

#[derive(Debug, Clone, PartialEq)]
pub struct LivenessVerdict {
    pub is_real: bool,
    pub confidence: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub verified: bool,
    pub confidence: f64,
    pub distance: f64,
}

pub trait Verifier: Send + Sync {
    /// Decide whether the selfie shows a live subject.
    fn detect_spoof(&self, selfie: &[u8]) -> Result<LivenessVerdict>;

    /// Compare the face on the ID photo with the selfie.
    fn compare_faces(&self, id_image: &[u8], selfie: &[u8]) -> Result<FaceMatch>;
}

/// Returns the same configured verdict for every request.
#[derive(Debug, Clone)]
pub struct ScriptedVerifier {
    verdict: VerdictConfig,
}

impl ScriptedVerifier {
    pub fn new(verdict: VerdictConfig) -> Self {
        Self { verdict }
    }
}

impl Verifier for ScriptedVerifier {
    fn detect_spoof(&self, _selfie: &[u8]) -> Result<LivenessVerdict> {
        Ok(LivenessVerdict {
            is_real: self.verdict.liveness_real,
            confidence: self.verdict.liveness_confidence,
            reason: self.verdict.spoof_reason.clone(),
        })
    }

    fn compare_faces(&self, _id_image: &[u8], _selfie: &[u8]) -> Result<FaceMatch> {
        Ok(FaceMatch {
            verified: self.verdict.face_verified,
            confidence: self.verdict.face_confidence,
            distance: self.verdict.face_distance,
        })
    }
}

/// Result for a selfie that failed the liveness check. Face matching is skipped.
pub fn spoof_result(liveness: &LivenessVerdict) -> VerificationResult {
    let reason = liveness.reason.as_deref().unwrap_or(DEFAULT_SPOOF_REASON);
    VerificationResult::complete(
        false,
        liveness.confidence,
        false,
        0.0,
        1.0,
        OverallResult::SpoofDetected,
        format!("Spoof detected. {}", reason),
    )
}

/// Result for a live selfie; the face match alone decides pass or fail.
pub fn match_result(liveness: &LivenessVerdict, face: &FaceMatch) -> VerificationResult {
    let (overall, message) = if face.verified {
        (
            OverallResult::Pass,
            "Identity verified successfully. Face matches and liveness check passed.".to_string(),
        )
    } else {
        (
            OverallResult::Fail,
            format!(
                "Face verification failed. Faces do not match (confidence: {:.2}%).",
                face.confidence * 100.0
            ),
        )
    };

    VerificationResult::complete(
        true,
        liveness.confidence,
        face.verified,
        face.confidence,
        face.distance,
        overall,
        message,
    )
}
