//! Plain-text rendering of a [`ViewState`] for terminals and logs.

use std::fmt::Write;

use super::session::ViewState;
use crate::common::messages::{OverallResult, VerificationResult};

const ABSENT: &str = "n/a";

const HOW_IT_WORKS: &str = "How it works\n\
  • Select your ID photo\n\
  • Capture a selfie\n\
  • Run verify to check liveness & face match\n\
Make sure the backend is running at the configured API URL.";

pub fn render(state: &ViewState) -> String {
    match state {
        ViewState::Idle => HOW_IT_WORKS.to_string(),
        ViewState::Loading => "Verifying identity...".to_string(),
        ViewState::Failed(message) => format!("Error: {}", message),
        ViewState::Completed(result) => render_result(result),
    }
}

/// Banner title for a verdict. Anything that is not a pass or a spoof is shown as failed.
pub fn verdict_title(verdict: Option<&OverallResult>) -> &'static str {
    match verdict {
        Some(OverallResult::Pass) => "Verification Passed",
        Some(OverallResult::SpoofDetected) => "Spoof Detected",
        _ => "Verification Failed",
    }
}

pub fn render_result(result: &VerificationResult) -> String {
    let verdict = result.overall_result.as_ref();
    let icon = if verdict == Some(&OverallResult::Pass) {
        '✓'
    } else {
        '✗'
    };

    let mut out = String::new();
    let _ = write!(out, "{} {}", icon, verdict_title(verdict));
    if let Some(OverallResult::Other(raw)) = verdict {
        let _ = write!(out, " ({})", raw);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", result.message.as_deref().unwrap_or(ABSENT));

    let liveness = result.liveness_check.clone().unwrap_or_default();
    let _ = writeln!(out);
    let _ = writeln!(out, "LIVENESS CHECK");
    let _ = writeln!(
        out,
        "  {}",
        flag(liveness.is_real, "Real", "Spoof Detected")
    );
    let _ = writeln!(out, "  {}", confidence(liveness.confidence));

    let face = result.face_verification.clone().unwrap_or_default();
    let _ = writeln!(out);
    let _ = writeln!(out, "FACE VERIFICATION");
    let _ = writeln!(out, "  {}", flag(face.verified, "Matched", "Not Matched"));
    let _ = writeln!(out, "  {}", confidence(face.confidence));
    let _ = write!(
        out,
        "  distance {}",
        face.distance
            .map(|d| format!("{:.4}", d))
            .unwrap_or_else(|| ABSENT.to_string())
    );

    out
}

fn flag(value: Option<bool>, yes: &'static str, no: &'static str) -> &'static str {
    match value {
        Some(true) => yes,
        Some(false) => no,
        None => ABSENT,
    }
}

fn confidence(value: Option<f64>) -> String {
    match value {
        Some(c) => format!("{:.1}% confidence", c * 100.0),
        None => format!("{} confidence", ABSENT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_pass() {
        let result = VerificationResult::complete(
            true,
            0.97,
            true,
            0.88,
            0.21,
            OverallResult::Pass,
            "Identity verified",
        );
        let text = render(&ViewState::Completed(result));

        assert!(text.starts_with("✓ Verification Passed\nIdentity verified\n"));
        assert!(text.contains("LIVENESS CHECK\n  Real\n  97.0% confidence"));
        assert!(text.contains("FACE VERIFICATION\n  Matched\n  88.0% confidence"));
        assert!(text.ends_with("distance 0.2100"));
    }

    #[test]
    fn test_render_spoof_and_unknown_verdicts() {
        let spoof = VerificationResult {
            overall_result: Some(OverallResult::SpoofDetected),
            ..Default::default()
        };
        assert!(render_result(&spoof).starts_with("✗ Spoof Detected"));

        let other = VerificationResult {
            overall_result: Some(OverallResult::Other("review".into())),
            ..Default::default()
        };
        assert!(render_result(&other).starts_with("✗ Verification Failed (review)"));
    }

    #[test]
    fn test_render_absent_fields() {
        let text = render_result(&VerificationResult::default());
        assert!(text.contains("LIVENESS CHECK\n  n/a\n  n/a confidence"));
        assert!(text.ends_with("distance n/a"));
    }

    #[test]
    fn test_render_other_states() {
        assert_eq!(render(&ViewState::Loading), "Verifying identity...");
        assert_eq!(
            render(&ViewState::Failed("bad image".into())),
            "Error: bad image"
        );
        assert!(render(&ViewState::Idle).starts_with("How it works"));
    }
}
