use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::net::TcpListener;

use face_verify::client::image_source::{ImageReference, ImageSource, ImageSourceError};
use face_verify::client::{ClientConfig, ClientMetrics, VerifyClient, VerifyError};
use face_verify::common::messages::{FaceVerification, LivenessCheck, OverallResult};
use face_verify::VerificationResult;

const PASS_BODY: &str = r#"{"liveness_check":{"is_real":true,"confidence":0.97},"face_verification":{"verified":true,"confidence":0.88,"distance":0.21},"overall_result":"pass","message":"Identity verified"}"#;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Router answering every verify with a fixed status and raw body.
fn fixed_verify(status: StatusCode, body: &'static str) -> Router {
    Router::new().route(
        "/api/verify",
        post(move || async move { (status, [(header::CONTENT_TYPE, "application/json")], body) }),
    )
}

fn image_pair(dir: &TempDir) -> (ImageReference, ImageReference) {
    let id = dir.path().join("a.jpg");
    let selfie = dir.path().join("b.jpg");
    std::fs::write(&id, b"\xFF\xD8\xFF id photo").unwrap();
    std::fs::write(&selfie, b"\xFF\xD8\xFF selfie").unwrap();
    (
        format!("file://{}", id.display()).into(),
        format!("file://{}", selfie.display()).into(),
    )
}

fn client_for(base_url: &str, verify_ms: u64) -> VerifyClient {
    let mut config = ClientConfig::for_backend(base_url);
    config.timeouts.verify_ms = Some(verify_ms);
    config.timeouts.warmup_secs = 5;
    VerifyClient::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_end_to_end_pass_is_returned_verbatim() {
    async fn handler(headers: HeaderMap, mut multipart: Multipart) -> impl IntoResponse {
        if headers.get(header::ACCEPT).map(|v| v.as_bytes()) != Some(b"application/json".as_slice()) {
            return (StatusCode::BAD_REQUEST, r#"{"detail":"missing accept header"}"#.to_string());
        }

        let mut seen = Vec::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or("").to_string();
            let file_name = field.file_name().unwrap_or("").to_string();
            let content_type = field.content_type().unwrap_or("").to_string();
            let bytes = field.bytes().await.unwrap();
            seen.push(format!(
                "{}|{}|{}|{}",
                name,
                file_name,
                content_type,
                String::from_utf8_lossy(&bytes[3..])
            ));
        }

        let expected = vec![
            "id_image|id_image.jpg|image/jpeg| id photo".to_string(),
            "selfie_image|selfie_image.jpg|image/jpeg| selfie".to_string(),
        ];
        if seen != expected {
            return (StatusCode::BAD_REQUEST, format!(r#"{{"detail":"unexpected parts {:?}"}}"#, seen));
        }
        (StatusCode::OK, PASS_BODY.to_string())
    }

    let base = serve(Router::new().route("/api/verify", post(handler))).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);

    let result = client_for(&base, 5_000).verify(&id, &selfie).await.unwrap();

    assert_eq!(
        result,
        VerificationResult {
            liveness_check: Some(LivenessCheck {
                is_real: Some(true),
                confidence: Some(0.97),
            }),
            face_verification: Some(FaceVerification {
                verified: Some(true),
                confidence: Some(0.88),
                distance: Some(0.21),
            }),
            overall_result: Some(OverallResult::Pass),
            message: Some("Identity verified".to_string()),
        }
    );
}

#[tokio::test]
async fn test_overall_result_is_not_rederived() {
    let body = r#"{"liveness_check":{"is_real":false,"confidence":0.1},"face_verification":{"verified":false,"confidence":0.1,"distance":0.9},"overall_result":"pass","message":"server says pass"}"#;
    let base = serve(fixed_verify(StatusCode::OK, body)).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);

    let result = client_for(&base, 5_000).verify(&id, &selfie).await.unwrap();
    assert_eq!(result.overall_result, Some(OverallResult::Pass));
    assert_eq!(result.is_real(), Some(false));
}

#[tokio::test]
async fn test_partial_body_leaves_fields_absent() {
    let base = serve(fixed_verify(StatusCode::OK, r#"{"overall_result":"spoof_detected"}"#)).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);

    let result = client_for(&base, 5_000).verify(&id, &selfie).await.unwrap();
    assert_eq!(result.overall_result, Some(OverallResult::SpoofDetected));
    assert!(result.liveness_check.is_none());
    assert!(result.face_verification.is_none());
    assert!(result.message.is_none());
}

#[tokio::test]
async fn test_detail_string_error() {
    let base = serve(fixed_verify(StatusCode::BAD_REQUEST, r#"{"detail": "bad image"}"#)).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);

    let err = client_for(&base, 5_000).verify(&id, &selfie).await.unwrap_err();
    assert!(matches!(err, VerifyError::Server { status: 400, .. }));
    assert_eq!(err.to_string(), "bad image");
}

#[tokio::test]
async fn test_validation_list_error() {
    let body = r#"{"detail":[{"loc":["body","selfie_image"],"msg":"Field required","type":"missing"}]}"#;
    let base = serve(fixed_verify(StatusCode::UNPROCESSABLE_ENTITY, body)).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);

    let err = client_for(&base, 5_000).verify(&id, &selfie).await.unwrap_err();
    assert_eq!(err.to_string(), "Field required");
}

#[tokio::test]
async fn test_unparsable_error_body_falls_back() {
    let base = serve(fixed_verify(StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>")).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);

    let err = client_for(&base, 5_000).verify(&id, &selfie).await.unwrap_err();
    assert!(matches!(err, VerifyError::Server { status: 502, .. }));
    assert_eq!(err.to_string(), "Verification failed");
}

#[tokio::test]
async fn test_undecodable_success_body() {
    let base = serve(fixed_verify(StatusCode::OK, "not json")).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);

    let err = client_for(&base, 5_000).verify(&id, &selfie).await.unwrap_err();
    assert!(matches!(err, VerifyError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_timeout_aborts_request() {
    let app = Router::new().route(
        "/api/verify",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            (StatusCode::OK, PASS_BODY)
        }),
    );
    let base = serve(app).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);

    let started = Instant::now();
    let err = client_for(&base, 200).verify(&id, &selfie).await.unwrap_err();

    assert!(matches!(err, VerifyError::Timeout { after } if after == Duration::from_millis(200)));
    assert!(err.to_string().starts_with("Request timed out after 200ms."));
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// An image source whose reads never complete, like a stalled content provider.
struct StalledImages;

impl ImageSource for StalledImages {
    async fn read(&self, _reference: &ImageReference) -> Result<Vec<u8>, ImageSourceError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_timeout_covers_image_reads() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/api/verify",
            post(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (StatusCode::OK, PASS_BODY)
            }),
        )
        .with_state(hits.clone());
    let base = serve(app).await;
    let client = client_for(&base, 200).with_image_source(StalledImages);

    let started = Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        client.verify(&"file:///a.jpg".into(), &"file:///b.jpg".into()),
    )
    .await
    .expect("verify must settle within its own budget");

    let err = outcome.unwrap_err();
    assert!(matches!(err, VerifyError::Timeout { after } if after == Duration::from_millis(200)));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_network_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);

    let err = client_for(&format!("http://{}", addr), 5_000)
        .verify(&id, &selfie)
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Network(_)));
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn test_unreadable_image_never_reaches_server() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/api/verify",
            post(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (StatusCode::OK, PASS_BODY)
            }),
        )
        .with_state(hits.clone());
    let base = serve(app).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, _) = image_pair(&dir);

    let missing: ImageReference = "file:///no/such/selfie.jpg".into();
    let err = client_for(&base, 5_000).verify(&id, &missing).await.unwrap_err();

    assert!(matches!(err, VerifyError::ImageUnavailable { ref reference, .. } if *reference == missing));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sequential_calls_do_not_share_timers() {
    // First request is slower than the budget, later ones finish inside it.
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/api/verify",
            post(|State(calls): State<Arc<AtomicUsize>>| async move {
                let delay = if calls.fetch_add(1, Ordering::SeqCst) == 0 { 2_000 } else { 150 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                (StatusCode::OK, PASS_BODY)
            }),
        )
        .with_state(calls);
    let base = serve(app).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);
    let client = client_for(&base, 600);

    let first = client.verify(&id, &selfie).await;
    assert!(matches!(first, Err(VerifyError::Timeout { .. })));

    // Each of these would be cut short if an earlier timer were still armed.
    for _ in 0..3 {
        let next = client.verify(&id, &selfie).await.unwrap();
        assert_eq!(next.overall_result, Some(OverallResult::Pass));
    }
}

#[tokio::test]
async fn test_warmup_failure_does_not_affect_verify() {
    let app = Router::new()
        .route(
            "/api/warmup",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        )
        .route("/api/verify", post(|| async { (StatusCode::OK, PASS_BODY) }));
    let base = serve(app).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);
    let client = client_for(&base, 2_000);

    client.spawn_warmup();
    client.spawn_warmup();

    let started = Instant::now();
    let result = client.verify(&id, &selfie).await.unwrap();
    assert_eq!(result.overall_result, Some(OverallResult::Pass));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_awaited_warmup_swallows_errors() {
    let base = serve(Router::new().route(
        "/api/warmup",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail":"model load failed"}"#) }),
    ))
    .await;
    client_for(&base, 1_000).warmup().await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    client_for(&format!("http://{}", addr), 1_000).warmup().await;
}

#[tokio::test]
async fn test_metrics_record_each_call() {
    let base = serve(fixed_verify(StatusCode::BAD_REQUEST, r#"{"detail": "bad image"}"#)).await;
    let dir = tempfile::tempdir().unwrap();
    let (id, selfie) = image_pair(&dir);

    let metrics = Arc::new(Mutex::new(ClientMetrics::new("metrics-test".to_string())));
    let client = client_for(&base, 5_000).with_metrics(metrics.clone());

    let _ = client.verify(&id, &selfie).await;
    let _ = client.verify(&id, &"missing.jpg".into()).await;

    let stats = metrics.lock().unwrap().aggregate();
    assert_eq!(stats.total_calls, 2);
    assert_eq!(stats.failed_calls, 2);
    assert_eq!(stats.outcomes.get("server_error"), Some(&1));
    assert_eq!(stats.outcomes.get("image_unavailable"), Some(&1));
}
