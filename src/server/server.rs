//! # Development Backend
//!
//! An axum server speaking the same HTTP contract as the production
//! verification service, backed by a [`Verifier`] instead of real models.
//!
//! ## Routes
//!
//! | Method | Path | Behaviour |
//! |---|---|---|
//! | GET | `/` | service banner |
//! | GET | `/health` | readiness report |
//! | POST | `/api/warmup` | first call "loads models" (configured delay), later calls return at once |
//! | POST | `/api/verify` | multipart `id_image` + `selfie_image`, returns a `VerificationResult` |
//!
//! ## Verify pipeline
//!
//! ```text
//! multipart fields present?      no  -> 422 {"detail": [{"msg": "Field required", ...}]}
//! content types image/*?         no  -> 400 {"detail": "..."}
//! selfie non-empty?              no  -> 400
//! liveness check                 spoof -> 200 overall_result = spoof_detected
//! id image non-empty?            no  -> 400
//! face comparison                -> 200 overall_result = pass | fail
//! ```
//!
//! Models are loaded lazily: the first warmup or verify pays the delay and
//! concurrent callers wait on the same load.

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::OnceCell;
use tower_http::cors::CorsLayer;

use super::config::{ModelConfig, ServerConfig};
use super::verifier::{match_result, spoof_result, Verifier};
use crate::client::client::{ID_IMAGE_FIELD, SELFIE_IMAGE_FIELD};
use crate::common::messages::{ErrorResponse, VerificationResult, WarmupResponse};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::message(detail)))
}

struct AppState {
    verifier: Arc<dyn Verifier>,
    models: ModelConfig,
    /// Seconds spent loading models, set once
    loaded: OnceCell<f64>,
}

impl AppState {
    async fn ensure_models_loaded(&self) -> f64 {
        *self
            .loaded
            .get_or_init(|| async {
                let start = Instant::now();
                info!("🔄 Warmup started: loading models...");
                tokio::time::sleep(self.models.warmup_delay()).await;
                let elapsed = start.elapsed().as_secs_f64();
                info!("✅ Models loaded ({:.1}s)", elapsed);
                elapsed
            })
            .await
    }
}

/// Build the router for the development backend.
pub fn router(config: &ServerConfig, verifier: Arc<dyn Verifier>) -> Router {
    let state = Arc::new(AppState {
        verifier,
        models: config.models.clone(),
        loaded: OnceCell::new(),
    });

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/warmup", post(warmup_handler))
        .route("/api/verify", post(verify_handler))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `app` on an already bound listener until the server stops.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app).await?;
    Ok(())
}

/// Bind the configured address and serve forever.
pub async fn run(config: ServerConfig, verifier: Arc<dyn Verifier>) -> Result<()> {
    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let addr = listener.local_addr()?;

    info!("🌐 Verification backend running on http://{}", addr);
    info!("📡 API endpoints: http://{}/api/warmup, http://{}/api/verify", addr, addr);

    serve(listener, router(&config, verifier)).await
}

/// Bind an ephemeral port on loopback and serve in the background.
///
/// Returns the bound address. The server lives as long as the runtime.
pub async fn spawn_local(config: ServerConfig, verifier: Arc<dyn Verifier>) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(&config, verifier);

    tokio::spawn(async move {
        if let Err(e) = serve(listener, app).await {
            error!("❌ Backend on {} stopped: {}", addr, e);
        }
    });

    Ok(addr)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    info!("→ {} {}", method, path);
    let response = next.run(request).await;
    info!(
        "← {} {} {} ({}ms)",
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );

    response
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Face Verification & Spoof Detection API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "face_verification": "ready",
        "spoof_detection": "ready"
    }))
}

async fn warmup_handler(State(state): State<Arc<AppState>>) -> Json<WarmupResponse> {
    let start = Instant::now();
    state.ensure_models_loaded().await;
    let elapsed = start.elapsed().as_secs_f64();

    Json(WarmupResponse {
        status: "ready".to_string(),
        message: "Models loaded".to_string(),
        elapsed_sec: (elapsed * 10.0).round() / 10.0,
    })
}

/// One uploaded multipart file.
struct Upload {
    content_type: Option<String>,
    bytes: Bytes,
}

impl Upload {
    fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(false, |ct| ct.starts_with("image/"))
    }
}

async fn verify_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<VerificationResult>, ApiError> {
    let request_id = rand::random::<u32>();
    let mut id_image: Option<Upload> = None;
    let mut selfie_image: Option<Upload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        reject(
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let name = field.name().unwrap_or("").to_string();
        if name != ID_IMAGE_FIELD && name != SELFIE_IMAGE_FIELD {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            reject(
                StatusCode::BAD_REQUEST,
                format!("Failed to read {}: {}", name, e),
            )
        })?;

        let upload = Upload {
            content_type,
            bytes,
        };
        if name == ID_IMAGE_FIELD {
            id_image = Some(upload);
        } else {
            selfie_image = Some(upload);
        }
    }

    let (id_image, selfie_image) = match (id_image, selfie_image) {
        (Some(id), Some(selfie)) => (id, selfie),
        (id, selfie) => {
            let mut missing = Vec::new();
            if id.is_none() {
                missing.push(ID_IMAGE_FIELD);
            }
            if selfie.is_none() {
                missing.push(SELFIE_IMAGE_FIELD);
            }
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse::missing_fields(&missing)),
            ));
        }
    };

    if !id_image.is_image() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "ID image must be an image file",
        ));
    }
    if !selfie_image.is_image() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Selfie image must be an image file",
        ));
    }

    let started = Instant::now();
    info!("📥 Verification #{} started", request_id);
    state.ensure_models_loaded().await;
    tokio::time::sleep(state.models.request_latency()).await;

    // Step 1: liveness check on the selfie
    if selfie_image.bytes.is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Selfie image is empty or could not be read",
        ));
    }
    info!(
        "Verification #{}: selfie {} bytes, content_type {:?}",
        request_id,
        selfie_image.bytes.len(),
        selfie_image.content_type
    );

    let verifier = state.verifier.clone();
    let selfie = selfie_image.bytes.clone();
    let liveness = run_blocking(move || verifier.detect_spoof(&selfie)).await?;
    info!(
        "Verification #{}: is_real={}, confidence={:.2}%",
        request_id,
        liveness.is_real,
        liveness.confidence * 100.0
    );

    if !liveness.is_real {
        warn!(
            "❌ Verification #{}: spoof detected ({})",
            request_id,
            liveness.reason.as_deref().unwrap_or("no reason given")
        );
        return Ok(Json(spoof_result(&liveness)));
    }

    // Step 2: face comparison, only for a live selfie
    if id_image.bytes.is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "ID image is empty or could not be read",
        ));
    }

    let verifier = state.verifier.clone();
    let id_bytes = id_image.bytes;
    let selfie = selfie_image.bytes;
    let face = run_blocking(move || verifier.compare_faces(&id_bytes, &selfie)).await?;

    let result = match_result(&liveness, &face);
    info!(
        "📊 Verification #{}: {} (distance {:.4}, total {:.1}s)",
        request_id,
        result
            .overall_result
            .as_ref()
            .map(|r| r.as_str())
            .unwrap_or_default(),
        face.distance,
        started.elapsed().as_secs_f64()
    );

    Ok(Json(result))
}

/// Run verifier work off the async workers and map failures to a 500.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(work).await.map_err(|e| {
        error!("❌ Verifier task aborted: {}", e);
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Verification failed: {}", e),
        )
    })?;

    outcome.map_err(|e| {
        error!("❌ Verification error: {:#}", e);
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Verification failed: {}", e),
        )
    })
}
