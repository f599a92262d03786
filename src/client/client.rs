//! # Verification Client
//!
//! This module contains the client that talks to the face-verification backend.
//!
//! ## Responsibility
//!
//! The [`VerifyClient`] drives exactly two backend operations:
//! - **Warmup** (`POST /api/warmup`): best effort, asks the backend to load its
//!   models ahead of the first real request. Failures are logged and dropped.
//! - **Verify** (`POST /api/verify`): uploads the ID photo and the selfie as a
//!   multipart body and returns the server's [`VerificationResult`] or a single
//!   [`VerifyError`].
//!
//! ## Timeouts
//!
//! Each call races its own timer. Whichever settles first decides the outcome
//! and the other side is dropped: an expired timer drops the in-flight request
//! (aborting the transfer), a finished request drops the timer. Nothing is
//! shared between calls, so one call's budget never leaks into the next.
//!
//! ## What the client does not do
//!
//! - Validate image content (format, size, face presence). The backend decides.
//! - Retry. A retry is a fresh call made by the caller.
//! - Enforce single-flight. Callers keep at most one verify outstanding
//!   (see [`VerificationSession`](super::session::VerificationSession)).
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = ClientConfig::from_file("config/client.toml")?;
//! let client = VerifyClient::from_config(&config)?;
//!
//! client.spawn_warmup();
//!
//! let result = client
//!     .verify(&"file:///a.jpg".into(), &"file:///b.jpg".into())
//!     .await?;
//! println!("{:?}", result.overall_result);
//! ```

use anyhow::Context;
use log::{error, info, warn};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::background::spawn_best_effort;
use super::config::ClientConfig;
use super::error::VerifyError;
use super::image_source::{FileImageSource, ImageReference, ImageSource};
use super::metrics::ClientMetrics;
use crate::common::messages::VerificationResult;

pub const WARMUP_PATH: &str = "/api/warmup";
pub const VERIFY_PATH: &str = "/api/verify";

const JSON_MIME: &str = "application/json";
const JPEG_MIME: &str = "image/jpeg";

/// Multipart field names expected by the backend.
pub const ID_IMAGE_FIELD: &str = "id_image";
pub const SELFIE_IMAGE_FIELD: &str = "selfie_image";

/// The pair of images submitted for one verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub id_image: ImageReference,
    pub selfie_image: ImageReference,
}

impl VerificationRequest {
    pub fn new(id_image: impl Into<ImageReference>, selfie_image: impl Into<ImageReference>) -> Self {
        Self {
            id_image: id_image.into(),
            selfie_image: selfie_image.into(),
        }
    }

    /// Build a request from optional references, rejecting an incomplete pair.
    pub fn from_parts(
        id_image: Option<ImageReference>,
        selfie_image: Option<ImageReference>,
    ) -> Result<Self, VerifyError> {
        match (id_image, selfie_image) {
            (Some(id_image), Some(selfie_image)) => Ok(Self {
                id_image,
                selfie_image,
            }),
            _ => Err(VerifyError::MissingImages),
        }
    }
}

/// Client for the face-verification backend.
///
/// Cheap to clone: the underlying HTTP connection pool is shared.
#[derive(Clone)]
pub struct VerifyClient<S = FileImageSource> {
    /// Name used in log lines
    name: String,
    http: reqwest::Client,
    /// Backend base URL without trailing slash
    base_url: String,
    warmup_timeout: Duration,
    verify_timeout: Duration,
    images: S,
    metrics: Option<Arc<Mutex<ClientMetrics>>>,
}

impl VerifyClient<FileImageSource> {
    /// Creates a client reading images from the local filesystem.
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("face-verify/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            name: config.client.name.clone(),
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            warmup_timeout: config.timeouts.warmup(),
            verify_timeout: config.timeouts.verify(),
            images: FileImageSource,
            metrics: None,
        })
    }
}

impl<S: ImageSource> VerifyClient<S> {
    /// Replace the image source (e.g. a content-provider bridge on mobile).
    pub fn with_image_source<T: ImageSource>(self, images: T) -> VerifyClient<T> {
        VerifyClient {
            name: self.name,
            http: self.http,
            base_url: self.base_url,
            warmup_timeout: self.warmup_timeout,
            verify_timeout: self.verify_timeout,
            images,
            metrics: self.metrics,
        }
    }

    /// Record every verify call into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Mutex<ClientMetrics>>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn verify_timeout(&self) -> Duration {
        self.verify_timeout
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // WARMUP
    // ========================================================================

    /// Ask the backend to load its models, waiting for the answer.
    ///
    /// Never fails from the caller's point of view: every error, including the
    /// timeout, is logged and swallowed. Safe to call any number of times.
    pub async fn warmup(&self) {
        let url = self.endpoint(WARMUP_PATH);
        if let Err(e) = post_warmup(self.http.clone(), url, self.warmup_timeout).await {
            warn!("[API] {} warmup failed: {:#}", self.name, e);
        }
    }

    /// Fire the warmup in the background and return immediately.
    ///
    /// Verify calls made meanwhile are neither delayed nor affected by it.
    pub fn spawn_warmup(&self) {
        let http = self.http.clone();
        let url = self.endpoint(WARMUP_PATH);
        let timeout = self.warmup_timeout;
        spawn_best_effort("warmup", post_warmup(http, url, timeout));
    }

    // ========================================================================
    // VERIFY
    // ========================================================================

    /// Submit an ID photo and a selfie for verification.
    ///
    /// # Returns
    ///
    /// * `Ok(VerificationResult)` - the backend's body, unmodified. A `fail` or
    ///   `spoof_detected` verdict is still a successful call.
    /// * `Err(VerifyError)` - exactly one normalized error
    ///
    /// # Errors
    ///
    /// * [`VerifyError::ImageUnavailable`] - an image could not be read
    /// * [`VerifyError::Network`] - transport failure before a response
    /// * [`VerifyError::Timeout`] - the verify budget expired; the request was aborted
    /// * [`VerifyError::Server`] - non-success status, message from the error body
    /// * [`VerifyError::InvalidResponse`] - success status with an undecodable body
    pub async fn verify(
        &self,
        id_image: &ImageReference,
        selfie_image: &ImageReference,
    ) -> Result<VerificationResult, VerifyError> {
        let started = Instant::now();
        let outcome = self.verify_once(id_image, selfie_image).await;
        self.record(started.elapsed(), &outcome);
        outcome
    }

    /// Same as [`verify`](Self::verify) for a prepared request.
    pub async fn submit(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResult, VerifyError> {
        self.verify(&request.id_image, &request.selfie_image).await
    }

    async fn verify_once(
        &self,
        id_image: &ImageReference,
        selfie_image: &ImageReference,
    ) -> Result<VerificationResult, VerifyError> {
        let url = self.endpoint(VERIFY_PATH);
        info!("📤 [API] {} verify: POST {}", self.name, url);
        info!("[API] id_image: {}", id_image);
        info!("[API] selfie_image: {}", selfie_image);

        let started = Instant::now();

        // The budget covers reading the images too. Dropping the future on
        // expiry aborts whichever step is pending.
        let call = self.upload(&url, id_image, selfie_image);
        match tokio::time::timeout(self.verify_timeout, call).await {
            Ok(outcome) => {
                let elapsed = started.elapsed().as_millis();
                match &outcome {
                    Ok(result) => info!(
                        "✅ [API] verify: success in {}ms (overall_result={}, liveness={:?}, face_verified={:?})",
                        elapsed,
                        result
                            .overall_result
                            .as_ref()
                            .map(|r| r.as_str())
                            .unwrap_or("<absent>"),
                        result.is_real(),
                        result.face_verified()
                    ),
                    Err(e) => error!("❌ [API] verify: failed after {}ms: {}", elapsed, e),
                }
                outcome
            }
            Err(_) => {
                error!(
                    "❌ [API] verify: timed out after {}ms, request aborted",
                    started.elapsed().as_millis()
                );
                Err(VerifyError::Timeout {
                    after: self.verify_timeout,
                })
            }
        }
    }

    /// Read both images, send the multipart body and decode the answer.
    async fn upload(
        &self,
        url: &str,
        id_image: &ImageReference,
        selfie_image: &ImageReference,
    ) -> Result<VerificationResult, VerifyError> {
        let form = Form::new()
            .part(ID_IMAGE_FIELD, self.jpeg_part(ID_IMAGE_FIELD, id_image).await?)
            .part(
                SELFIE_IMAGE_FIELD,
                self.jpeg_part(SELFIE_IMAGE_FIELD, selfie_image).await?,
            );

        let request = self.http.post(url).header(ACCEPT, JSON_MIME).multipart(form);
        exchange(request).await
    }

    async fn jpeg_part(&self, field: &str, reference: &ImageReference) -> Result<Part, VerifyError> {
        let bytes = self
            .images
            .read(reference)
            .await
            .map_err(|e| VerifyError::ImageUnavailable {
                reference: reference.clone(),
                reason: e.to_string(),
            })?;

        image_part(field, reference, bytes, JPEG_MIME)
    }

    fn record(&self, latency: Duration, outcome: &Result<VerificationResult, VerifyError>) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let (completed, label) = match outcome {
            Ok(result) => (
                true,
                result
                    .overall_result
                    .as_ref()
                    .map(|r| r.as_str().to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
            Err(e) => (false, e.kind().to_string()),
        };
        match metrics.lock() {
            Ok(mut metrics) => metrics.record_call(latency, completed, &label),
            Err(_) => warn!("[API] metrics lock poisoned, call not recorded"),
        }
    }
}

/// Wrap image bytes as a named file part. A part that cannot be built counts
/// against the image, not the transport.
fn image_part(
    field: &str,
    reference: &ImageReference,
    bytes: Vec<u8>,
    mime: &str,
) -> Result<Part, VerifyError> {
    Part::bytes(bytes)
        .file_name(format!("{}.jpg", field))
        .mime_str(mime)
        .map_err(|e| VerifyError::ImageUnavailable {
            reference: reference.clone(),
            reason: format!("invalid content type {}: {}", mime, e),
        })
}

/// Send the verify request and turn the response into a result or one error.
async fn exchange(request: reqwest::RequestBuilder) -> Result<VerificationResult, VerifyError> {
    let response = request
        .send()
        .await
        .map_err(|e| VerifyError::Network(e.to_string()))?;

    let status = response.status();
    info!("[API] verify: response {}", status);

    let body = response
        .bytes()
        .await
        .map_err(|e| VerifyError::Network(e.to_string()))?;

    if !status.is_success() {
        let err = VerifyError::from_error_body(status.as_u16(), &body);
        error!("[API] verify: error {} {}", status.as_u16(), err);
        error!("[API] verify: error body {}", String::from_utf8_lossy(&body));
        return Err(err);
    }

    serde_json::from_slice::<VerificationResult>(&body)
        .map_err(|e| VerifyError::InvalidResponse(e.to_string()))
}

/// One warmup attempt bounded by `timeout`. Errors are for logging only.
async fn post_warmup(http: reqwest::Client, url: String, timeout: Duration) -> anyhow::Result<()> {
    info!("[API] warmup: POST {}", url);
    let started = Instant::now();

    let response = tokio::time::timeout(timeout, http.post(&url).header(ACCEPT, JSON_MIME).send())
        .await
        .map_err(|_| anyhow::anyhow!("timed out after {}s", timeout.as_secs()))?
        .context("warmup request failed")?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("backend answered {}", status);
    }

    info!(
        "✅ [API] warmup: models ready ({}ms)",
        started.elapsed().as_millis()
    );
    Ok(())
}
