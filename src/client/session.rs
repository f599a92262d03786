//! # Verification Session
//!
//! Holds what a verification screen holds: the two chosen images and the
//! current presentation state. The session is where the single-flight
//! discipline lives; the client itself does not enforce it.
//!
//! ## State machine
//!
//! ```text
//! Idle ──submit──> Loading ──settle──> Completed(result)
//!   ^                 │                      │
//!   │                 ├──────settle──> Failed(message)
//!   │                 └─────abandon──> Failed("Verification cancelled")
//!   └────────────reset────────────────────────┘
//! ```
//!
//! `Loading`, `Failed` and `Completed` are mutually exclusive. Starting a new
//! submission or resetting replaces the previous result or error wholesale.
//!
//! For UIs that share the session across tasks, [`VerificationSession::begin`]
//! and [`VerificationSession::settle`] split a submission so that no lock is
//! held while the request is in flight.

use log::{info, warn};
use thiserror::Error;

use super::client::{VerificationRequest, VerifyClient};
use super::error::VerifyError;
use super::image_source::{ImageReference, ImageSource};
use crate::common::messages::VerificationResult;

/// Shown when a submission is dropped before it settled.
pub const CANCELLED_MESSAGE: &str = "Verification cancelled";

/// What the presentation layer should show.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ViewState {
    #[default]
    Idle,
    Loading,
    Failed(String),
    Completed(VerificationResult),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a verification is already in progress")]
    InFlight,
    #[error("Please provide both ID photo and selfie")]
    MissingImages,
}

#[derive(Debug, Default)]
pub struct VerificationSession {
    id_image: Option<ImageReference>,
    selfie_image: Option<ImageReference>,
    state: ViewState,
}

impl VerificationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_id_image(&mut self, image: Option<ImageReference>) {
        self.id_image = image;
    }

    pub fn set_selfie_image(&mut self, image: Option<ImageReference>) {
        self.selfie_image = image;
    }

    pub fn id_image(&self) -> Option<&ImageReference> {
        self.id_image.as_ref()
    }

    pub fn selfie_image(&self) -> Option<&ImageReference> {
        self.selfie_image.as_ref()
    }

    pub fn view_state(&self) -> &ViewState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == ViewState::Loading
    }

    /// Whether the verify action should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_loading() && self.id_image.is_some() && self.selfie_image.is_some()
    }

    /// Enter `Loading` and hand out the request to send.
    ///
    /// An incomplete pair moves the session to `Failed` without any network
    /// traffic. A session already in flight is left untouched.
    pub fn begin(&mut self) -> Result<VerificationRequest, SessionError> {
        if self.is_loading() {
            return Err(SessionError::InFlight);
        }

        match VerificationRequest::from_parts(self.id_image.clone(), self.selfie_image.clone()) {
            Ok(request) => {
                self.state = ViewState::Loading;
                Ok(request)
            }
            Err(e) => {
                self.state = ViewState::Failed(e.to_string());
                Err(SessionError::MissingImages)
            }
        }
    }

    /// Settle the in-flight submission. Ignored unless the session is `Loading`.
    pub fn settle(&mut self, outcome: Result<VerificationResult, VerifyError>) {
        if !self.is_loading() {
            warn!("Ignoring verification outcome: no submission in flight");
            return;
        }

        self.state = match outcome {
            Ok(result) => ViewState::Completed(result),
            Err(e) => {
                info!("Verification error ({}): {}", e.kind(), e);
                ViewState::Failed(e.to_string())
            }
        };
    }

    /// Give up on the in-flight submission. Ignored unless the session is `Loading`.
    ///
    /// A late outcome for the abandoned request is then dropped by [`settle`](Self::settle).
    pub fn abandon(&mut self) {
        if self.is_loading() {
            info!("Verification abandoned before it settled");
            self.state = ViewState::Failed(CANCELLED_MESSAGE.to_string());
        }
    }

    /// Run a full submission against `client` and return the settled state.
    ///
    /// If the returned future is dropped mid-flight (a `select!`, an outer
    /// timeout, a cancelled UI task) the session is abandoned rather than left
    /// in `Loading`.
    pub async fn submit<S: ImageSource>(
        &mut self,
        client: &VerifyClient<S>,
    ) -> Result<&ViewState, SessionError> {
        let request = self.begin()?;
        let guard = AbandonOnDrop(&mut *self);
        let outcome = client.submit(&request).await;
        guard.0.settle(outcome);
        drop(guard);
        Ok(&self.state)
    }

    /// Clear both images and any result or error.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.is_loading() {
            return Err(SessionError::InFlight);
        }
        *self = Self::default();
        Ok(())
    }
}

struct AbandonOnDrop<'a>(&'a mut VerificationSession);

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        self.0.abandon();
    }
}
