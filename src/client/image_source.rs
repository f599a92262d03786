//! # Image Sources
//!
//! The client never captures or decodes images itself. It receives opaque
//! [`ImageReference`]s from whatever picked the image (gallery, camera, CLI
//! argument) and asks an [`ImageSource`] for the bytes at upload time.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Opaque locator for a locally available image (path or `file://` URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageReference {
    fn from(locator: &str) -> Self {
        Self::new(locator)
    }
}

impl From<String> for ImageReference {
    fn from(locator: String) -> Self {
        Self(locator)
    }
}

#[derive(Debug, Error)]
pub enum ImageSourceError {
    #[error("unsupported image location scheme: {0}")]
    UnsupportedScheme(String),
    #[error("not a local file URI: {0}")]
    InvalidFileUri(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Capability that yields the bytes behind an [`ImageReference`].
pub trait ImageSource: Send + Sync {
    fn read(
        &self,
        reference: &ImageReference,
    ) -> impl Future<Output = Result<Vec<u8>, ImageSourceError>> + Send;
}

/// Reads images from the local filesystem.
///
/// Accepts plain paths (`/tmp/id.jpg`, `photos/selfie.jpg`) and `file://` URIs.
/// URIs are percent-decoded and may name `localhost` as their host.
#[derive(Debug, Clone, Default)]
pub struct FileImageSource;

impl FileImageSource {
    /// Map a reference to a filesystem path.
    pub fn resolve(reference: &ImageReference) -> Result<PathBuf, ImageSourceError> {
        let locator = reference.as_str();
        if locator.starts_with("file:") {
            return Url::parse(locator)
                .ok()
                .and_then(|uri| uri.to_file_path().ok())
                .ok_or_else(|| ImageSourceError::InvalidFileUri(locator.to_string()));
        }
        match locator.split_once("://") {
            Some((scheme, _)) => Err(ImageSourceError::UnsupportedScheme(scheme.to_string())),
            None => Ok(PathBuf::from(locator)),
        }
    }
}

impl ImageSource for FileImageSource {
    async fn read(&self, reference: &ImageReference) -> Result<Vec<u8>, ImageSourceError> {
        let path = Self::resolve(reference)?;
        Ok(tokio::fs::read(path).await?)
    }
}
