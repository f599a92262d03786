pub mod client;
pub mod common;
pub mod server;

pub use client::{VerificationSession, VerifyClient, VerifyError};
pub use common::messages::{OverallResult, VerificationResult};
