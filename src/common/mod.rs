//! # Common Components
//!
//! Shared utilities and data structures used by both the verification client
//! and the development backend.
//!
//! ## Modules
//!
//! - [`messages`]: Wire types for the `/api/verify` JSON contract
//! - [`config`]: Configuration parsing utilities
//! - [`logging`]: Logger setup shared by the binaries

pub mod config;
pub mod logging;
pub mod messages;
