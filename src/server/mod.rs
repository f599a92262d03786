//! # Development Backend
//!
//! A stand-in for the verification service, used for local runs of the client
//! and by the integration tests. It implements the HTTP contract only; liveness
//! and face matching are delegated to a [`Verifier`].

pub mod config;
pub mod server;
pub mod verifier;

pub use config::ServerConfig;
pub use server::{router, run, spawn_local};
pub use verifier::{ScriptedVerifier, Verifier};
