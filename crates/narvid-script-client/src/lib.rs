//! Client for the script authority.
//!
//! This crate provides:
//! - The `ScriptSnapshotFetcher` trait the job service depends on
//! - An HTTP implementation against the script authority
//! - Typed mapping of 404/401/403/5xx responses
//! - Validation/normalization of fetched render specifications

pub mod client;
pub mod error;

pub use client::{HttpScriptClient, ScriptClientConfig, ScriptSnapshotFetcher};
pub use error::{ScriptClientError, ScriptClientResult};
