//! Object storage providers for rendered assets.
//!
//! This crate provides:
//! - The `StorageProvider` trait with a coarse per-object upload observer
//! - A local-disk backend for development and tests
//! - A remote backend speaking the presigned-URL envelope
//!   (presign -> streaming PUT -> completion notice)
//! - Retry with exponential backoff and full jitter
//! - Size gating and ETag enforcement

pub mod error;
pub mod local;
pub mod provider;
pub mod remote;
pub mod retry;

pub use error::{StorageError, StorageResult};
pub use local::{LocalStorage, LocalStorageConfig};
pub use provider::{NoopObserver, StorageProvider, UploadObserver, UploadResult};
pub use remote::{RemoteStorage, RemoteStorageConfig};
pub use retry::{with_retry, RetryConfig};
