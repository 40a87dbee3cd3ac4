mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Abstraction over object storage backends. Keys are slash-separated paths
/// (`documents/{uid}/{name}`, `trash/{uid}/...`); the blobs are meaningless
/// without the metadata DB.
///
/// `copy` and `remove` are idempotent; the lifecycle protocols depend on
/// that, and on `signed_url` failing with `NotFound` for a missing key so a
/// short-TTL signing request doubles as an existence probe.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, content_type: &str)
        -> Result<(), ObjectStoreError>;

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;

    async fn copy(&self, src: &str, dst: &str) -> Result<(), ObjectStoreError>;

    /// Remove the given keys. Missing keys are not an error.
    async fn remove(&self, keys: &[String]) -> Result<(), ObjectStoreError>;

    /// Mint a time-limited capability URL for direct read access to `key`.
    /// Fails with `NotFound` when the object does not exist.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, ObjectStoreError>;
}
