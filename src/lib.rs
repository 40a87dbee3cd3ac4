//! doc-vault - A document management backend with trash/restore lifecycle and link sharing
//!
//! This crate keeps an object-storage backend and a metadata store mutually
//! consistent across multi-step document operations, with:
//! - Swappable object storage backends (local filesystem, GCS) with signed URLs
//! - A trash/restore/rename/permanent-delete lifecycle engine with explicit
//!   per-transition rollback policy
//! - Owner / named-recipient / anonymous-link sharing with expiring credentials
//! - redb embedded database for metadata (ACID, MVCC, crash-safe)
//! - REST API with multipart upload support

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod object_store;
pub mod share;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use lifecycle::LifecycleEngine;
use object_store::LocalStore;
use share::ShareEngine;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub object_store: Arc<dyn object_store::ObjectStore>,
    /// Set when the local backend is active; the `/blob/*key` route verifies
    /// and serves its capability URLs.
    pub local_blobs: Option<Arc<LocalStore>>,
    pub lifecycle: LifecycleEngine,
    pub shares: ShareEngine,
}
