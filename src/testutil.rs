//! Shared test helpers for doc-vault integration tests.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, NodeConfig, ShareConfig, StorageConfig};
use crate::lifecycle::LifecycleEngine;
use crate::object_store::LocalStore;
use crate::share::ShareEngine;
use crate::storage::{Database, MetadataStore};
use crate::AppState;

/// Create a test AppState with a temporary database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let objects_dir = temp_dir.path().join("objects");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig::default(),
        share: ShareConfig::default(),
        test_mode: true,
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let object_store = Arc::new(
        LocalStore::new(&objects_dir, "http://localhost:8080", None)
            .expect("Failed to create test object store"),
    );

    let meta: Arc<dyn MetadataStore> = Arc::new(db.clone());
    let lifecycle = LifecycleEngine::new(Arc::clone(&meta), object_store.clone());
    let shares = ShareEngine::new(
        Arc::clone(&meta),
        object_store.clone(),
        Duration::from_secs(config.share.public_link_ttl_secs),
        Duration::from_secs(config.share.access_link_ttl_secs),
    );

    Arc::new(AppState {
        config,
        db,
        object_store: object_store.clone(),
        local_blobs: Some(object_store),
        lifecycle,
        shares,
    })
}
