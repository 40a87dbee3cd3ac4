//! Shared helpers for doc-vault integration tests: a temp-backed environment
//! and failure-injecting adapter decorators for exercising partial-failure
//! paths.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use doc_vault::lifecycle::LifecycleEngine;
use doc_vault::object_store::{LocalStore, ObjectStore, ObjectStoreError};
use doc_vault::share::ShareEngine;
use doc_vault::storage::models::{Document, DocumentPatch, DocumentStatus, ShareGrant, UserRecord};
use doc_vault::storage::{Database, DatabaseError, MetadataStore};

pub struct TestEnv {
    // Held for its Drop; the temp dir outlives the stores.
    #[allow(dead_code)]
    pub dir: tempfile::TempDir,
    pub db: Database,
    pub store: Arc<LocalStore>,
}

pub fn test_env() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let store = Arc::new(
        LocalStore::new(dir.path().join("objects"), "http://localhost:8080", None).unwrap(),
    );
    TestEnv { dir, db, store }
}

pub fn lifecycle_engine(env: &TestEnv) -> LifecycleEngine {
    LifecycleEngine::new(Arc::new(env.db.clone()), env.store.clone())
}

pub fn share_engine(env: &TestEnv) -> ShareEngine {
    ShareEngine::new(
        Arc::new(env.db.clone()),
        env.store.clone(),
        Duration::from_secs(24 * 60 * 60),
        Duration::from_secs(10 * 60),
    )
}

pub fn sample_document(id: &str, uid: &str, file_name: &str) -> Document {
    let now = Utc::now();
    Document {
        id: id.to_string(),
        uid: uid.to_string(),
        file_name: file_name.to_string(),
        storage_key: format!("documents/{uid}/{file_name}"),
        status: DocumentStatus::Active,
        trash_key: None,
        mime_type: mime_guess::from_path(file_name)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        byte_size: 0,
        shared_to: BTreeSet::new(),
        shared_from: BTreeSet::new(),
        version: 1,
        uploaded_at: now,
        updated_at: now,
    }
}

/// Write the object bytes and insert the metadata row for a fresh document.
pub async fn seed_document(env: &TestEnv, id: &str, uid: &str, file_name: &str, content: &[u8]) -> Document {
    let mut doc = sample_document(id, uid, file_name);
    doc.byte_size = content.len() as u64;
    env.store
        .put(&doc.storage_key, Bytes::copy_from_slice(content), &doc.mime_type)
        .await
        .unwrap();
    env.db.put_document(&doc).unwrap();
    doc
}

pub fn seed_user(env: &TestEnv, id: &str, email: &str) {
    env.db
        .put_user(&UserRecord {
            id: id.to_string(),
            email: email.to_string(),
        })
        .unwrap();
}

// ============================================================================
// Failure-injecting decorators
// ============================================================================

/// Object store decorator with per-operation failure switches. `fail_remove_for`
/// fails `remove` only when the batch names one of the listed keys, so
/// best-effort cleanup of other keys still goes through.
pub struct FlakyStore {
    inner: Arc<LocalStore>,
    pub fail_copy: AtomicBool,
    pub fail_signed_url: AtomicBool,
    pub fail_remove_for: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<LocalStore>) -> Self {
        Self {
            inner,
            fail_copy: AtomicBool::new(false),
            fail_signed_url: AtomicBool::new(false),
            fail_remove_for: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_remove_of(&self, key: &str) {
        self.fail_remove_for.lock().unwrap().push(key.to_string());
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.inner.put(key, data, content_type).await
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        self.inner.get(key).await
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), ObjectStoreError> {
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("injected copy failure".into()));
        }
        self.inner.copy(src, dst).await
    }

    async fn remove(&self, keys: &[String]) -> Result<(), ObjectStoreError> {
        let should_fail = {
            let targeted = self.fail_remove_for.lock().unwrap();
            keys.iter().any(|k| targeted.contains(k))
        };
        if should_fail {
            return Err(ObjectStoreError::Backend("injected remove failure".into()));
        }
        self.inner.remove(keys).await
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, ObjectStoreError> {
        if self.fail_signed_url.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("injected signing failure".into()));
        }
        self.inner.signed_url(key, ttl).await
    }
}

/// Metadata store decorator that can fail writes after reads succeeded,
/// simulating a db outage at the worst point of a protocol.
pub struct FailingMeta {
    inner: Database,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FailingMeta {
    pub fn new(inner: Database) -> Self {
        Self {
            inner,
            fail_update: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    fn injected() -> DatabaseError {
        DatabaseError::from(std::io::Error::other("injected db failure"))
    }
}

#[async_trait]
impl MetadataStore for FailingMeta {
    async fn find_document(&self, id: &str) -> Result<Option<Document>, DatabaseError> {
        self.inner.find_document(id).await
    }

    async fn find_documents_by_ids_and_owner(
        &self,
        ids: &[String],
        uid: &str,
    ) -> Result<Vec<Document>, DatabaseError> {
        self.inner.find_documents_by_ids_and_owner(ids, uid).await
    }

    async fn update_document(
        &self,
        id: &str,
        uid: &str,
        patch: DocumentPatch,
        expected_version: u64,
    ) -> Result<Option<Document>, DatabaseError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        MetadataStore::update_document(&self.inner, id, uid, patch, expected_version).await
    }

    async fn delete_document(&self, id: &str, uid: &str) -> Result<bool, DatabaseError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        MetadataStore::delete_document(&self.inner, id, uid).await
    }

    async fn find_users_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserRecord>, DatabaseError> {
        MetadataStore::find_users_by_emails(&self.inner, emails).await
    }

    async fn insert_share(&self, grant: &ShareGrant) -> Result<(), DatabaseError> {
        MetadataStore::insert_share(&self.inner, grant).await
    }

    async fn find_share(&self, id: &str) -> Result<Option<ShareGrant>, DatabaseError> {
        self.inner.find_share(id).await
    }

    async fn delete_shares_for_document(
        &self,
        doc_id: &str,
        keep_restricted: bool,
    ) -> Result<u64, DatabaseError> {
        MetadataStore::delete_shares_for_document(&self.inner, doc_id, keep_restricted).await
    }
}
