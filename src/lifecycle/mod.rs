//! Document lifecycle engine: trash, restore, rename, and permanent delete
//! as multi-step protocols over the object store and the metadata store.
//!
//! There is no two-phase commit between the two stores, so every transition
//! orders its steps storage-first and names a point of no return: the first
//! `remove` after a successful `copy`. Before that point, any failure aborts
//! with nothing changed. After it, metadata-side failures degrade to recorded
//! warnings (trash/restore/purge) or trigger an explicit reverse-copy
//! rollback (rename), per the policy table in the protocol docs below.

pub mod batch;
pub mod paths;

pub use batch::{BatchOutcome, LifecycleAction};

use std::slice;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::EngineError;
use crate::object_store::ObjectStore;
use crate::storage::models::{Document, DocumentPatch, DocumentStatus, Patch};
use crate::storage::MetadataStore;

/// Why an item was skipped rather than processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyTrashed,
    NotTrashed,
    MissingTrashPath,
}

/// A secondary step that failed after the operation's primary effect
/// completed. The result is still a success; the caller decides whether
/// cleanup is warranted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialFailure {
    DbUpdateFailed,
    TrashRemoveFailed,
    StorageRemoveFailed,
    RowDeleteFailed,
}

/// Abort-class failure codes for per-item results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorCode {
    ObjectNotFound,
    CopyFailed,
    RemoveFailed,
    CannotReconstructOriginalPath,
    DbError,
}

/// Outcome of one document's transition. Batch callers scan these to tell
/// partial success from total failure; no aggregate status exists.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub id: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<PartialFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemErrorCode>,
    /// Adapter detail for operator diagnosis; not a stable contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ok,
    Skipped,
    Error,
}

impl ItemResult {
    fn ok(id: &str, warning: Option<PartialFailure>) -> Self {
        Self {
            id: id.to_string(),
            status: ItemStatus::Ok,
            reason: None,
            warning,
            error: None,
            detail: None,
        }
    }

    fn skipped(id: &str, reason: SkipReason) -> Self {
        Self {
            id: id.to_string(),
            status: ItemStatus::Skipped,
            reason: Some(reason),
            warning: None,
            error: None,
            detail: None,
        }
    }

    fn error(id: &str, code: ItemErrorCode, detail: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            status: ItemStatus::Error,
            reason: None,
            warning: None,
            error: Some(code),
            detail: Some(detail.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ItemStatus::Ok
    }
}

/// Orchestrates lifecycle transitions. Holds no mutable state; cheap to
/// clone into per-item batch tasks.
#[derive(Clone)]
pub struct LifecycleEngine {
    meta: Arc<dyn MetadataStore>,
    store: Arc<dyn ObjectStore>,
    probe_ttl: Duration,
}

impl LifecycleEngine {
    pub fn new(meta: Arc<dyn MetadataStore>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            meta,
            store,
            probe_ttl: Duration::from_secs(60),
        }
    }

    /// Move an active document's object into the trash location.
    ///
    /// Protocol: probe -> copy to `trash/{uid}/{key}` -> remove original ->
    /// metadata. Remove failure undoes the copy best-effort and fails the
    /// item; a metadata failure after the object has moved is a warning, not
    /// a rollback -- re-copying the object out of trash is no more reliable
    /// than the metadata write that just failed, and the object is on the
    /// recoverable side.
    pub async fn trash(&self, doc: &Document) -> ItemResult {
        if doc.status == DocumentStatus::Trashed {
            return ItemResult::skipped(&doc.id, SkipReason::AlreadyTrashed);
        }

        let trash_key = paths::trash_key_for(&doc.uid, &doc.storage_key);

        if let Err(e) = self.store.signed_url(&doc.storage_key, self.probe_ttl).await {
            return ItemResult::error(&doc.id, ItemErrorCode::ObjectNotFound, e);
        }

        if let Err(e) = self.store.copy(&doc.storage_key, &trash_key).await {
            return ItemResult::error(&doc.id, ItemErrorCode::CopyFailed, e);
        }

        // Point of no return once this remove succeeds.
        if let Err(e) = self.store.remove(slice::from_ref(&doc.storage_key)).await {
            if let Err(undo) = self.store.remove(slice::from_ref(&trash_key)).await {
                tracing::warn!(doc_id = %doc.id, error = %undo, "Failed to undo trash copy");
            }
            return ItemResult::error(&doc.id, ItemErrorCode::RemoveFailed, e);
        }

        let patch = DocumentPatch {
            status: Some(DocumentStatus::Trashed),
            trash_key: Patch::Value(trash_key.clone()),
            ..Default::default()
        };
        match self.meta.update_document(&doc.id, &doc.uid, patch, doc.version).await {
            Ok(Some(_)) => {
                tracing::debug!(doc_id = %doc.id, trash_key = %trash_key, "Trashed document");
                ItemResult::ok(&doc.id, None)
            }
            Ok(None) => {
                tracing::warn!(doc_id = %doc.id, "Document row vanished during trash");
                ItemResult::ok(&doc.id, Some(PartialFailure::DbUpdateFailed))
            }
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, error = %e, "Metadata update failed after trash move");
                ItemResult::ok(&doc.id, Some(PartialFailure::DbUpdateFailed))
            }
        }
    }

    /// Move a trashed document's object back to its original location.
    ///
    /// Mirrors `trash` in reverse. Failing to remove the trash copy leaves
    /// the object duplicated but accessible at the original key -- the safe
    /// side -- so it degrades to a warning rather than an abort.
    pub async fn restore(&self, doc: &Document) -> ItemResult {
        if doc.status != DocumentStatus::Trashed {
            return ItemResult::skipped(&doc.id, SkipReason::NotTrashed);
        }
        let Some(trash_key) = doc.trash_key.as_deref() else {
            return ItemResult::skipped(&doc.id, SkipReason::MissingTrashPath);
        };

        let dest = if !doc.storage_key.is_empty() {
            doc.storage_key.clone()
        } else {
            match paths::original_key_from_trash(&doc.uid, trash_key) {
                Some(key) => key,
                None => {
                    return ItemResult::error(
                        &doc.id,
                        ItemErrorCode::CannotReconstructOriginalPath,
                        format!("trash key {trash_key} has no recognizable prefix"),
                    )
                }
            }
        };

        if let Err(e) = self.store.signed_url(trash_key, self.probe_ttl).await {
            return ItemResult::error(&doc.id, ItemErrorCode::ObjectNotFound, e);
        }

        if let Err(e) = self.store.copy(trash_key, &dest).await {
            return ItemResult::error(&doc.id, ItemErrorCode::CopyFailed, e);
        }

        let mut warning = None;
        if let Err(e) = self.store.remove(&[trash_key.to_string()]).await {
            tracing::warn!(doc_id = %doc.id, error = %e, "Failed to remove trash copy after restore");
            warning = Some(PartialFailure::TrashRemoveFailed);
        }

        let patch = DocumentPatch {
            status: Some(DocumentStatus::Active),
            storage_key: Some(dest.clone()),
            trash_key: Patch::Null,
            ..Default::default()
        };
        match self.meta.update_document(&doc.id, &doc.uid, patch, doc.version).await {
            Ok(Some(_)) => {
                tracing::debug!(doc_id = %doc.id, storage_key = %dest, "Restored document");
            }
            Ok(None) => {
                tracing::warn!(doc_id = %doc.id, "Document row vanished during restore");
                warning = Some(PartialFailure::DbUpdateFailed);
            }
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, error = %e, "Metadata update failed after restore move");
                warning = Some(PartialFailure::DbUpdateFailed);
            }
        }
        ItemResult::ok(&doc.id, warning)
    }

    /// Irreversibly delete a trashed document: object first, then the row.
    ///
    /// Only reachable through the trash; an active document is skipped with
    /// `not_trashed`. Best-effort on both steps -- an orphaned object is
    /// operator-recoverable, an undeletable row is a worse failure for the
    /// user -- so either failure is a warning and the other step proceeds.
    pub async fn permanently_delete(&self, doc: &Document) -> ItemResult {
        if doc.status != DocumentStatus::Trashed {
            return ItemResult::skipped(&doc.id, SkipReason::NotTrashed);
        }
        let Some(trash_key) = doc.trash_key.as_deref() else {
            return ItemResult::skipped(&doc.id, SkipReason::MissingTrashPath);
        };

        let mut warning = None;
        if let Err(e) = self.store.remove(&[trash_key.to_string()]).await {
            tracing::warn!(doc_id = %doc.id, error = %e, "Failed to remove trashed object");
            warning = Some(PartialFailure::StorageRemoveFailed);
        }

        match self.meta.delete_document(&doc.id, &doc.uid).await {
            Ok(true) => {
                tracing::debug!(doc_id = %doc.id, "Permanently deleted document");
            }
            Ok(false) => {
                tracing::warn!(doc_id = %doc.id, "Document row already gone during permanent delete");
                warning = Some(PartialFailure::RowDeleteFailed);
            }
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, error = %e, "Row delete failed during permanent delete");
                warning = Some(PartialFailure::RowDeleteFailed);
            }
        }
        ItemResult::ok(&doc.id, warning)
    }

    /// Rename an active document, moving its object to the new key.
    ///
    /// The one transition that rolls storage back on a metadata failure:
    /// both ends of a rename are live representations, and two live copies
    /// under divergent metadata is strictly worse than attempting the undo.
    pub async fn rename(&self, doc: &Document, new_name: &str) -> Result<Document, EngineError> {
        if doc.status != DocumentStatus::Active {
            return Err(EngineError::Validation(
                "document is trashed; restore it before renaming".to_string(),
            ));
        }

        let name = paths::sanitize_file_name(new_name).ok_or_else(|| {
            EngineError::Validation("file name is empty after sanitization".to_string())
        })?;
        let new_key = paths::renamed_key(&doc.storage_key, &name);

        if new_key == doc.storage_key {
            return Ok(doc.clone());
        }

        self.store.signed_url(&doc.storage_key, self.probe_ttl).await?;
        self.store.copy(&doc.storage_key, &new_key).await?;

        if let Err(e) = self.store.remove(slice::from_ref(&doc.storage_key)).await {
            // Both copies must not coexist; drop the new one and fail.
            if let Err(undo) = self.store.remove(slice::from_ref(&new_key)).await {
                tracing::warn!(doc_id = %doc.id, error = %undo, "Failed to undo rename copy");
            }
            return Err(EngineError::Storage(e));
        }

        let patch = DocumentPatch {
            file_name: Some(name),
            storage_key: Some(new_key.clone()),
            ..Default::default()
        };
        match self.meta.update_document(&doc.id, &doc.uid, patch, doc.version).await {
            Ok(Some(updated)) => {
                tracing::debug!(doc_id = %doc.id, storage_key = %new_key, "Renamed document");
                Ok(updated)
            }
            Ok(None) => {
                self.rollback_rename(&doc.id, &new_key, &doc.storage_key).await;
                Err(EngineError::NotFound)
            }
            Err(e) => {
                self.rollback_rename(&doc.id, &new_key, &doc.storage_key).await;
                Err(e.into())
            }
        }
    }

    /// Restore the pre-rename storage state exactly: copy the object back to
    /// the old key and drop the new one.
    async fn rollback_rename(&self, doc_id: &str, new_key: &str, old_key: &str) {
        if let Err(e) = self.store.copy(new_key, old_key).await {
            tracing::error!(
                doc_id = %doc_id,
                new_key = %new_key,
                error = %e,
                "Rename rollback failed; object stranded at new key"
            );
            return;
        }
        if let Err(e) = self.store.remove(&[new_key.to_string()]).await {
            tracing::warn!(doc_id = %doc_id, error = %e, "Failed to remove new key during rename rollback");
        }
    }
}
