use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use bytes::BytesMut;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::response::{ApiError, AppJson, AppQuery, Identity, JSend};
use crate::lifecycle::paths::sanitize_file_name;
use crate::lifecycle::{BatchOutcome, LifecycleAction};
use crate::share::AccessLink;
use crate::storage::models::{Document, DocumentStatus};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    pub byte_size: u64,
    pub status: DocumentStatus,
    pub storage_key: String,
    pub trash_key: Option<String>,
    pub shared_to: Vec<String>,
    pub shared_from: Vec<String>,
    pub uploaded_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsParams {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub file_name: String,
}

/// A lifecycle request addressing one document or a set. Supplying both
/// forms at once is ambiguous and rejected.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ids: Option<Vec<String>>,
}

impl BatchRequest {
    fn into_ids(self) -> Result<Vec<String>, ApiError> {
        match (self.id, self.ids) {
            (Some(_), Some(_)) => Err(ApiError::bad_request(
                "supply either id or ids, not both",
            )),
            (Some(id), None) => Ok(vec![id]),
            (None, Some(ids)) => Ok(ids),
            (None, None) => Err(ApiError::bad_request("id or ids is required")),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    mut multipart: Multipart,
) -> Result<Json<JSend<DocumentResponse>>, ApiError> {
    let mut file_data: Option<BytesMut> = None;
    let mut file_name: Option<String> = None;
    let mut file_content_type: Option<String> = None;
    let mut name_override: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                let mut buf = BytesMut::with_capacity(data.len());
                buf.extend_from_slice(&data);
                file_data = Some(buf);
            }
            "file_name" => {
                name_override = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid file_name: {e}")))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("file field is required"))?;

    let raw_name = name_override
        .or(file_name.clone())
        .ok_or_else(|| ApiError::bad_request("file_name field or an upload filename is required"))?;
    let file_name = sanitize_file_name(&raw_name)
        .ok_or_else(|| ApiError::bad_request("file name is empty after sanitization"))?;

    let storage_key = format!("documents/{uid}/{file_name}");

    // One key per live document; a second upload under the same name must
    // rename or replace explicitly.
    let existing = state
        .db
        .list_documents_by_owner(&uid, None)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    if existing.iter().any(|d| d.storage_key == storage_key) {
        return Err(ApiError::conflict(format!(
            "a document named '{file_name}' already exists"
        )));
    }

    // Determine MIME type: from multipart Content-Type, or guess from filename, or fallback
    let mime_type = file_content_type
        .filter(|ct| ct != "application/octet-stream")
        .or_else(|| {
            mime_guess::from_path(&file_name)
                .first()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let byte_size = file_data.len() as u64;
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();

    // Phase 1: Upload bytes to object storage
    state
        .object_store
        .put(&storage_key, file_data.freeze(), &mime_type)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store file: {e}")))?;

    // Phase 2: Write metadata
    let doc = Document {
        id: id.clone(),
        uid: uid.clone(),
        file_name,
        storage_key: storage_key.clone(),
        status: DocumentStatus::Active,
        trash_key: None,
        mime_type,
        byte_size,
        shared_to: BTreeSet::new(),
        shared_from: BTreeSet::new(),
        version: 1,
        uploaded_at: now,
        updated_at: now,
    };

    if let Err(e) = state.db.put_document(&doc) {
        // Best-effort cleanup of the uploaded blob
        let _ = state.object_store.remove(&[storage_key]).await;
        return Err(ApiError::internal(e.to_string()));
    }

    tracing::debug!(doc_id = %id, uid = %uid, "Uploaded document");

    Ok(JSend::success(doc_to_response(&doc)))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    AppQuery(params): AppQuery<ListDocumentsParams>,
) -> Result<Json<JSend<Vec<DocumentResponse>>>, ApiError> {
    let status = match params.status.as_deref() {
        None => None,
        Some("active") => Some(DocumentStatus::Active),
        Some("trashed") => Some(DocumentStatus::Trashed),
        Some(other) => {
            return Err(ApiError::bad_request(format!(
                "unknown status '{other}' (expected active or trashed)"
            )))
        }
    };

    let docs = state
        .db
        .list_documents_by_owner(&uid, status)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(docs.iter().map(doc_to_response).collect()))
}

pub async fn shared_with_me(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
) -> Result<Json<JSend<Vec<DocumentResponse>>>, ApiError> {
    let docs = state
        .db
        .list_documents_shared_with(&uid)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(docs.iter().map(doc_to_response).collect()))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    Path(id): Path<String>,
) -> Result<Json<JSend<DocumentResponse>>, ApiError> {
    let doc = state.shares.resolve_viewer(&uid, &id).await?;
    Ok(JSend::success(doc_to_response(&doc)))
}

pub async fn rename_document(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    Path(id): Path<String>,
    AppJson(req): AppJson<RenameRequest>,
) -> Result<Json<JSend<DocumentResponse>>, ApiError> {
    let doc = state
        .db
        .get_document(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .filter(|d| d.is_owner(&uid))
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    let updated = state.lifecycle.rename(&doc, &req.file_name).await?;
    Ok(JSend::success(doc_to_response(&updated)))
}

pub async fn open_document(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    Path(id): Path<String>,
) -> Result<Json<JSend<AccessLink>>, ApiError> {
    let link = state.shares.open_document(&uid, &id).await?;
    Ok(JSend::success(link))
}

pub async fn trash_documents(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    AppJson(req): AppJson<BatchRequest>,
) -> Result<Json<JSend<BatchOutcome>>, ApiError> {
    run_batch(&state, &uid, req, LifecycleAction::Trash).await
}

pub async fn restore_documents(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    AppJson(req): AppJson<BatchRequest>,
) -> Result<Json<JSend<BatchOutcome>>, ApiError> {
    run_batch(&state, &uid, req, LifecycleAction::Restore).await
}

pub async fn purge_documents(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    AppJson(req): AppJson<BatchRequest>,
) -> Result<Json<JSend<BatchOutcome>>, ApiError> {
    run_batch(&state, &uid, req, LifecycleAction::PermanentlyDelete).await
}

async fn run_batch(
    state: &AppState,
    uid: &str,
    req: BatchRequest,
    action: LifecycleAction,
) -> Result<Json<JSend<BatchOutcome>>, ApiError> {
    let ids = req.into_ids()?;
    let outcome = state.lifecycle.run_batch(uid, &ids, action).await?;
    Ok(JSend::success(outcome))
}

// ============================================================================
// Helpers
// ============================================================================

fn doc_to_response(doc: &Document) -> DocumentResponse {
    DocumentResponse {
        id: doc.id.clone(),
        file_name: doc.file_name.clone(),
        mime_type: doc.mime_type.clone(),
        byte_size: doc.byte_size,
        status: doc.status,
        storage_key: doc.storage_key.clone(),
        trash_key: doc.trash_key.clone(),
        shared_to: doc.shared_to.iter().cloned().collect(),
        shared_from: doc.shared_from.iter().cloned().collect(),
        uploaded_at: doc.uploaded_at.to_rfc3339(),
        updated_at: doc.updated_at.to_rfc3339(),
    }
}
