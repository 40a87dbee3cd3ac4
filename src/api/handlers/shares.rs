use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::response::{ApiError, AppJson, Identity, JSend};
use crate::share::{AccessLevel, AccessLink, RevokeMode, RevokeOutcome};
use crate::storage::models::{ShareType, UserRecord};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateShareRequest {
    pub share_type: String,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub share_id: String,
    /// Path to append to the service's public base URL.
    pub share_path: String,
    pub share_type: ShareType,
    pub signed_url: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddRecipientsRequest {
    pub emails: Vec<String>,
    #[serde(default = "default_access")]
    pub access: AccessLevel,
}

fn default_access() -> AccessLevel {
    AccessLevel::View
}

#[derive(Debug, Serialize)]
pub struct RecipientsResponse {
    pub added: Vec<UserRecord>,
    pub unresolved_emails: Vec<String>,
    pub shared_to: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub mode: RevokeMode,
    #[serde(default)]
    pub recipients: Option<Vec<String>>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_share(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    Path(id): Path<String>,
    AppJson(req): AppJson<CreateShareRequest>,
) -> Result<Json<JSend<ShareResponse>>, ApiError> {
    let share_type = ShareType::parse(&req.share_type).ok_or_else(|| {
        ApiError::bad_request(format!(
            "unknown share_type '{}' (expected restricted or public_link)",
            req.share_type
        ))
    })?;

    let grant = state.shares.create_share(&uid, &id, share_type).await?;

    Ok(JSend::success(ShareResponse {
        share_path: format!("/share/{}", grant.id),
        share_id: grant.id,
        share_type: grant.share_type,
        signed_url: grant.signed_url,
        expires_at: grant.expires_at.map(|t| t.to_rfc3339()),
    }))
}

pub async fn add_recipients(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    Path(id): Path<String>,
    AppJson(req): AppJson<AddRecipientsRequest>,
) -> Result<Json<JSend<RecipientsResponse>>, ApiError> {
    let report = state
        .shares
        .add_recipients(&uid, &id, &req.emails, req.access)
        .await?;

    Ok(JSend::success(RecipientsResponse {
        added: report.added,
        unresolved_emails: report.unresolved_emails,
        shared_to: report.document.shared_to.iter().cloned().collect(),
    }))
}

pub async fn revoke_share(
    State(state): State<Arc<AppState>>,
    Identity(uid): Identity,
    Path(id): Path<String>,
    AppJson(req): AppJson<RevokeRequest>,
) -> Result<Json<JSend<RevokeOutcome>>, ApiError> {
    let outcome = state
        .shares
        .revoke_share(&uid, &id, req.mode, req.recipients.as_deref())
        .await?;

    Ok(JSend::success(outcome))
}

/// Anonymous link access. No identity: the grant token is the credential.
pub async fn access_share(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
) -> Result<Json<JSend<AccessLink>>, ApiError> {
    let link = state.shares.access_public_grant(&share_id).await?;
    Ok(JSend::success(link))
}
