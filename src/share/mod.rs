//! Share authorization engine: grant issuance and revocation, recipient
//! management, viewer resolution, and anonymous link access.
//!
//! Two freshness policies coexist on purpose. Public links are minted once
//! with a long TTL and cached on the grant, and an expired link stays
//! expired until the owner refreshes it -- regeneration is an explicit owner
//! action, never a side effect of someone hitting the link. Authenticated
//! open/download mints a fresh short-TTL URL per access instead.

mod viewer;

pub use viewer::ViewerStrategy;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::object_store::ObjectStore;
use crate::storage::models::{
    Document, DocumentPatch, DocumentStatus, ShareGrant, ShareType, UserRecord,
};
use crate::storage::MetadataStore;

/// Requested access for new recipients. The authorization model currently
/// only gates viewing, so both levels resolve to `shared_to` membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    View,
    Edit,
}

/// Who is revoking, which decides what gets cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevokeMode {
    /// The owner: clears all (or the named subset of) recipients and deletes
    /// every non-restricted grant, invalidating cached URLs.
    Owner,
    /// A recipient removing themselves; idempotent, no owner involvement.
    Recipient,
}

/// Result of `add_recipients`. Unresolvable emails are reported, never
/// silently dropped.
#[derive(Debug, Serialize)]
pub struct RecipientReport {
    pub added: Vec<UserRecord>,
    pub unresolved_emails: Vec<String>,
    #[serde(skip)]
    pub document: Document,
}

#[derive(Debug, Serialize)]
pub struct RevokeOutcome {
    pub removed_recipients: u64,
    pub deleted_grants: u64,
}

/// A minted access link for an authenticated viewer or a link holder.
#[derive(Debug, Serialize)]
pub struct AccessLink {
    pub url: String,
    pub viewer: ViewerStrategy,
    pub file_name: String,
    pub mime_type: String,
    pub expires_at: DateTime<Utc>,
}

/// Orchestrates share state. Holds no mutable state of its own.
#[derive(Clone)]
pub struct ShareEngine {
    meta: Arc<dyn MetadataStore>,
    store: Arc<dyn ObjectStore>,
    public_link_ttl: Duration,
    access_link_ttl: Duration,
}

impl ShareEngine {
    pub fn new(
        meta: Arc<dyn MetadataStore>,
        store: Arc<dyn ObjectStore>,
        public_link_ttl: Duration,
        access_link_ttl: Duration,
    ) -> Self {
        Self {
            meta,
            store,
            public_link_ttl,
            access_link_ttl,
        }
    }

    /// Create a grant for a document the caller owns.
    ///
    /// Public links get a signed URL immediately, cached on the grant with an
    /// absolute expiry. Restricted grants mint nothing: they gate on an
    /// approval flow that does not exist yet and deny every access.
    pub async fn create_share(
        &self,
        owner: &str,
        doc_id: &str,
        share_type: ShareType,
    ) -> Result<ShareGrant, EngineError> {
        let doc = self.owned_document(owner, doc_id).await?;

        let (signed_url, expires_at) = match share_type {
            ShareType::PublicLink => {
                let url = self
                    .store
                    .signed_url(&doc.storage_key, self.public_link_ttl)
                    .await?;
                let expires =
                    Utc::now() + chrono::Duration::seconds(self.public_link_ttl.as_secs() as i64);
                (Some(url), Some(expires))
            }
            ShareType::Restricted => (None, None),
        };

        let grant = ShareGrant {
            id: uuid::Uuid::new_v4().to_string(),
            doc_id: doc.id.clone(),
            granting_uid: owner.to_string(),
            share_type,
            signed_url,
            expires_at,
            created_at: Utc::now(),
        };
        self.meta.insert_share(&grant).await?;

        tracing::debug!(doc_id = %doc.id, grant_id = %grant.id, share_type = ?share_type, "Created share grant");
        Ok(grant)
    }

    /// Resolve recipient emails and union them into the document's
    /// `shared_to` set. Owner only.
    pub async fn add_recipients(
        &self,
        owner: &str,
        doc_id: &str,
        emails: &[String],
        _access: AccessLevel,
    ) -> Result<RecipientReport, EngineError> {
        if emails.is_empty() {
            return Err(EngineError::Validation(
                "at least one recipient email is required".to_string(),
            ));
        }
        let doc = self.owned_document(owner, doc_id).await?;

        let users = self.meta.find_users_by_emails(emails).await?;
        let resolved: BTreeSet<&str> = users.iter().map(|u| u.email.as_str()).collect();
        let mut unresolved_emails: Vec<String> = emails
            .iter()
            .filter(|e| !resolved.contains(e.as_str()))
            .cloned()
            .collect();
        unresolved_emails.dedup();

        let mut shared_to = doc.shared_to.clone();
        let mut added = Vec::new();
        for user in users {
            // Sharing with yourself is a no-op, not an error.
            if user.id != doc.uid && shared_to.insert(user.id.clone()) {
                added.push(user);
            }
        }

        let mut shared_from = doc.shared_from.clone();
        shared_from.insert(owner.to_string());

        let patch = DocumentPatch {
            shared_to: Some(shared_to),
            shared_from: Some(shared_from),
            ..Default::default()
        };
        let document = self
            .meta
            .update_document(&doc.id, &doc.uid, patch, doc.version)
            .await?
            .ok_or(EngineError::NotFound)?;

        tracing::debug!(doc_id = %doc.id, added = added.len(), unresolved = unresolved_emails.len(), "Added recipients");
        Ok(RecipientReport {
            added,
            unresolved_emails,
            document,
        })
    }

    /// Authorization predicate: the owner and named recipients may view.
    /// Everyone else gets the same not-found denial as a missing document,
    /// so unauthorized callers cannot probe for existence.
    pub async fn resolve_viewer(
        &self,
        requester: &str,
        doc_id: &str,
    ) -> Result<Document, EngineError> {
        match self.meta.find_document(doc_id).await? {
            Some(doc) if doc.is_viewer(requester) => Ok(doc),
            _ => Err(EngineError::NotFound),
        }
    }

    /// Mint a fresh short-TTL access link for an authenticated viewer.
    pub async fn open_document(
        &self,
        requester: &str,
        doc_id: &str,
    ) -> Result<AccessLink, EngineError> {
        let doc = self.resolve_viewer(requester, doc_id).await?;
        if doc.status != DocumentStatus::Active {
            return Err(EngineError::Validation(
                "document is in the trash; restore it first".to_string(),
            ));
        }

        let url = self
            .store
            .signed_url(&doc.storage_key, self.access_link_ttl)
            .await?;
        let viewer = ViewerStrategy::for_file_name(&doc.file_name);

        Ok(AccessLink {
            url: viewer.view_url(&url),
            viewer,
            file_name: doc.file_name,
            mime_type: doc.mime_type,
            expires_at: Utc::now()
                + chrono::Duration::seconds(self.access_link_ttl.as_secs() as i64),
        })
    }

    /// Anonymous access through a grant token.
    ///
    /// Restricted grants deny unconditionally. Public links serve the cached
    /// URL while it is fresh and signal `LinkExpired` -- distinct from
    /// not-found -- once it is not, instructing the owner to refresh.
    pub async fn access_public_grant(&self, share_id: &str) -> Result<AccessLink, EngineError> {
        let grant = self
            .meta
            .find_share(share_id)
            .await?
            .ok_or(EngineError::NotFound)?;

        if grant.share_type == ShareType::Restricted {
            return Err(EngineError::AccessRestricted);
        }

        // Grant validity is tied to the document's continued existence.
        let doc = self
            .meta
            .find_document(&grant.doc_id)
            .await?
            .ok_or(EngineError::NotFound)?;

        match (grant.signed_url, grant.expires_at) {
            (Some(url), Some(expires_at)) if Utc::now() < expires_at => {
                let viewer = ViewerStrategy::for_file_name(&doc.file_name);
                Ok(AccessLink {
                    url: viewer.view_url(&url),
                    viewer,
                    file_name: doc.file_name,
                    mime_type: doc.mime_type,
                    expires_at,
                })
            }
            _ => Err(EngineError::LinkExpired),
        }
    }

    /// Revoke sharing. See `RevokeMode` for what each mode clears.
    pub async fn revoke_share(
        &self,
        requester: &str,
        doc_id: &str,
        mode: RevokeMode,
        recipients: Option<&[String]>,
    ) -> Result<RevokeOutcome, EngineError> {
        match mode {
            RevokeMode::Owner => {
                let doc = self.owned_document(requester, doc_id).await?;

                let new_shared_to: BTreeSet<String> = match recipients {
                    Some(subset) => {
                        let drop: BTreeSet<&str> = subset.iter().map(|s| s.as_str()).collect();
                        doc.shared_to
                            .iter()
                            .filter(|uid| !drop.contains(uid.as_str()))
                            .cloned()
                            .collect()
                    }
                    None => BTreeSet::new(),
                };
                let removed_recipients = (doc.shared_to.len() - new_shared_to.len()) as u64;

                let patch = DocumentPatch {
                    shared_to: Some(new_shared_to),
                    ..Default::default()
                };
                self.meta
                    .update_document(&doc.id, &doc.uid, patch, doc.version)
                    .await?
                    .ok_or(EngineError::NotFound)?;

                let deleted_grants = self
                    .meta
                    .delete_shares_for_document(&doc.id, true)
                    .await?;

                tracing::debug!(doc_id = %doc.id, removed_recipients, deleted_grants, "Owner revoked sharing");
                Ok(RevokeOutcome {
                    removed_recipients,
                    deleted_grants,
                })
            }
            RevokeMode::Recipient => {
                let doc = self
                    .meta
                    .find_document(doc_id)
                    .await?
                    .ok_or(EngineError::NotFound)?;

                if !doc.shared_to.contains(requester) {
                    // Already absent; leaving twice is fine.
                    return Ok(RevokeOutcome {
                        removed_recipients: 0,
                        deleted_grants: 0,
                    });
                }

                let mut shared_to = doc.shared_to.clone();
                shared_to.remove(requester);
                let patch = DocumentPatch {
                    shared_to: Some(shared_to),
                    ..Default::default()
                };
                self.meta
                    .update_document(&doc.id, &doc.uid, patch, doc.version)
                    .await?
                    .ok_or(EngineError::NotFound)?;

                tracing::debug!(doc_id = %doc.id, uid = %requester, "Recipient left shared document");
                Ok(RevokeOutcome {
                    removed_recipients: 1,
                    deleted_grants: 0,
                })
            }
        }
    }

    async fn owned_document(&self, owner: &str, doc_id: &str) -> Result<Document, EngineError> {
        match self.meta.find_document(doc_id).await? {
            Some(doc) if doc.is_owner(owner) => Ok(doc),
            _ => Err(EngineError::NotFound),
        }
    }
}
