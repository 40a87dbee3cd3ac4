use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Three-state patch value for partial updates.
/// Unlike `Option<Option<T>>`, each variant is explicit at call sites.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    /// Field is not part of this update (no change).
    #[default]
    Absent,
    /// Field is explicitly cleared.
    Null,
    /// Field is set to a new value.
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// Apply this patch to an `Option<T>` slot, consuming the patch.
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Null => *slot = None,
            Patch::Value(v) => *slot = Some(v),
        }
    }
}

/// Lifecycle status of a document. Permanent deletion removes the row
/// entirely, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Active,
    Trashed,
}

/// A document record stored in redb.
///
/// Invariant: exactly one of `storage_key` (while active) or `trash_key`
/// (while trashed) names the live object. `status == Trashed` implies
/// `trash_key` is set; `status == Active` implies it is `None`.
/// `storage_key` is retained while trashed so restore can return the object
/// to its original location without reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub uid: String,
    pub file_name: String,
    pub storage_key: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub trash_key: Option<String>,
    pub mime_type: String,
    pub byte_size: u64,
    /// User ids authorized to view this document.
    #[serde(default)]
    pub shared_to: BTreeSet<String>,
    /// User ids that granted sharing of this document (provenance display).
    #[serde(default)]
    pub shared_from: BTreeSet<String>,
    /// Optimistic concurrency counter; every metadata mutation is conditioned
    /// on the version the caller last read.
    #[serde(default)]
    pub version: u64,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn is_owner(&self, uid: &str) -> bool {
        self.uid == uid
    }

    /// Whether `uid` may view this document: owner or named recipient.
    pub fn is_viewer(&self, uid: &str) -> bool {
        self.is_owner(uid) || self.shared_to.contains(uid)
    }
}

/// How a share grant admits viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareType {
    /// Gated on an approval flow that does not exist yet; always denies.
    Restricted,
    /// Anyone holding the link, until the cached URL expires.
    PublicLink,
}

impl ShareType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "restricted" => Some(ShareType::Restricted),
            "public_link" => Some(ShareType::PublicLink),
            _ => None,
        }
    }
}

/// A persisted share grant. Immutable once created: revocation deletes the
/// grant, and re-sharing creates a new one with a fresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareGrant {
    /// Unguessable token; doubles as the public share URL path segment.
    pub id: String,
    pub doc_id: String,
    pub granting_uid: String,
    pub share_type: ShareType,
    /// Cached capability URL, populated at creation for public links only.
    #[serde(default)]
    pub signed_url: Option<String>,
    /// Absolute expiry of `signed_url`.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A user identity, maintained by the (out of scope) account system.
/// Present here only so recipient emails can resolve to uids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
}

/// Partial update for a document row. Absent fields are left untouched;
/// `trash_key` uses `Patch` so it can be explicitly cleared on restore.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub file_name: Option<String>,
    pub storage_key: Option<String>,
    pub status: Option<DocumentStatus>,
    pub trash_key: Patch<String>,
    pub shared_to: Option<BTreeSet<String>>,
    pub shared_from: Option<BTreeSet<String>>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.file_name.is_none()
            && self.storage_key.is_none()
            && self.status.is_none()
            && self.trash_key.is_absent()
            && self.shared_to.is_none()
            && self.shared_from.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_apply() {
        let mut slot = Some("old".to_string());
        Patch::Absent.apply_to(&mut slot);
        assert_eq!(slot.as_deref(), Some("old"));

        Patch::Value("new".to_string()).apply_to(&mut slot);
        assert_eq!(slot.as_deref(), Some("new"));

        Patch::<String>::Null.apply_to(&mut slot);
        assert_eq!(slot, None);
    }

    #[test]
    fn test_share_type_parse() {
        assert_eq!(ShareType::parse("restricted"), Some(ShareType::Restricted));
        assert_eq!(ShareType::parse("public_link"), Some(ShareType::PublicLink));
        assert_eq!(ShareType::parse("public-link"), None);
        assert_eq!(ShareType::parse(""), None);
    }

    #[test]
    fn test_viewer_predicate() {
        let now = chrono::Utc::now();
        let mut doc = Document {
            id: "d1".into(),
            uid: "owner".into(),
            file_name: "report.pdf".into(),
            storage_key: "documents/owner/report.pdf".into(),
            status: DocumentStatus::Active,
            trash_key: None,
            mime_type: "application/pdf".into(),
            byte_size: 10,
            shared_to: BTreeSet::new(),
            shared_from: BTreeSet::new(),
            version: 1,
            uploaded_at: now,
            updated_at: now,
        };

        assert!(doc.is_viewer("owner"));
        assert!(!doc.is_viewer("guest"));

        doc.shared_to.insert("guest".to_string());
        assert!(doc.is_viewer("guest"));
        assert!(!doc.is_viewer("stranger"));
    }
}
