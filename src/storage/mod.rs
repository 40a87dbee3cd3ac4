pub mod db;
mod documents;
pub mod models;
mod shares;
mod tables;
mod users;

pub use db::{Database, DatabaseError};
pub use tables::*;

use async_trait::async_trait;

use models::{Document, DocumentPatch, ShareGrant, UserRecord};

/// Capability contract for the metadata side of the system, as consumed by
/// the lifecycle and share engines. `Database` is the production
/// implementation; tests substitute failure-injecting decorators.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn find_document(&self, id: &str) -> Result<Option<Document>, DatabaseError>;

    async fn find_documents_by_ids_and_owner(
        &self,
        ids: &[String],
        uid: &str,
    ) -> Result<Vec<Document>, DatabaseError>;

    /// Partial update conditioned on `expected_version`. `Ok(None)` means the
    /// row is missing or not owned by `uid`; a version mismatch is
    /// `DatabaseError::VersionConflict`.
    async fn update_document(
        &self,
        id: &str,
        uid: &str,
        patch: DocumentPatch,
        expected_version: u64,
    ) -> Result<Option<Document>, DatabaseError>;

    async fn delete_document(&self, id: &str, uid: &str) -> Result<bool, DatabaseError>;

    async fn find_users_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserRecord>, DatabaseError>;

    async fn insert_share(&self, grant: &ShareGrant) -> Result<(), DatabaseError>;

    async fn find_share(&self, id: &str) -> Result<Option<ShareGrant>, DatabaseError>;

    async fn delete_shares_for_document(
        &self,
        doc_id: &str,
        keep_restricted: bool,
    ) -> Result<u64, DatabaseError>;
}

#[async_trait]
impl MetadataStore for Database {
    async fn find_document(&self, id: &str) -> Result<Option<Document>, DatabaseError> {
        self.get_document(id)
    }

    async fn find_documents_by_ids_and_owner(
        &self,
        ids: &[String],
        uid: &str,
    ) -> Result<Vec<Document>, DatabaseError> {
        self.get_documents_by_ids_and_owner(ids, uid)
    }

    async fn update_document(
        &self,
        id: &str,
        uid: &str,
        patch: DocumentPatch,
        expected_version: u64,
    ) -> Result<Option<Document>, DatabaseError> {
        Database::update_document(self, id, uid, patch, expected_version)
    }

    async fn delete_document(&self, id: &str, uid: &str) -> Result<bool, DatabaseError> {
        Database::delete_document(self, id, uid)
    }

    async fn find_users_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserRecord>, DatabaseError> {
        Database::find_users_by_emails(self, emails)
    }

    async fn insert_share(&self, grant: &ShareGrant) -> Result<(), DatabaseError> {
        Database::insert_share(self, grant)
    }

    async fn find_share(&self, id: &str) -> Result<Option<ShareGrant>, DatabaseError> {
        self.get_share(id)
    }

    async fn delete_shares_for_document(
        &self,
        doc_id: &str,
        keep_restricted: bool,
    ) -> Result<u64, DatabaseError> {
        Database::delete_shares_for_document(self, doc_id, keep_restricted)
    }
}
