use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{Document, DocumentPatch, DocumentStatus};
use super::tables::*;

impl Database {
    // ========================================================================
    // Document operations
    // ========================================================================

    /// Store a new document record and update the owner and recipient indexes.
    pub fn put_document(&self, doc: &Document) -> Result<(), DatabaseError> {
        debug_assert!(!doc.id.is_empty(), "document id must not be empty");
        debug_assert!(!doc.uid.is_empty(), "document owner must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(DOCUMENTS)?;
            let data = rmp_serde::to_vec_named(doc)?;
            table.insert(doc.id.as_str(), data.as_slice())?;

            index_insert(&write_txn, OWNER_DOCS, &doc.uid, &doc.id)?;
            for recipient in &doc.shared_to {
                index_insert(&write_txn, SHARED_DOCS, recipient, &doc.id)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a document by its UUID
    pub fn get_document(&self, id: &str) -> Result<Option<Document>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;

        match table.get(id)? {
            Some(data) => {
                let doc: Document = rmp_serde::from_slice(data.value())?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Resolve the subset of `ids` that exist and belong to `uid`, in the
    /// order requested. Unmatched ids are simply absent from the result;
    /// callers report them separately.
    pub fn get_documents_by_ids_and_owner(
        &self,
        ids: &[String],
        uid: &str,
    ) -> Result<Vec<Document>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;

        let mut docs = Vec::new();
        for id in ids {
            if let Some(data) = table.get(id.as_str())? {
                let doc: Document = rmp_serde::from_slice(data.value())?;
                if doc.uid == uid {
                    docs.push(doc);
                }
            }
        }
        Ok(docs)
    }

    /// List all documents owned by `uid`, optionally filtered by status.
    pub fn list_documents_by_owner(
        &self,
        uid: &str,
        status: Option<DocumentStatus>,
    ) -> Result<Vec<Document>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(OWNER_DOCS)?;
        let docs_table = read_txn.open_table(DOCUMENTS)?;

        let ids: Vec<String> = match index.get(uid)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut docs = Vec::new();
        for id in ids {
            if let Some(data) = docs_table.get(id.as_str())? {
                let doc: Document = rmp_serde::from_slice(data.value())?;
                if status.is_none_or(|s| doc.status == s) {
                    docs.push(doc);
                }
            }
        }
        Ok(docs)
    }

    /// List all documents shared to `uid` by someone else.
    pub fn list_documents_shared_with(&self, uid: &str) -> Result<Vec<Document>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(SHARED_DOCS)?;
        let docs_table = read_txn.open_table(DOCUMENTS)?;

        let ids: Vec<String> = match index.get(uid)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut docs = Vec::new();
        for id in ids {
            if let Some(data) = docs_table.get(id.as_str())? {
                let doc: Document = rmp_serde::from_slice(data.value())?;
                // Index entries can outlive a revocation race; trust the row.
                if doc.shared_to.contains(uid) {
                    docs.push(doc);
                }
            }
        }
        Ok(docs)
    }

    /// Apply a partial update to a document owned by `uid`, conditioned on
    /// `expected_version` matching the stored row. Bumps the version and
    /// `updated_at`, and keeps the recipient index in sync when `shared_to`
    /// changes.
    ///
    /// Returns the updated document, `None` when the row is missing or not
    /// owned by `uid`, or `DatabaseError::VersionConflict` when another
    /// writer got there first.
    pub fn update_document(
        &self,
        id: &str,
        uid: &str,
        patch: DocumentPatch,
        expected_version: u64,
    ) -> Result<Option<Document>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing = {
            let table = write_txn.open_table(DOCUMENTS)?;
            let found = match table.get(id)? {
                Some(data) => {
                    let doc: Document = rmp_serde::from_slice(data.value())?;
                    Some(doc)
                }
                None => None,
            };
            found
        };

        let updated = match existing {
            Some(mut doc) if doc.uid == uid => {
                if doc.version != expected_version {
                    return Err(DatabaseError::VersionConflict(id.to_string()));
                }

                if let Some(file_name) = patch.file_name {
                    doc.file_name = file_name;
                }
                if let Some(storage_key) = patch.storage_key {
                    doc.storage_key = storage_key;
                }
                if let Some(status) = patch.status {
                    doc.status = status;
                }
                patch.trash_key.apply_to(&mut doc.trash_key);

                if let Some(new_shared_to) = patch.shared_to {
                    for removed in doc.shared_to.difference(&new_shared_to) {
                        index_remove(&write_txn, SHARED_DOCS, removed, id)?;
                    }
                    for added in new_shared_to.difference(&doc.shared_to) {
                        index_insert(&write_txn, SHARED_DOCS, added, id)?;
                    }
                    doc.shared_to = new_shared_to;
                }
                if let Some(shared_from) = patch.shared_from {
                    doc.shared_from = shared_from;
                }

                doc.version += 1;
                doc.updated_at = chrono::Utc::now();

                let serialized = rmp_serde::to_vec_named(&doc)?;
                let mut table = write_txn.open_table(DOCUMENTS)?;
                table.insert(id, serialized.as_slice())?;
                Some(doc)
            }
            _ => None,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// Delete a document owned by `uid`, cleaning up the owner and recipient
    /// indexes and every share grant referencing it.
    pub fn delete_document(&self, id: &str, uid: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing = {
            let table = write_txn.open_table(DOCUMENTS)?;
            let found = match table.get(id)? {
                Some(data) => {
                    let doc: Document = rmp_serde::from_slice(data.value())?;
                    Some(doc)
                }
                None => None,
            };
            found
        };

        let deleted = match existing {
            Some(doc) if doc.uid == uid => {
                {
                    let mut table = write_txn.open_table(DOCUMENTS)?;
                    table.remove(id)?;
                }
                index_remove(&write_txn, OWNER_DOCS, &doc.uid, id)?;
                for recipient in &doc.shared_to {
                    index_remove(&write_txn, SHARED_DOCS, recipient, id)?;
                }
                remove_shares_for_doc(&write_txn, id, false)?;
                true
            }
            _ => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }
}

// ============================================================================
// Index helpers
// ============================================================================

/// Add `id` to the msgpack id-list stored under `key`.
pub(super) fn index_insert(
    write_txn: &WriteTransaction,
    def: redb::TableDefinition<&str, &[u8]>,
    key: &str,
    id: &str,
) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(def)?;
    let mut ids: Vec<String> = table
        .get(key)?
        .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
        .unwrap_or_default();

    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
        let data = rmp_serde::to_vec_named(&ids)?;
        table.insert(key, data.as_slice())?;
    }
    Ok(())
}

/// Remove `id` from the msgpack id-list stored under `key`, dropping the
/// entry entirely when the list empties.
pub(super) fn index_remove(
    write_txn: &WriteTransaction,
    def: redb::TableDefinition<&str, &[u8]>,
    key: &str,
    id: &str,
) -> Result<(), DatabaseError> {
    let ids: Option<Vec<String>> = {
        let table = write_txn.open_table(def)?;
        let found = match table.get(key)? {
            Some(data) => Some(rmp_serde::from_slice(data.value())?),
            None => None,
        };
        found
    };

    if let Some(mut ids) = ids {
        ids.retain(|existing| existing != id);
        let mut table = write_txn.open_table(def)?;
        if ids.is_empty() {
            table.remove(key)?;
        } else {
            let data = rmp_serde::to_vec_named(&ids)?;
            table.insert(key, data.as_slice())?;
        }
    }
    Ok(())
}

/// Delete grants referencing `doc_id`. When `keep_restricted` is set,
/// restricted grants survive (owner revocation of link sharing). Returns the
/// number of grants removed.
pub(super) fn remove_shares_for_doc(
    write_txn: &WriteTransaction,
    doc_id: &str,
    keep_restricted: bool,
) -> Result<u64, DatabaseError> {
    use super::models::{ShareGrant, ShareType};

    let grant_ids: Vec<String> = {
        let index = write_txn.open_table(DOC_SHARES)?;
        let found = match index.get(doc_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => Vec::new(),
        };
        found
    };

    let mut kept = Vec::new();
    let mut removed = 0;
    {
        let mut shares = write_txn.open_table(SHARES)?;
        for grant_id in &grant_ids {
            let grant: Option<ShareGrant> = shares
                .get(grant_id.as_str())?
                .map(|v| rmp_serde::from_slice(v.value()))
                .transpose()?;

            match grant {
                Some(g) if keep_restricted && g.share_type == ShareType::Restricted => {
                    kept.push(grant_id.clone());
                }
                Some(_) => {
                    shares.remove(grant_id.as_str())?;
                    removed += 1;
                }
                None => {}
            }
        }
    }

    let mut index = write_txn.open_table(DOC_SHARES)?;
    if kept.is_empty() {
        index.remove(doc_id)?;
    } else {
        let data = rmp_serde::to_vec_named(&kept)?;
        index.insert(doc_id, data.as_slice())?;
    }
    Ok(removed)
}
