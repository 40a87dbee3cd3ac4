use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::documents::{index_insert, remove_shares_for_doc};
use super::models::ShareGrant;
use super::tables::*;

impl Database {
    // ========================================================================
    // Share grant operations
    // ========================================================================

    /// Store a share grant and update the per-document grant index.
    pub fn insert_share(&self, grant: &ShareGrant) -> Result<(), DatabaseError> {
        debug_assert!(!grant.id.is_empty(), "grant id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(SHARES)?;
            let data = rmp_serde::to_vec_named(grant)?;
            table.insert(grant.id.as_str(), data.as_slice())?;

            index_insert(&write_txn, DOC_SHARES, &grant.doc_id, &grant.id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a grant by its unguessable token.
    pub fn get_share(&self, id: &str) -> Result<Option<ShareGrant>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SHARES)?;

        match table.get(id)? {
            Some(data) => {
                let grant: ShareGrant = rmp_serde::from_slice(data.value())?;
                Ok(Some(grant))
            }
            None => Ok(None),
        }
    }

    /// List all grants for a document.
    pub fn list_shares_for_document(
        &self,
        doc_id: &str,
    ) -> Result<Vec<ShareGrant>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(DOC_SHARES)?;
        let shares = read_txn.open_table(SHARES)?;

        let grant_ids: Vec<String> = match index.get(doc_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut grants = Vec::new();
        for grant_id in grant_ids {
            if let Some(data) = shares.get(grant_id.as_str())? {
                let grant: ShareGrant = rmp_serde::from_slice(data.value())?;
                grants.push(grant);
            }
        }
        Ok(grants)
    }

    /// Bulk-delete grants for a document. Restricted grants survive when
    /// `keep_restricted` is set. Returns the number removed.
    pub fn delete_shares_for_document(
        &self,
        doc_id: &str,
        keep_restricted: bool,
    ) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = remove_shares_for_doc(&write_txn, doc_id, keep_restricted)?;
        write_txn.commit()?;
        Ok(removed)
    }
}
