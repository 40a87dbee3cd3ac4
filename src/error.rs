use thiserror::Error;

use crate::object_store::ObjectStoreError;
use crate::storage::DatabaseError;

/// Error taxonomy shared by the lifecycle and share engines.
///
/// `NotFound` deliberately covers both "absent" and "present but not
/// authorized" so callers cannot probe for existence. Abort-class adapter
/// failures surface as `Storage`/`Db`; partial failures never appear here --
/// they are warnings on otherwise-successful results.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found")]
    NotFound,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(#[from] ObjectStoreError),
    #[error("database error: {0}")]
    Db(DatabaseError),
    /// Another writer moved the document's version; safe to retry.
    #[error("concurrent modification of document {0}")]
    Conflict(String),
    #[error("access to this share is restricted")]
    AccessRestricted,
    #[error("share link expired; ask the owner to refresh it")]
    LinkExpired,
}

impl EngineError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound => "not_found",
            EngineError::Validation(_) => "validation_error",
            EngineError::Storage(_) => "storage_error",
            EngineError::Db(_) => "db_error",
            EngineError::Conflict(_) => "conflict",
            EngineError::AccessRestricted => "access_restricted",
            EngineError::LinkExpired => "link_expired",
        }
    }
}

impl From<DatabaseError> for EngineError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::VersionConflict(id) => EngineError::Conflict(id),
            other => EngineError::Db(other),
        }
    }
}
