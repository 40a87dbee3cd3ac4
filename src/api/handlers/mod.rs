mod admin;
mod blobs;
mod documents;
mod shares;

pub use admin::{admin_purge, health};
pub use blobs::serve_blob;
pub use documents::{
    get_document, list_documents, open_document, purge_documents, rename_document,
    restore_documents, shared_with_me, trash_documents, upload_document,
};
pub use shares::{access_share, add_recipients, create_share, revoke_share};
