use redb::TableDefinition;

/// Document records: uuid -> Document (msgpack)
pub const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Owner index: uid -> msgpack Vec of document UUIDs
pub const OWNER_DOCS: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_docs");

/// Recipient index: uid -> msgpack Vec of document UUIDs shared to that user
pub const SHARED_DOCS: TableDefinition<&str, &[u8]> = TableDefinition::new("shared_docs");

/// Share grants: grant token -> ShareGrant (msgpack)
pub const SHARES: TableDefinition<&str, &[u8]> = TableDefinition::new("shares");

/// Per-document grant index: doc uuid -> msgpack Vec of grant tokens
pub const DOC_SHARES: TableDefinition<&str, &[u8]> = TableDefinition::new("doc_shares");

/// User records: uid -> UserRecord (msgpack)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Email index: email -> uid (for recipient resolution)
pub const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");
