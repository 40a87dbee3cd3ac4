use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::UserRecord;
use super::tables::*;

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================
    //
    // Account management lives outside this service; these exist so recipient
    // emails can resolve to uids, and so tests can seed identities.

    /// Store a user record and update the email index.
    pub fn put_user(&self, user: &UserRecord) -> Result<(), DatabaseError> {
        debug_assert!(!user.id.is_empty(), "user id must not be empty");
        debug_assert!(!user.email.is_empty(), "user email must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            let data = rmp_serde::to_vec_named(user)?;
            table.insert(user.id.as_str(), data.as_slice())?;

            let mut email_table = write_txn.open_table(USER_EMAILS)?;
            email_table.insert(user.email.as_str(), user.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a user by uid.
    pub fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(id)? {
            Some(data) => {
                let user: UserRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Resolve emails to user records. Unresolvable emails are simply absent
    /// from the result; callers report them separately.
    pub fn find_users_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let email_table = read_txn.open_table(USER_EMAILS)?;
        let users_table = read_txn.open_table(USERS)?;

        let mut users = Vec::new();
        for email in emails {
            let uid = match email_table.get(email.as_str())? {
                Some(data) => data.value().to_string(),
                None => continue,
            };
            if let Some(data) = users_table.get(uid.as_str())? {
                let user: UserRecord = rmp_serde::from_slice(data.value())?;
                users.push(user);
            }
        }
        Ok(users)
    }
}
