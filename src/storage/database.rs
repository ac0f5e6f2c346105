// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded user database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized StoredUser
//! - `user_emails`: lower-cased email → user id (password-holding users only)
//! - `tenant_users`: composite key (tenant_id \0 user id) → user id
//!
//! redb serializes write transactions, so a check-then-insert inside one
//! write transaction is a real uniqueness constraint.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::users::{normalize_email, StoredUser};
use super::{StorageError, StorageResult, UserStore};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user id → serialized StoredUser (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: lower-cased email → user id.
const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// Index: `tenant_id \0 user_id` → user id, for tenant-scoped range scans.
const TENANT_USERS: TableDefinition<&str, &str> = TableDefinition::new("tenant_users");

// =============================================================================
// Index Key Helpers
// =============================================================================

fn tenant_key(tenant_id: &str, user_id: &str) -> String {
    format!("{tenant_id}\u{0}{user_id}")
}

/// `[start, end)` covering every key of `tenant_id`.
fn tenant_range(tenant_id: &str) -> (String, String) {
    (format!("{tenant_id}\u{0}"), format!("{tenant_id}\u{1}"))
}

// =============================================================================
// UserDatabase
// =============================================================================

/// Embedded ACID user database.
pub struct UserDatabase {
    db: Database,
}

impl UserDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(TENANT_USERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Open `users.redb` inside `data_dir`.
    pub fn open_in(data_dir: &Path) -> StorageResult<Self> {
        Self::open(&data_dir.join("users.redb"))
    }
}

impl UserStore for UserDatabase {
    fn create(&self, user: &StoredUser) -> StorageResult<()> {
        let json = serde_json::to_vec(user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            if users.get(user.id.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!("User {}", user.id)));
            }

            if let Some(email) = user.login_email_key() {
                let mut emails = write_txn.open_table(USER_EMAILS)?;
                if emails.get(email.as_str())?.is_some() {
                    return Err(StorageError::AlreadyExists(format!("User with email {email}")));
                }
                emails.insert(email.as_str(), user.id.as_str())?;
            }

            users.insert(user.id.as_str(), json.as_slice())?;

            let mut tenants = write_txn.open_table(TENANT_USERS)?;
            let key = tenant_key(&user.tenant_id, &user.id);
            tenants.insert(key.as_str(), user.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get(&self, id: &str) -> StorageResult<StoredUser> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StorageError::NotFound(format!("User {id}"))),
        }
    }

    fn get_by_email(&self, email: &str) -> StorageResult<StoredUser> {
        let key = normalize_email(email);
        let read_txn = self.db.begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;
        let users = read_txn.open_table(USERS)?;

        let id = match emails.get(key.as_str())? {
            Some(v) => v.value().to_string(),
            None => return Err(StorageError::NotFound(format!("User with email {key}"))),
        };
        match users.get(id.as_str())? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StorageError::NotFound(format!("User {id}"))),
        }
    }

    fn update(&self, user: &StoredUser) -> StorageResult<()> {
        let json = serde_json::to_vec(user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;

            // Read existing value and deserialize before mutating
            let existing: StoredUser = {
                let existing = users
                    .get(user.id.as_str())?
                    .ok_or_else(|| StorageError::NotFound(format!("User {}", user.id)))?;
                serde_json::from_slice(existing.value())?
            };

            let old_email = existing.login_email_key();
            let new_email = user.login_email_key();
            if old_email != new_email {
                let mut emails = write_txn.open_table(USER_EMAILS)?;
                if let Some(email) = &new_email {
                    if emails.get(email.as_str())?.is_some() {
                        return Err(StorageError::AlreadyExists(format!(
                            "User with email {email}"
                        )));
                    }
                }
                if let Some(email) = &old_email {
                    emails.remove(email.as_str())?;
                }
                if let Some(email) = &new_email {
                    emails.insert(email.as_str(), user.id.as_str())?;
                }
            }

            if existing.tenant_id != user.tenant_id {
                let mut tenants = write_txn.open_table(TENANT_USERS)?;
                tenants.remove(tenant_key(&existing.tenant_id, &user.id).as_str())?;
                let key = tenant_key(&user.tenant_id, &user.id);
                tenants.insert(key.as_str(), user.id.as_str())?;
            }

            users.insert(user.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            let existing: StoredUser = {
                let removed = users
                    .remove(id)?
                    .ok_or_else(|| StorageError::NotFound(format!("User {id}")))?;
                serde_json::from_slice(removed.value())?
            };

            if let Some(email) = existing.login_email_key() {
                let mut emails = write_txn.open_table(USER_EMAILS)?;
                emails.remove(email.as_str())?;
            }

            let mut tenants = write_txn.open_table(TENANT_USERS)?;
            tenants.remove(tenant_key(&existing.tenant_id, id).as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list(&self, tenant_id: &str, limit: usize, offset: usize) -> StorageResult<Vec<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let tenants = read_txn.open_table(TENANT_USERS)?;
        let users = read_txn.open_table(USERS)?;

        let (start, end) = tenant_range(tenant_id);
        let mut results = Vec::new();

        for entry in tenants.range(start.as_str()..end.as_str())?.skip(offset).take(limit) {
            let (_, user_id) = entry?;
            if let Some(value) = users.get(user_id.value())? {
                results.push(serde_json::from_slice(value.value())?);
            }
        }

        Ok(results)
    }

    fn count(&self, tenant_id: &str) -> StorageResult<usize> {
        let read_txn = self.db.begin_read()?;
        let tenants = read_txn.open_table(TENANT_USERS)?;

        let (start, end) = tenant_range(tenant_id);
        let mut count = 0;
        for entry in tenants.range(start.as_str()..end.as_str())? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    fn ping(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}
