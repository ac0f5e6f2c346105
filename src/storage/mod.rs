// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # User Storage Module
//!
//! Persistence for local user records. The auth core only touches users in
//! three places: login (local provider), profile lookup, and first-login
//! auto-provisioning (external provider).
//!
//! ## Guarantees
//!
//! - `id` is unique: [`UserStore::create`] fails with
//!   [`StorageError::AlreadyExists`] when the id is taken, atomically with
//!   the insert. Concurrent first logins rely on this.
//! - Users holding a password are unique by lower-cased email.
//! - Listing and counting are always scoped to one tenant.
//!
//! ## Layout
//!
//! ```text
//! $DATA_DIR/
//!   users.redb     # users, email index, tenant index
//! ```

pub mod database;
pub mod users;

pub use database::UserDatabase;
pub use users::StoredUser;

/// Error type for user storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Local user persistence.
///
/// Implementations must make `create` fail with `AlreadyExists` when another
/// record with the same `id` exists, even under concurrent callers.
pub trait UserStore: Send + Sync {
    fn create(&self, user: &StoredUser) -> StorageResult<()>;

    fn get(&self, id: &str) -> StorageResult<StoredUser>;

    /// Look up a password-holding user by email (case-insensitive).
    fn get_by_email(&self, email: &str) -> StorageResult<StoredUser>;

    fn update(&self, user: &StoredUser) -> StorageResult<()>;

    fn delete(&self, id: &str) -> StorageResult<()>;

    /// Users of `tenant_id`, ordered by id.
    fn list(&self, tenant_id: &str, limit: usize, offset: usize) -> StorageResult<Vec<StoredUser>>;

    fn count(&self, tenant_id: &str) -> StorageResult<usize>;

    /// Cheap round trip to the backing store.
    fn ping(&self) -> StorageResult<()>;
}
