// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! First-login auto-provisioning for externally authenticated users.
//!
//! A verified external subject with no local record gets one, keyed by the
//! subject itself. Concurrent first logins race on [`UserStore::create`];
//! the store's uniqueness check picks one writer and everybody re-reads the
//! same row.

use crate::auth::{AuthenticatedUser, Role};
use crate::storage::{StorageError, StoredUser, UserStore};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Record still missing after a successful or duplicate create
    #[error("user {0} not found after provisioning")]
    UserNotFound(String),

    #[error("failed to provision user: {0}")]
    Storage(#[from] StorageError),
}

/// Return the local user for `user`, creating it on first sight.
pub fn ensure_local_user(
    store: &dyn UserStore,
    user: &AuthenticatedUser,
) -> Result<StoredUser, ProvisionError> {
    match store.get(&user.user_id) {
        Ok(existing) => return Ok(existing),
        Err(StorageError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let record = new_record(user);
    match store.create(&record) {
        Ok(()) => {
            tracing::info!(
                user_id = %record.id,
                tenant_id = %record.tenant_id,
                role = %record.role,
                "Provisioned local user for external identity"
            );
        }
        Err(StorageError::AlreadyExists(_)) => {
            tracing::debug!(user_id = %record.id, "User provisioned concurrently, re-reading");
        }
        Err(e) => return Err(e.into()),
    }

    match store.get(&user.user_id) {
        Ok(stored) => Ok(stored),
        Err(StorageError::NotFound(_)) => Err(ProvisionError::UserNotFound(user.user_id.clone())),
        Err(e) => Err(e.into()),
    }
}

/// Local record mirroring an external identity.
///
/// Display name is the email when present, else the subject. Role is the
/// first token role that names a local role, else the default.
fn new_record(user: &AuthenticatedUser) -> StoredUser {
    let display_name = user.email.clone().unwrap_or_else(|| user.user_id.clone());
    let role = user
        .roles
        .iter()
        .find_map(|r| Role::parse(r))
        .unwrap_or_default();

    let record = StoredUser::new(&user.user_id, &user.tenant_id, display_name, role)
        .with_external_id(&user.user_id);
    match &user.email {
        Some(email) => record.with_email(email),
        None => record,
    }
}
