// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthProvider, PasswordHasher};
use crate::storage::UserStore;

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    /// Provider chosen at start-up
    pub auth: Arc<AuthProvider>,
    pub users: Arc<dyn UserStore>,
    pub passwords: PasswordHasher,
}

impl AppState {
    pub fn new(auth: AuthProvider, users: Arc<dyn UserStore>) -> Self {
        Self {
            auth: Arc::new(auth),
            users,
            passwords: PasswordHasher::default(),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// Local provider over a throw-away database.
    pub fn for_tests() -> (Self, tempfile::TempDir) {
        use crate::config::LocalSettings;
        use crate::storage::UserDatabase;
        use std::time::Duration;

        let dir = tempfile::TempDir::new().unwrap();
        let db = UserDatabase::open_in(dir.path()).unwrap();
        let auth = AuthProvider::local(&LocalSettings {
            secret: "state-test-secret".to_string(),
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(7200),
        });
        (Self::new(auth, Arc::new(db)), dir)
    }

    /// OIDC provider with the fixture key set over a throw-away database.
    pub fn for_oidc_tests() -> (Self, tempfile::TempDir) {
        use crate::auth::test_keys;
        use crate::config::OidcSettings;
        use crate::storage::UserDatabase;

        let dir = tempfile::TempDir::new().unwrap();
        let db = UserDatabase::open_in(dir.path()).unwrap();
        let auth = AuthProvider::oidc_with_source(
            &OidcSettings {
                issuer: test_keys::ISSUER.to_string(),
                jwks_url: None,
                audiences: vec![test_keys::CLIENT_ID.to_string()],
                client_id: Some(test_keys::CLIENT_ID.to_string()),
            },
            test_keys::static_source(),
        );
        (Self::new(auth, Arc::new(db)), dir)
    }
}
