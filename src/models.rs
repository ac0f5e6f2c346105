// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the account and identity endpoints. All
//! types derive `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Accounts**: registration and the public user view
//! - **Sessions**: login, refresh, session probe
//! - **Listing**: pagination query and list envelopes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthenticatedUser, Role};
use crate::storage::StoredUser;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;
pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

// =============================================================================
// Account Models
// =============================================================================

/// Request to register a local account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub tenant_id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    /// One of `admin`, `manager`, `user`
    pub role: String,
}

impl RegisterRequest {
    /// Check field rules and return the parsed role.
    pub fn validate(&self) -> Result<Role, String> {
        if self.tenant_id.trim().is_empty() {
            return Err("tenant_id is required".to_string());
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err("a valid email is required".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
        if self.name.trim().chars().count() < MIN_NAME_LEN {
            return Err(format!("name must be at least {MIN_NAME_LEN} characters"));
        }
        Role::parse(&self.role).ok_or_else(|| "role must be one of admin, manager, user".to_string())
    }
}

/// Public view of a user (never includes the password hash).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<StoredUser> for UserResponse {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            email: user.email,
            name: user.display_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login_at: user.last_login_at,
        }
    }
}

// =============================================================================
// Session Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Result of the optional-auth session probe.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthenticatedUser>,
}

// =============================================================================
// Listing Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// Page size (default 10, max 100)
    pub limit: Option<usize>,
    /// Number of users to skip (default 0)
    pub offset: Option<usize>,
}

impl ListUsersQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCountResponse {
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(role: &str) -> RegisterRequest {
        RegisterRequest {
            tenant_id: "t1".to_string(),
            email: "eve@example.com".to_string(),
            password: "secret1".to_string(),
            name: "Eve".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn register_validation() {
        assert_eq!(register("Manager").validate(), Ok(Role::Manager));
        assert!(register("owner").validate().is_err());
        assert!(register("").validate().is_err());

        let mut req = register("user");
        req.tenant_id = " ".to_string();
        assert!(req.validate().unwrap_err().contains("tenant_id"));

        let mut req = register("user");
        req.email = "not-an-email".to_string();
        assert!(req.validate().unwrap_err().contains("email"));

        let mut req = register("user");
        req.password = "12345".to_string();
        assert!(req.validate().unwrap_err().contains("password"));

        let mut req = register("user");
        req.name = "E".to_string();
        assert!(req.validate().unwrap_err().contains("name"));
    }

    #[test]
    fn user_response_hides_hash() {
        let stored = StoredUser::new("u1", "t1", "Eve", Role::Admin)
            .with_email("eve@example.com")
            .with_password_hash("$argon2id$secret");
        let json = serde_json::to_value(UserResponse::from(stored)).unwrap();

        assert_eq!(json["name"], "Eve");
        assert_eq!(json["role"], "admin");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("last_login_at").is_none());
    }

    #[test]
    fn list_query_defaults_and_bounds() {
        let query = ListUsersQuery { limit: None, offset: None };
        assert_eq!((query.limit(), query.offset()), (10, 0));

        let query = ListUsersQuery { limit: Some(0), offset: Some(5) };
        assert_eq!((query.limit(), query.offset()), (1, 5));

        let query = ListUsersQuery { limit: Some(1000), offset: None };
        assert_eq!(query.limit(), MAX_PAGE_LIMIT);
    }
}
