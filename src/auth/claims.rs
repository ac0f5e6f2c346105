// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical claims and the session token wire format.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Issuer written into, and required from, self-issued session tokens.
pub const SESSION_ISSUER: &str = "erp-api";

/// Authenticated caller, independent of the provider that verified it.
///
/// This is what the auth gates bind into request extensions. Handlers read
/// identity, tenant and roles from here and never re-parse credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Stable subject; primary key of the local user record
    pub user_id: String,

    /// Tenant every persistence operation of this request is scoped to
    pub tenant_id: String,

    /// Email, when the credential carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Roles in order of first appearance, without duplicates
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn new(
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        email: Option<String>,
        roles: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            email: email.filter(|e| !e.is_empty()),
            roles: unique_roles(roles),
        }
    }

    /// Check if the caller holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|held| held == role)
    }

    /// First of `required` that the caller holds, if any.
    pub fn matching_role<'a, S: AsRef<str>>(&self, required: &'a [S]) -> Option<&'a str> {
        required
            .iter()
            .map(AsRef::as_ref)
            .find(|role| self.has_role(role))
    }
}

/// Drop empty strings and duplicates, keeping first-appearance order.
pub fn unique_roles(roles: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for role in roles {
        if !role.is_empty() && !out.contains(&role) {
            out.push(role);
        }
    }
    out
}

/// Class of a self-issued token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Claims of a self-issued session token (HS256).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: String,
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    pub role: String,
    pub token_use: TokenUse,
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Canonical view; the scalar role becomes a singleton role set.
    pub fn to_user(&self) -> AuthenticatedUser {
        AuthenticatedUser::new(
            self.user_id.clone(),
            self.tenant_id.clone(),
            Some(self.email.clone()),
            std::iter::once(self.role.clone()),
        )
    }
}
