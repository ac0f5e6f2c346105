// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication gates for Axum routers.
//!
//! A [`Gate`] pairs the process-wide [`AuthProvider`] with an
//! [`AccessPolicy`] and is attached with `route_layer`, so unmatched paths
//! still 404. On success the verified [`AuthenticatedUser`] is bound into the
//! request extensions, where the `Auth` extractor picks it up.
//!
//! ```rust,ignore
//! let admin = Router::new().route("/api/v1/users", get(list_users));
//! let admin = Gate::require_role(provider.clone(), "admin").wrap(admin);
//! ```
//!
//! Per request a gate ends in one of four states: anonymous (optional gates
//! only), bound, rejected (401) or forbidden (403). A rejected request never
//! has claims bound.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, Extensions, HeaderMap},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use super::{AuthError, AuthProvider, AuthenticatedUser};

/// What a gate demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Any valid credential
    Authenticated,
    /// Valid credential holding this role
    Role(String),
    /// Valid credential holding at least one of these roles
    AnyRole(Vec<String>),
    /// Verify when possible, never reject
    Optional,
}

#[derive(Clone)]
pub struct Gate {
    provider: Arc<AuthProvider>,
    policy: AccessPolicy,
}

impl Gate {
    pub fn new(provider: Arc<AuthProvider>, policy: AccessPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn authenticate(provider: Arc<AuthProvider>) -> Self {
        Self::new(provider, AccessPolicy::Authenticated)
    }

    pub fn require_role(provider: Arc<AuthProvider>, role: impl Into<String>) -> Self {
        Self::new(provider, AccessPolicy::Role(role.into()))
    }

    pub fn require_any_role<I, R>(provider: Arc<AuthProvider>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self::new(
            provider,
            AccessPolicy::AnyRole(roles.into_iter().map(Into::into).collect()),
        )
    }

    pub fn optional_auth(provider: Arc<AuthProvider>) -> Self {
        Self::new(provider, AccessPolicy::Optional)
    }

    /// Decide whether a request with these headers may proceed.
    ///
    /// `Ok(None)` means anonymous access under [`AccessPolicy::Optional`].
    pub async fn admit(&self, headers: &HeaderMap) -> Result<Option<AuthenticatedUser>, AuthError> {
        if self.policy == AccessPolicy::Optional {
            if !headers.contains_key(AUTHORIZATION) {
                return Ok(None);
            }
            return match self.provider.verify_headers(headers).await {
                Ok(user) => Ok(Some(user)),
                Err(e) => {
                    tracing::debug!(error_code = e.error_code(), "Optional auth failed, continuing anonymously");
                    Ok(None)
                }
            };
        }

        let user = self.provider.verify_headers(headers).await?;

        let permitted = match &self.policy {
            AccessPolicy::Role(role) => user.has_role(role),
            AccessPolicy::AnyRole(roles) => user.matching_role(roles).is_some(),
            AccessPolicy::Authenticated | AccessPolicy::Optional => true,
        };

        if !permitted {
            tracing::info!(
                user_id = %user.user_id,
                tenant_id = %user.tenant_id,
                roles = ?user.roles,
                policy = ?self.policy,
                "Access forbidden"
            );
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(Some(user))
    }

    /// Attach this gate to every route currently in `router`.
    pub fn wrap<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self, enforce))
    }
}

/// Make canonical claims visible to downstream extractors and handlers.
pub fn bind_claims(extensions: &mut Extensions, user: AuthenticatedUser) {
    extensions.insert(user);
}

/// Gate middleware: admit, bind, or reject.
pub async fn enforce(State(gate): State<Gate>, mut request: Request, next: Next) -> Response {
    match gate.admit(request.headers()).await {
        Ok(Some(user)) => {
            bind_claims(request.extensions_mut(), user);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => {
            if matches!(e, AuthError::ProviderMisconfigured(_) | AuthError::InternalError(_)) {
                tracing::error!(error = %e, "Authentication unavailable");
            } else if e != AuthError::InsufficientPermissions {
                tracing::debug!(
                    error_code = e.error_code(),
                    path = %request.uri().path(),
                    "Request rejected"
                );
            }
            e.into_response()
        }
    }
}
