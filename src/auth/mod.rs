// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Pluggable authentication and tenant-scoped authorization for the ERP API.
//!
//! ## Providers
//!
//! One provider is selected at start-up (`AUTH_PROVIDER`) and never changes:
//!
//! - **local**: the server issues HS256 session tokens itself (login with
//!   email + Argon2id password, access + refresh token pair)
//! - **keycloak**: tokens come from an external OpenID Connect provider and
//!   are verified against its published key set (discovered once, lazily)
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. A [`Gate`] verifies the token with the selected provider
//! 3. Both providers produce the same [`AuthenticatedUser`]:
//!    - `sub` → `user_id`
//!    - `tenant_id` (mandatory)
//!    - `email` (optional)
//!    - role set
//! 4. The gate binds it into the request extensions; handlers use [`Auth`]
//!
//! ## Security
//!
//! - Credential failures are 401, missing roles are 403
//! - Session tokens accept HS256 only; refresh tokens never authorize
//! - A request without a tenant is never authorized
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod oidc;
pub mod password;
pub mod provider;
pub mod roles;
pub mod token;

#[cfg(test)]
pub(crate) mod test_keys;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use middleware::{AccessPolicy, Gate};
pub use password::PasswordHasher;
pub use provider::AuthProvider;
pub use roles::Role;
pub use token::{TokenCodec, TokenPair};
