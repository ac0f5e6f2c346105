// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every "who are you" failure maps to 401. Only [`AuthError::InsufficientPermissions`]
//! maps to 403: the credential was valid, the permission was not.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,
    /// Header present but not `Bearer <token>`
    #[error("Invalid authorization header format")]
    InvalidAuthHeader,
    /// `Bearer ` with nothing after it
    #[error("Token is required")]
    MissingToken,
    /// Token cannot be parsed
    #[error("Token is malformed")]
    MalformedToken,
    /// Signature or signing algorithm does not match
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// Token has expired
    #[error("Token has expired")]
    TokenExpired,
    /// Token is not yet valid
    #[error("Token is not yet valid")]
    TokenNotYetValid,
    /// Token issuer is invalid
    #[error("Token issuer is invalid")]
    InvalidIssuer,
    /// Refresh token presented where an access token is expected, or vice versa
    #[error("Token type is not accepted for this operation")]
    WrongTokenType,
    /// External provider token failed signature or time checks
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    /// No key in the provider key set matches the token
    #[error("No matching key found in JWKS")]
    NoMatchingKey,
    /// Audience and authorized party are both outside the allow-list
    #[error("Invalid token audience")]
    InvalidAudience,
    /// Verified token does not name a tenant
    #[error("tenant_id not found in token")]
    MissingTenantClaim,
    /// Identity provider discovery or key set retrieval failed
    #[error("Authentication provider is misconfigured: {0}")]
    ProviderMisconfigured(String),
    /// Signer misconfiguration or another internal failure
    #[error("Internal authentication error: {0}")]
    InternalError(String),
    /// Insufficient permissions
    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::WrongTokenType => "wrong_token_type",
            AuthError::InvalidOrExpiredToken => "invalid_or_expired_token",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::MissingTenantClaim => "missing_tenant_claim",
            AuthError::ProviderMisconfigured(_) => "provider_misconfigured",
            AuthError::InternalError(_) => "internal_error",
            AuthError::InsufficientPermissions => "insufficient_permissions",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Map a `jsonwebtoken` failure onto the credential taxonomy.
    pub(crate) fn from_jwt(err: &jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                AuthError::InvalidSignature
            }
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            _ => AuthError::MalformedToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
