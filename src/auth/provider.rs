// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication provider selected at start-up.
//!
//! The provider is built once from [`AuthConfig`] and shared read-only by
//! every gate. It never changes for the lifetime of the process.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};

use super::claims::AuthenticatedUser;
use super::error::AuthError;
use super::jwks::{HttpKeySource, KeySource, RemoteKeyResolver};
use super::oidc::OidcVerifier;
use super::token::TokenCodec;
use crate::config::{AuthConfig, LocalSettings, OidcSettings};

/// How bearer tokens are verified.
pub enum AuthProvider {
    /// Self-issued HS256 session tokens
    Local(TokenCodec),
    /// Tokens issued by an external OpenID Connect provider
    Oidc(OidcVerifier),
}

impl AuthProvider {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let provider = match config {
            AuthConfig::Local(settings) => Self::local(settings),
            AuthConfig::Oidc(settings) => {
                let source = HttpKeySource::new(settings.issuer.clone(), settings.jwks_url.clone())
                    .map_err(|e| AuthError::ProviderMisconfigured(format!("HTTP client: {e}")))?;
                Self::oidc_with_source(settings, Arc::new(source))
            }
        };

        tracing::info!(provider = provider.name(), "Authentication provider selected");
        Ok(provider)
    }

    pub fn local(settings: &LocalSettings) -> Self {
        AuthProvider::Local(TokenCodec::new(
            settings.secret.as_bytes(),
            settings.access_ttl,
            settings.refresh_ttl,
        ))
    }

    /// OIDC provider with an explicit key source (tests use an in-process one).
    pub fn oidc_with_source(settings: &OidcSettings, source: Arc<dyn KeySource>) -> Self {
        AuthProvider::Oidc(OidcVerifier::new(
            RemoteKeyResolver::new(source),
            settings.audiences.clone(),
            settings.client_id.clone(),
        ))
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthProvider::Local(_) => "local",
            AuthProvider::Oidc(_) => "keycloak",
        }
    }

    /// Session token codec, only for the local provider.
    pub fn local_codec(&self) -> Option<&TokenCodec> {
        match self {
            AuthProvider::Local(codec) => Some(codec),
            AuthProvider::Oidc(_) => None,
        }
    }

    /// Whether this provider auto-provisions local users on first sight.
    pub fn provisions_users(&self) -> bool {
        matches!(self, AuthProvider::Oidc(_))
    }

    /// Verify a bearer token into canonical claims.
    pub async fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        match self {
            AuthProvider::Local(codec) => codec.verify_access(token),
            AuthProvider::Oidc(verifier) => verifier.verify(token).await,
        }
    }

    /// Verify the `Authorization` header of a request.
    ///
    /// The header is checked before any key resolution, so anonymous traffic
    /// never triggers discovery.
    pub async fn verify_headers(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let token = bearer_token(headers)?;
        self.verify_token(token).await
    }

    /// Readiness of the verification path; resolves remote keys if needed.
    pub async fn check_ready(&self) -> Result<(), AuthError> {
        match self {
            AuthProvider::Local(_) => Ok(()),
            AuthProvider::Oidc(verifier) => verifier.resolver().keys().await.map(|_| ()),
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_keys;
    use axum::http::HeaderValue;
    use std::time::Duration;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn local() -> AuthProvider {
        AuthProvider::local(&LocalSettings {
            secret: "provider-test-secret".to_string(),
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(7200),
        })
    }

    fn oidc() -> AuthProvider {
        AuthProvider::oidc_with_source(
            &OidcSettings {
                issuer: test_keys::ISSUER.to_string(),
                jwks_url: None,
                audiences: Vec::new(),
                client_id: Some(test_keys::CLIENT_ID.to_string()),
            },
            test_keys::static_source(),
        )
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingAuthHeader));
        assert_eq!(bearer_token(&headers("Basic abc")), Err(AuthError::InvalidAuthHeader));
        assert_eq!(bearer_token(&headers("bearer abc")), Err(AuthError::InvalidAuthHeader));
        assert_eq!(bearer_token(&headers("Bearer ")), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Ok("abc.def"));
    }

    #[tokio::test]
    async fn local_provider_accepts_access_tokens_only() {
        let provider = local();
        let codec = provider.local_codec().unwrap();

        let access = codec.issue_access("u1", "t1", "a@b.c", "admin").unwrap();
        let user = provider
            .verify_headers(&headers(&format!("Bearer {access}")))
            .await
            .unwrap();
        assert_eq!(user.roles, vec!["admin"]);
        assert_eq!(user.tenant_id, "t1");

        let refresh = codec.issue_refresh("u1", "t1", "a@b.c", "admin").unwrap();
        assert_eq!(
            provider.verify_headers(&headers(&format!("Bearer {refresh}"))).await,
            Err(AuthError::WrongTokenType)
        );
    }

    #[tokio::test]
    async fn missing_header_does_not_resolve_keys() {
        let provider = oidc();
        assert_eq!(
            provider.verify_headers(&HeaderMap::new()).await,
            Err(AuthError::MissingAuthHeader)
        );
        let AuthProvider::Oidc(verifier) = &provider else {
            unreachable!()
        };
        assert_eq!(verifier.resolver().status(), None);
    }

    #[tokio::test]
    async fn oidc_provider_verifies_and_reports_ready() {
        let provider = oidc();
        assert!(provider.local_codec().is_none());
        assert!(provider.provisions_users());

        let token = test_keys::sign(&test_keys::claims("bob", Some("t9")));
        let user = provider
            .verify_headers(&headers(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(user.user_id, "bob");
        assert!(provider.check_ready().await.is_ok());
    }
}
