// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Self-issued session tokens (HS256).
//!
//! ## Token classes
//!
//! - Access tokens are short-lived and are the only class accepted by the
//!   auth gates.
//! - Refresh tokens are long-lived and are only accepted by
//!   [`TokenCodec::refresh_access`], which mints a new access token and hands
//!   the same refresh token back (no rotation).

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::claims::{AuthenticatedUser, SessionClaims, TokenUse, SESSION_ISSUER};
use super::AuthError;

/// Only algorithm the codec signs with or accepts.
const SESSION_ALGORITHM: Algorithm = Algorithm::HS256;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Access + refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies self-issued session tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    leeway: u64,
}

impl TokenCodec {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
            leeway: CLOCK_SKEW_LEEWAY,
        }
    }

    /// Override the clock skew tolerance (seconds).
    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }

    /// Issue a short-lived access token.
    pub fn issue_access(
        &self,
        user_id: &str,
        tenant_id: &str,
        email: &str,
        role: &str,
    ) -> Result<String, AuthError> {
        let claims = self.claims_at(TokenUse::Access, user_id, tenant_id, email, role, now());
        self.sign(&claims)
    }

    /// Issue a long-lived refresh token.
    pub fn issue_refresh(
        &self,
        user_id: &str,
        tenant_id: &str,
        email: &str,
        role: &str,
    ) -> Result<String, AuthError> {
        let claims = self.claims_at(TokenUse::Refresh, user_id, tenant_id, email, role, now());
        self.sign(&claims)
    }

    /// Issue both tokens; fails if either issuance fails.
    pub fn issue_pair(
        &self,
        user_id: &str,
        tenant_id: &str,
        email: &str,
        role: &str,
    ) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id, tenant_id, email, role)?,
            refresh_token: self.issue_refresh(user_id, tenant_id, email, role)?,
        })
    }

    /// Verify signature, algorithm, issuer and time window of any session token.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        if header.alg != SESSION_ALGORITHM {
            return Err(AuthError::InvalidSignature);
        }

        let mut validation = Validation::new(SESSION_ALGORITHM);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::from_jwt(&e))
    }

    /// Verify an access token and return the canonical claims.
    pub fn verify_access(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.verify(token)?;
        if claims.token_use != TokenUse::Access {
            return Err(AuthError::WrongTokenType);
        }
        if claims.tenant_id.is_empty() {
            return Err(AuthError::MissingTenantClaim);
        }
        Ok(claims.to_user())
    }

    /// Mint a new access token from a valid refresh token.
    pub fn refresh_access(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.verify(refresh_token)?;
        if claims.token_use != TokenUse::Refresh {
            return Err(AuthError::WrongTokenType);
        }
        self.issue_access(&claims.user_id, &claims.tenant_id, &claims.email, &claims.role)
    }

    fn claims_at(
        &self,
        token_use: TokenUse,
        user_id: &str,
        tenant_id: &str,
        email: &str,
        role: &str,
        issued_at: i64,
    ) -> SessionClaims {
        let ttl = match token_use {
            TokenUse::Access => self.access_ttl,
            TokenUse::Refresh => self.refresh_ttl,
        };
        SessionClaims {
            user_id: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            token_use,
            iss: SESSION_ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: issued_at,
            nbf: issued_at,
            exp: issued_at.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
        }
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(&Header::new(SESSION_ALGORITHM), claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("failed to sign token: {e}")))
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    const SECRET: &[u8] = b"test-secret-with-enough-entropy";

    fn codec() -> TokenCodec {
        TokenCodec::new(
            SECRET,
            Duration::from_secs(24 * 3600),
            Duration::from_secs(168 * 3600),
        )
    }

    fn signature_tampered(token: &str, byte: usize, bit: u8) -> String {
        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(signature).unwrap();
        raw[byte] ^= 1 << bit;
        format!("{head}.{}", URL_SAFE_NO_PAD.encode(raw))
    }

    #[test]
    fn access_token_round_trips_identity() {
        let codec = codec();
        let token = codec
            .issue_access("user-1", "tenant-1", "a@example.com", "admin")
            .unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.tenant_id, "tenant-1");
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.iss, SESSION_ISSUER);
        assert_eq!(claims.token_use, TokenUse::Access);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);

        let user = codec.verify_access(&token).unwrap();
        assert_eq!(user.roles, vec!["admin"]);
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn refresh_token_uses_longer_expiry() {
        let codec = codec();
        let token = codec.issue_refresh("user-1", "tenant-1", "", "user").unwrap();
        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.token_use, TokenUse::Refresh);
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = TokenCodec::new(SECRET, Duration::from_secs(60), Duration::from_secs(120))
            .with_leeway(0);
        let claims = codec.claims_at(TokenUse::Access, "u", "t", "", "user", now() - 3600);
        let token = codec.sign(&claims).unwrap();

        assert_eq!(codec.verify(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn future_token_is_not_yet_valid() {
        let codec = codec().with_leeway(0);
        let claims = codec.claims_at(TokenUse::Access, "u", "t", "", "user", now() + 3600);
        let token = codec.sign(&claims).unwrap();

        assert_eq!(codec.verify(&token), Err(AuthError::TokenNotYetValid));
    }

    #[test]
    fn different_secret_is_rejected() {
        let token = codec().issue_access("u", "t", "", "user").unwrap();
        let other = TokenCodec::new(b"another-secret", Duration::from_secs(60), Duration::from_secs(60));

        assert_eq!(other.verify(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn every_single_bit_flip_in_signature_is_rejected() {
        let codec = codec();
        let token = codec.issue_access("u", "t", "", "user").unwrap();

        for byte in 0..32 {
            for bit in 0..8 {
                let tampered = signature_tampered(&token, byte, bit);
                assert_eq!(
                    codec.verify(&tampered),
                    Err(AuthError::InvalidSignature),
                    "byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn other_hmac_algorithm_is_rejected() {
        let codec = codec();
        let claims = codec.claims_at(TokenUse::Access, "u", "t", "", "admin", now());
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(codec.verify(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn rewritten_algorithm_header_is_rejected() {
        let codec = codec();
        let token = codec.issue_access("u", "t", "", "user").unwrap();
        let (_, rest) = token.split_once('.').unwrap();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS384","typ":"JWT"}"#);

        assert_eq!(
            codec.verify(&format!("{header}.{rest}")),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(codec().verify("not-a-token"), Err(AuthError::MalformedToken));
        assert_eq!(codec().verify(""), Err(AuthError::MalformedToken));
    }

    #[test]
    fn refresh_access_reissues_same_identity() {
        let codec = codec();
        let pair = codec
            .issue_pair("user-9", "tenant-9", "nine@example.com", "manager")
            .unwrap();

        let access = codec.refresh_access(&pair.refresh_token).unwrap();
        let original = codec.verify(&pair.refresh_token).unwrap();
        let renewed = codec.verify(&access).unwrap();

        assert_eq!(renewed.token_use, TokenUse::Access);
        assert_eq!(renewed.user_id, original.user_id);
        assert_eq!(renewed.tenant_id, original.tenant_id);
        assert_eq!(renewed.email, original.email);
        assert_eq!(renewed.role, original.role);
        assert_eq!(renewed.sub, original.sub);
        assert_eq!(renewed.iss, original.iss);
    }

    #[test]
    fn refresh_access_rejects_access_token() {
        let codec = codec();
        let pair = codec.issue_pair("u", "t", "", "user").unwrap();
        assert_eq!(
            codec.refresh_access(&pair.access_token),
            Err(AuthError::WrongTokenType)
        );
    }

    #[test]
    fn refresh_token_never_authorizes() {
        let codec = codec();
        let pair = codec.issue_pair("u", "t", "", "admin").unwrap();
        assert_eq!(
            codec.verify_access(&pair.refresh_token),
            Err(AuthError::WrongTokenType)
        );
    }

    #[test]
    fn access_token_without_tenant_never_authorizes() {
        let codec = codec();
        let token = codec.issue_access("u", "", "", "admin").unwrap();
        assert_eq!(codec.verify_access(&token), Err(AuthError::MissingTenantClaim));
    }

    #[test]
    fn refresh_access_rejects_expired_refresh_token() {
        let codec = TokenCodec::new(SECRET, Duration::from_secs(60), Duration::from_secs(60))
            .with_leeway(0);
        let claims = codec.claims_at(TokenUse::Refresh, "u", "t", "", "user", now() - 600);
        let token = codec.sign(&claims).unwrap();

        assert_eq!(codec.refresh_access(&token), Err(AuthError::TokenExpired));
    }
}
