// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External OpenID Connect tokens (Keycloak-shaped claims).
//!
//! Provider claims are read from an untyped JSON map with an explicit
//! presence check per field. Nothing outside [`extract_claims`] depends on
//! the claim layout of the identity provider.

use jsonwebtoken::{decode, decode_header, Validation};
use serde_json::{Map, Value};

use super::claims::{unique_roles, AuthenticatedUser};
use super::error::AuthError;
use super::jwks::RemoteKeyResolver;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Claim naming the tenant a token is issued for.
pub const TENANT_CLAIM: &str = "tenant_id";

/// Verifies provider-issued tokens and maps them to [`AuthenticatedUser`].
pub struct OidcVerifier {
    resolver: RemoteKeyResolver,
    audiences: Vec<String>,
    client_id: Option<String>,
}

impl OidcVerifier {
    pub fn new(
        resolver: RemoteKeyResolver,
        audiences: Vec<String>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            resolver,
            audiences,
            client_id: client_id.filter(|c| !c.is_empty()),
        }
    }

    pub fn resolver(&self) -> &RemoteKeyResolver {
        &self.resolver
    }

    /// Verify a bearer token.
    ///
    /// Signature, issuer and time-window failures all collapse into
    /// [`AuthError::InvalidOrExpiredToken`]. Key resolution failures surface
    /// as [`AuthError::ProviderMisconfigured`].
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidOrExpiredToken)?;
        let keys = self.resolver.keys().await?;
        let candidates = keys.candidates(&header)?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_issuer(&[keys.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        let raw = candidates
            .iter()
            .find_map(|key| decode::<Map<String, Value>>(token, key, &validation).ok())
            .ok_or(AuthError::InvalidOrExpiredToken)?
            .claims;

        extract_claims(&raw, self.client_id.as_deref(), &self.audiences)
    }
}

/// Normalize verified provider claims into the canonical claim set.
///
/// Roles are the union of `realm_access.roles` and
/// `resource_access.<client_id>.roles`, first appearance wins. The tenant
/// claim is mandatory. With a non-empty audience allow-list, either `aud`
/// (string or array) or `azp` must name an allowed value.
pub fn extract_claims(
    raw: &Map<String, Value>,
    client_id: Option<&str>,
    audiences: &[String],
) -> Result<AuthenticatedUser, AuthError> {
    let subject = string_claim(raw, "sub").ok_or(AuthError::MalformedToken)?;
    let roles = extract_roles(raw, client_id);
    let tenant = string_claim(raw, TENANT_CLAIM).ok_or(AuthError::MissingTenantClaim)?;

    if !audiences.is_empty() && !audience_allowed(raw, audiences) {
        return Err(AuthError::InvalidAudience);
    }

    Ok(AuthenticatedUser::new(
        subject,
        tenant,
        string_claim(raw, "email").map(str::to_string),
        roles,
    ))
}

/// Realm roles followed by roles of `client_id`, without duplicates.
pub fn extract_roles(raw: &Map<String, Value>, client_id: Option<&str>) -> Vec<String> {
    let realm = raw.get("realm_access").and_then(|v| v.get("roles"));
    let client = client_id.and_then(|id| {
        raw.get("resource_access")
            .and_then(|v| v.get(id))
            .and_then(|v| v.get("roles"))
    });

    unique_roles(
        [realm, client]
            .into_iter()
            .flatten()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_str)
            .map(str::to_string),
    )
}

fn audience_allowed(raw: &Map<String, Value>, allowed: &[String]) -> bool {
    let is_allowed = |value: &str| allowed.iter().any(|a| a == value);

    let aud_match = match raw.get("aud") {
        Some(Value::String(aud)) => is_allowed(aud),
        Some(Value::Array(auds)) => auds.iter().filter_map(Value::as_str).any(is_allowed),
        _ => false,
    };

    aud_match || string_claim(raw, "azp").is_some_and(is_allowed)
}

/// Non-empty string claim; other JSON types count as absent.
fn string_claim<'a>(raw: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    raw.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_keys::{self, CLIENT_ID, ISSUER};
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn verifier(audiences: &[&str]) -> OidcVerifier {
        OidcVerifier::new(
            RemoteKeyResolver::new(test_keys::static_source()),
            audiences.iter().map(|a| a.to_string()).collect(),
            Some(CLIENT_ID.to_string()),
        )
    }

    #[test]
    fn roles_union_realm_and_client_without_duplicates() {
        let raw = as_map(json!({
            "realm_access": { "roles": ["user", "offline_access", "admin"] },
            "resource_access": {
                "erp-web": { "roles": ["admin", "manager"] },
                "other": { "roles": ["ignored"] }
            }
        }));

        assert_eq!(
            extract_roles(&raw, Some("erp-web")),
            vec!["user", "offline_access", "admin", "manager"]
        );
        assert_eq!(
            extract_roles(&raw, None),
            vec!["user", "offline_access", "admin"]
        );
    }

    #[test]
    fn odd_role_shapes_are_ignored() {
        let raw = as_map(json!({
            "realm_access": { "roles": "admin" },
            "resource_access": { "erp-web": { "roles": [1, "manager", null] } }
        }));
        assert_eq!(extract_roles(&raw, Some("erp-web")), vec!["manager"]);
    }

    #[test]
    fn missing_tenant_is_rejected() {
        let raw = as_map(test_keys::claims("alice", None));
        assert_eq!(
            extract_claims(&raw, Some(CLIENT_ID), &[]),
            Err(AuthError::MissingTenantClaim)
        );

        let mut raw = as_map(test_keys::claims("alice", None));
        raw.insert(TENANT_CLAIM.to_string(), json!(42));
        assert_eq!(
            extract_claims(&raw, Some(CLIENT_ID), &[]),
            Err(AuthError::MissingTenantClaim)
        );
    }

    #[test]
    fn audience_accepts_string_array_or_azp() {
        let allowed = vec!["erp-api".to_string()];

        let mut raw = as_map(test_keys::claims("alice", Some("t1")));
        raw.insert("aud".to_string(), json!("erp-api"));
        raw.remove("azp");
        assert!(extract_claims(&raw, None, &allowed).is_ok());

        raw.insert("aud".to_string(), json!(["account", "erp-api"]));
        assert!(extract_claims(&raw, None, &allowed).is_ok());

        raw.insert("aud".to_string(), json!("account"));
        raw.insert("azp".to_string(), json!("erp-api"));
        assert!(extract_claims(&raw, None, &allowed).is_ok());

        raw.insert("azp".to_string(), json!("someone-else"));
        assert_eq!(
            extract_claims(&raw, None, &allowed),
            Err(AuthError::InvalidAudience)
        );
    }

    #[test]
    fn canonical_claims_carry_subject_tenant_email() {
        let raw = as_map(test_keys::claims("alice", Some("t1")));
        let user = extract_claims(&raw, Some(CLIENT_ID), &[]).unwrap();

        assert_eq!(user.user_id, "alice");
        assert_eq!(user.tenant_id, "t1");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.roles, vec!["user", "manager"]);
    }

    #[tokio::test]
    async fn verifies_signed_token() {
        let token = test_keys::sign(&test_keys::claims("alice", Some("t1")));
        let user = verifier(&[CLIENT_ID]).verify(&token).await.unwrap();

        assert_eq!(user.user_id, "alice");
        assert_eq!(user.tenant_id, "t1");
        assert!(user.has_role("manager"));
    }

    #[tokio::test]
    async fn foreign_signature_is_rejected() {
        let token = test_keys::sign_foreign(&test_keys::claims("alice", Some("t1")));
        assert_eq!(
            verifier(&[]).verify(&token).await,
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[tokio::test]
    async fn expired_or_foreign_issuer_is_rejected() {
        let mut claims = test_keys::claims("alice", Some("t1"));
        claims["exp"] = json!(test_keys::now() - 600);
        let token = test_keys::sign(&claims);
        assert_eq!(
            verifier(&[]).verify(&token).await,
            Err(AuthError::InvalidOrExpiredToken)
        );

        let mut claims = test_keys::claims("alice", Some("t1"));
        claims["iss"] = json!(format!("{ISSUER}-evil"));
        let token = test_keys::sign(&claims);
        assert_eq!(
            verifier(&[]).verify(&token).await,
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[tokio::test]
    async fn token_not_yet_valid_is_rejected() {
        let now = test_keys::now();
        let mut claims = test_keys::claims("alice", Some("t1"));
        claims["nbf"] = json!(now + 3600);
        claims["exp"] = json!(now + 7200);
        let token = test_keys::sign(&claims);

        assert_eq!(
            verifier(&[]).verify(&token).await,
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[tokio::test]
    async fn valid_token_without_tenant_is_rejected() {
        let token = test_keys::sign(&test_keys::claims("alice", None));
        assert_eq!(
            verifier(&[]).verify(&token).await,
            Err(AuthError::MissingTenantClaim)
        );
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_before_key_resolution() {
        let verifier = verifier(&[]);
        assert_eq!(
            verifier.verify("not-a-jwt").await,
            Err(AuthError::InvalidOrExpiredToken)
        );
        assert_eq!(verifier.resolver().status(), None);
    }
}
