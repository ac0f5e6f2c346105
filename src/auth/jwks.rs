// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider signing keys (OIDC discovery + JWKS).
//!
//! ## Resolution policy
//!
//! - Keys are resolved lazily, on the first token that needs them
//! - Resolution runs at most once per process, even under concurrent first
//!   requests; everyone else waits for that single run and shares its result
//! - A failed resolution is cached as well and returned to every caller until
//!   restart (no retry on the request path)
//! - HTTP calls are bounded by a 5 second timeout
//!
//! After resolution, verification is purely local.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey, Header};
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::error::AuthError;

/// Upper bound for each discovery/JWKS HTTP request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Issuer metadata and signing keys of the external identity provider.
#[derive(Debug, Clone)]
pub struct ResolvedKeys {
    /// Issuer every accepted token must carry in `iss`
    pub issuer: String,
    /// Published signing keys
    pub keys: JwkSet,
}

impl ResolvedKeys {
    /// Decoding keys that may have signed a token with this header.
    ///
    /// With a `kid` the match is exact; without one every signing key of a
    /// compatible type is a candidate. Symmetric keys are never candidates.
    pub fn candidates(&self, header: &Header) -> Result<Vec<DecodingKey>, AuthError> {
        let matching: Vec<&Jwk> = match header.kid.as_deref() {
            Some(kid) => self
                .keys
                .keys
                .iter()
                .filter(|k| k.common.key_id.as_deref() == Some(kid))
                .collect(),
            None => self.keys.keys.iter().collect(),
        };

        let keys: Vec<DecodingKey> = matching
            .into_iter()
            .filter(|jwk| is_signing_key(jwk) && key_supports(jwk, header.alg))
            .filter_map(|jwk| DecodingKey::from_jwk(jwk).ok())
            .collect();

        if keys.is_empty() {
            return Err(AuthError::NoMatchingKey);
        }
        Ok(keys)
    }
}

fn is_signing_key(jwk: &Jwk) -> bool {
    !matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption))
}

/// Whether `jwk` can verify signatures made with `alg`.
fn key_supports(jwk: &Jwk, alg: Algorithm) -> bool {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => matches!(
            alg,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ),
        AlgorithmParameters::EllipticCurve(ec) => matches!(
            (&ec.curve, alg),
            (EllipticCurve::P256, Algorithm::ES256) | (EllipticCurve::P384, Algorithm::ES384)
        ),
        AlgorithmParameters::OctetKeyPair(_) => alg == Algorithm::EdDSA,
        _ => false,
    }
}

/// Where signing keys come from.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn resolve(&self) -> Result<ResolvedKeys, AuthError>;
}

/// Subset of the OpenID provider metadata document we rely on.
#[derive(Debug, Deserialize)]
struct ProviderMetadata {
    issuer: String,
    jwks_uri: String,
}

/// Resolves keys over HTTPS, via discovery unless a JWKS URL is configured.
pub struct HttpKeySource {
    issuer: String,
    jwks_url: Option<String>,
    client: reqwest::Client,
}

impl HttpKeySource {
    pub fn new(issuer: impl Into<String>, jwks_url: Option<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            issuer: issuer.into(),
            jwks_url,
            client: reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?,
        })
    }

    fn discovery_url(&self) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            self.issuer.trim_end_matches('/')
        )
    }

    async fn discover_jwks_uri(&self) -> Result<String, AuthError> {
        let metadata: ProviderMetadata = self.get_json(&self.discovery_url()).await?;
        if metadata.issuer != self.issuer {
            return Err(AuthError::ProviderMisconfigured(format!(
                "issuer did not match the issuer returned by provider, expected {:?} got {:?}",
                self.issuer, metadata.issuer
            )));
        }
        Ok(metadata.jwks_uri)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, AuthError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::ProviderMisconfigured(format!("GET {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::ProviderMisconfigured(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::ProviderMisconfigured(format!("invalid JSON from {url}: {e}")))
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn resolve(&self) -> Result<ResolvedKeys, AuthError> {
        let jwks_url = match &self.jwks_url {
            Some(url) => url.clone(),
            None => self.discover_jwks_uri().await?,
        };
        let keys: JwkSet = self.get_json(&jwks_url).await?;

        Ok(ResolvedKeys {
            issuer: self.issuer.clone(),
            keys,
        })
    }
}

/// Process-lifetime cache around a [`KeySource`].
pub struct RemoteKeyResolver {
    source: Arc<dyn KeySource>,
    resolved: OnceCell<Result<Arc<ResolvedKeys>, String>>,
}

impl RemoteKeyResolver {
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            resolved: OnceCell::new(),
        }
    }

    /// Resolved keys, running the source on first use only.
    pub async fn keys(&self) -> Result<Arc<ResolvedKeys>, AuthError> {
        let outcome = self
            .resolved
            .get_or_init(|| async {
                match self.source.resolve().await {
                    Ok(keys) => {
                        tracing::info!(
                            issuer = %keys.issuer,
                            keys = keys.keys.keys.len(),
                            "Resolved identity provider signing keys"
                        );
                        Ok(Arc::new(keys))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Identity provider key resolution failed; auth stays unavailable until restart");
                        Err(match e {
                            AuthError::ProviderMisconfigured(msg) => msg,
                            other => other.to_string(),
                        })
                    }
                }
            })
            .await;

        outcome
            .clone()
            .map_err(AuthError::ProviderMisconfigured)
    }

    /// `None` until the first resolution finished, then whether it succeeded.
    pub fn status(&self) -> Option<bool> {
        self.resolved.get().map(Result::is_ok)
    }
}
