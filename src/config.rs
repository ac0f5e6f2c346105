// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the parsed start-up settings.
//! Configuration is read once in `main`; everything downstream receives
//! typed values.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH_PROVIDER` | `local` or `keycloak` (alias `oidc`) | `local` |
//! | `JWT_SECRET` | HMAC secret for session tokens | Required for `local` |
//! | `JWT_EXPIRATION` | Access token lifetime | `24h` |
//! | `JWT_REFRESH_EXPIRATION` | Refresh token lifetime | `168h` |
//! | `KEYCLOAK_ISSUER` | OIDC issuer URL | Required for `keycloak` |
//! | `KEYCLOAK_JWKS_URL` | Explicit JWKS URL, skips discovery | Optional |
//! | `KEYCLOAK_AUDIENCE` | Comma-separated audience allow-list | Optional |
//! | `KEYCLOAK_CLIENT_ID` | Client whose `resource_access` roles count | Optional |
//! | `DATA_DIR` | Directory of the embedded user database | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const AUTH_PROVIDER_ENV: &str = "AUTH_PROVIDER";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRATION_ENV: &str = "JWT_EXPIRATION";
pub const JWT_REFRESH_EXPIRATION_ENV: &str = "JWT_REFRESH_EXPIRATION";
pub const KEYCLOAK_ISSUER_ENV: &str = "KEYCLOAK_ISSUER";
pub const KEYCLOAK_JWKS_URL_ENV: &str = "KEYCLOAK_JWKS_URL";
pub const KEYCLOAK_AUDIENCE_ENV: &str = "KEYCLOAK_AUDIENCE";
pub const KEYCLOAK_CLIENT_ID_ENV: &str = "KEYCLOAK_CLIENT_ID";

/// Environment variable name for the user database directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "./data";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Default access token lifetime (24h).
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Default refresh token lifetime (168h).
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(168 * 60 * 60);

/// Start-up configuration errors. Any of these aborts the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown AUTH_PROVIDER {0:?} (expected local or keycloak)")]
    UnknownProvider(String),

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} is not a valid URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error("PORT is not a valid port: {0:?}")]
    InvalidPort(String),
}

/// Self-issued session token settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSettings {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// External OpenID Connect provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcSettings {
    pub issuer: String,
    pub jwks_url: Option<String>,
    pub audiences: Vec<String>,
    pub client_id: Option<String>,
}

/// Which provider authenticates requests. Chosen once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    Local(LocalSettings),
    Oidc(OidcSettings),
}

impl AuthConfig {
    /// Parse auth settings from a variable lookup (usually `std::env::var`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = get(AUTH_PROVIDER_ENV).unwrap_or_else(|| "local".to_string());
        match provider.to_ascii_lowercase().as_str() {
            "local" => {
                let secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
                Ok(AuthConfig::Local(LocalSettings {
                    secret,
                    access_ttl: duration_or(
                        JWT_EXPIRATION_ENV,
                        get(JWT_EXPIRATION_ENV),
                        DEFAULT_ACCESS_TTL,
                    ),
                    refresh_ttl: duration_or(
                        JWT_REFRESH_EXPIRATION_ENV,
                        get(JWT_REFRESH_EXPIRATION_ENV),
                        DEFAULT_REFRESH_TTL,
                    ),
                }))
            }
            "keycloak" | "oidc" => {
                let issuer =
                    get(KEYCLOAK_ISSUER_ENV).ok_or(ConfigError::Missing(KEYCLOAK_ISSUER_ENV))?;
                validate_url(KEYCLOAK_ISSUER_ENV, &issuer)?;

                let jwks_url = get(KEYCLOAK_JWKS_URL_ENV);
                if let Some(url) = &jwks_url {
                    validate_url(KEYCLOAK_JWKS_URL_ENV, url)?;
                }

                Ok(AuthConfig::Oidc(OidcSettings {
                    issuer,
                    jwks_url,
                    audiences: get(KEYCLOAK_AUDIENCE_ENV)
                        .map(|v| split_list(&v))
                        .unwrap_or_default(),
                    client_id: get(KEYCLOAK_CLIENT_ID_ENV),
                }))
            }
            _ => Err(ConfigError::UnknownProvider(provider)),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            AuthConfig::Local(_) => "local",
            AuthConfig::Oidc(_) => "keycloak",
        }
    }
}

/// Full server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: lookup(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            auth: AuthConfig::from_lookup(&lookup)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn duration_or(name: &str, raw: Option<String>, default: Duration) -> Duration {
    let Some(raw) = raw else {
        return default;
    };
    match humantime::parse_duration(&raw) {
        Ok(d) if !d.is_zero() => d,
        _ => {
            tracing::warn!(
                variable = name,
                value = %raw,
                default = %humantime::format_duration(default),
                "Invalid duration, using default"
            );
            default
        }
    }
}

fn validate_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl {
            name,
            reason: e.to_string(),
        })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
