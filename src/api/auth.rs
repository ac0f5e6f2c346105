// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints.
//!
//! Login and refresh exist only under the local provider; the router does not
//! mount them otherwise. The session probe works with both providers.

use axum::{extract::State, Json};
use chrono::Utc;

use crate::{
    auth::{AuthError, OptionalAuth, TokenCodec, TokenPair},
    error::ApiError,
    models::{LoginRequest, LoginResponse, RefreshRequest, SessionResponse},
    state::AppState,
    storage::StorageError,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

fn local_codec(state: &AppState) -> Result<&TokenCodec, ApiError> {
    state
        .auth
        .local_codec()
        .ok_or_else(|| ApiError::not_found("Local authentication is disabled"))
}

/// Exchange email and password for a session token pair.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is inactive"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let codec = local_codec(&state)?;

    let found = match state.users.get_by_email(&request.email) {
        Ok(user) => Some(user),
        Err(StorageError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    // Unknown accounts still pay for one hash check.
    let stored_hash = found.as_ref().and_then(|u| u.password_hash.clone());
    let verified = state
        .passwords
        .verify_blocking(request.password, stored_hash)
        .await?;

    let mut user = match found {
        Some(user) if verified => user,
        Some(user) => {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
        None => return Err(ApiError::unauthorized(INVALID_CREDENTIALS)),
    };

    if !user.is_active {
        return Err(ApiError::forbidden("Account is inactive"));
    }

    let TokenPair {
        access_token,
        refresh_token,
    } = codec.issue_pair(
        &user.id,
        &user.tenant_id,
        user.email.as_deref().unwrap_or_default(),
        user.role.as_str(),
    )?;

    let now = Utc::now();
    user.last_login_at = Some(now);
    user.updated_at = now;
    state.users.update(&user)?;

    tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

/// Mint a new access token from a refresh token.
///
/// The refresh token is returned unchanged (no rotation).
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = TokenPair),
        (status = 401, description = "Invalid, expired or non-refresh token"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let codec = state
        .auth
        .local_codec()
        .ok_or_else(|| AuthError::ProviderMisconfigured("local authentication is disabled".to_string()))?;
    let access_token = codec.refresh_access(&request.refresh_token)?;

    Ok(Json(TokenPair {
        access_token,
        refresh_token: request.refresh_token,
    }))
}

/// Report whether the caller is authenticated, without requiring it.
#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    tag = "Auth",
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
    )
)]
pub async fn session(OptionalAuth(user): OptionalAuth) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: user.is_some(),
        user,
    })
}
