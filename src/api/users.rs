// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.
//!
//! Every lookup is scoped to the caller's tenant; a user of another tenant is
//! reported as missing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::{Auth, AuthenticatedUser},
    error::ApiError,
    models::{
        ListUsersQuery, RegisterRequest, UserCountResponse, UserListResponse, UserResponse,
    },
    provisioning::ensure_local_user,
    state::AppState,
    storage::{StorageError, StoredUser},
};

/// Register a local account (local provider only).
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    tag = "Users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Email already registered"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let role = request.validate().map_err(ApiError::bad_request)?;
    let password_hash = state
        .passwords
        .hash_blocking(request.password.clone())
        .await?;

    let user = StoredUser::new(
        Uuid::new_v4().to_string(),
        request.tenant_id.trim(),
        request.name.trim(),
        role,
    )
    .with_email(request.email.trim())
    .with_password_hash(password_hash);

    match state.users.create(&user) {
        Ok(()) => {}
        Err(StorageError::AlreadyExists(_)) => {
            return Err(ApiError::conflict("Email already registered"))
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, role = %user.role, "User registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Get the caller's own user record.
///
/// Under the external provider the record is created on first call.
#[utoipa::path(
    get,
    path = "/api/v1/users/profile",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Own profile", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<UserResponse>, ApiError> {
    let stored = if state.auth.provisions_users() {
        ensure_local_user(state.users.as_ref(), &user)?
    } else {
        match state.users.get(&user.user_id) {
            Ok(stored) => stored,
            Err(StorageError::NotFound(_)) => return Err(ApiError::not_found("User not found")),
            Err(e) => return Err(e.into()),
        }
    };
    Ok(Json(stored.into()))
}

/// List users of the caller's tenant (admin).
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer" = [])),
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users of the tenant", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Auth(user): Auth,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let (limit, offset) = (query.limit(), query.offset());
    let users = state.users.list(&user.tenant_id, limit, offset)?;
    let total = state.users.count(&user.tenant_id)?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Count users of the caller's tenant (admin or manager).
#[utoipa::path(
    get,
    path = "/api/v1/users/count",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User count", body = UserCountResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin or manager role required"),
    )
)]
pub async fn count_users(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<UserCountResponse>, ApiError> {
    let count = state.users.count(&user.tenant_id)?;
    Ok(Json(UserCountResponse { count }))
}

fn tenant_user(state: &AppState, caller: &AuthenticatedUser, id: &str) -> Result<StoredUser, ApiError> {
    match state.users.get(id) {
        Ok(user) if user.tenant_id == caller.tenant_id => Ok(user),
        Ok(_) | Err(StorageError::NotFound(_)) => Err(ApiError::not_found("User not found")),
        Err(e) => Err(e.into()),
    }
}

/// Get a user of the caller's tenant (admin).
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(tenant_user(&state, &caller, &user_id)?.into()))
}

/// Delete a user of the caller's tenant (admin).
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = tenant_user(&state, &caller, &user_id)?;
    state.users.delete(&user.id)?;

    tracing::info!(
        user_id = %user.id,
        tenant_id = %user.tenant_id,
        deleted_by = %caller.user_id,
        "User deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
