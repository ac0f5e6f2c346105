// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthenticatedUser, Gate, Role, TokenPair},
    models::{
        LoginRequest, LoginResponse, RefreshRequest, RegisterRequest, SessionResponse,
        UserCountResponse, UserListResponse, UserResponse,
    },
    state::AppState,
};

pub mod auth;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let provider = state.auth.clone();

    let profile = Gate::authenticate(provider.clone())
        .wrap(Router::new().route("/users/profile", get(users::get_profile)));

    let admin = Gate::require_role(provider.clone(), Role::Admin.as_str()).wrap(
        Router::new()
            .route("/users", get(users::list_users))
            .route(
                "/users/{user_id}",
                get(users::get_user).delete(users::delete_user),
            ),
    );

    let staff = Gate::require_any_role(
        provider.clone(),
        [Role::Admin.as_str(), Role::Manager.as_str()],
    )
    .wrap(Router::new().route("/users/count", get(users::count_users)));

    let session = Gate::optional_auth(provider.clone())
        .wrap(Router::new().route("/auth/session", get(auth::session)));

    let mut v1_routes = Router::new()
        .merge(profile)
        .merge(admin)
        .merge(staff)
        .merge(session);

    // Account and token endpoints only make sense for self-issued sessions.
    if provider.local_codec().is_some() {
        v1_routes = v1_routes
            .route("/users/register", post(users::register))
            .route("/auth/login", post(auth::login))
            .route("/auth/refresh", post(auth::refresh));
    }

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .nest("/api/v1", v1_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::refresh,
        auth::session,
        users::register,
        users::get_profile,
        users::list_users,
        users::count_users,
        users::get_user,
        users::delete_user,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            AuthenticatedUser,
            Role,
            TokenPair,
            LoginRequest,
            LoginResponse,
            RefreshRequest,
            RegisterRequest,
            SessionResponse,
            UserResponse,
            UserListResponse,
            UserCountResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sessions and token refresh"),
        (name = "Users", description = "Profiles and tenant user management"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
