// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the bound caller.
//!
//! Behind a gate these read the claims the gate bound into the request
//! extensions. Without a gate they verify the `Authorization` header with the
//! provider from [`AppState`].
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user.tenant_id scopes every query
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Extractor for authenticated users.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if a gate already bound the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let user = state.auth.verify_headers(&parts.headers).await?;
        Ok(Auth(user))
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of rejecting.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(auth: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _temp_dir) = AppState::for_tests();
        let mut parts = parts(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_verifies_header() {
        let (state, _temp_dir) = AppState::for_tests();
        let token = state
            .auth
            .local_codec()
            .unwrap()
            .issue_access("user_123", "tenant_1", "", "user")
            .unwrap();
        let mut parts = parts(Some(format!("Bearer {token}")));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.tenant_id, "tenant_1");
        assert_eq!(user.email, None);
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let (state, _temp_dir) = AppState::for_tests();
        let mut parts = parts(None);
        parts.extensions.insert(AuthenticatedUser::new(
            "user_from_gate",
            "tenant_1",
            None,
            vec!["admin".to_string()],
        ));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "user_from_gate");
    }

    #[tokio::test]
    async fn optional_auth_returns_none_on_bad_token() {
        let (state, _temp_dir) = AppState::for_tests();

        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts(None), &state)
            .await
            .unwrap();
        assert!(user.is_none());

        let OptionalAuth(user) =
            OptionalAuth::from_request_parts(&mut parts(Some("Bearer nope".to_string())), &state)
                .await
                .unwrap();
        assert!(user.is_none());
    }
}
