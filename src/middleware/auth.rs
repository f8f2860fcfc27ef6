//! Authentication middleware for Axum
//!
//! Extracts Bearer tokens from requests and validates them against the
//! AuthStore. Provides the `AuthedUser` extractor for handlers.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use amora_core::{AuthError, AuthStore};

/// Auth rejection type
pub struct AuthRejection {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => AuthRejection {
                status: StatusCode::UNAUTHORIZED,
                message: "Authentication required. Provide Authorization: Bearer <token> or ?token=<token>."
                    .to_string(),
            },
            AuthError::InvalidToken => AuthRejection {
                status: StatusCode::UNAUTHORIZED,
                message: "Invalid or revoked token".to_string(),
            },
            AuthError::Internal(msg) => AuthRejection {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: msg,
            },
        }
    }
}

// ============================================================================
// AuthedUser Extractor
// ============================================================================

/// Axum extractor that requires a valid session token.
///
/// Extracts the token from:
/// 1. `Authorization: Bearer <token>` header
/// 2. `?token=<token>` query parameter (for WebSocket upgrades, since
///    browser WebSocket clients cannot set headers)
pub struct AuthedUser(pub Uuid);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        // Get AuthStore from extensions
        let auth_store = parts
            .extensions
            .get::<Arc<AuthStore>>()
            .ok_or_else(|| AuthError::Internal("AuthStore not configured".to_string()))?;

        let token = extract_token(parts)?;
        let user_id = auth_store.validate(&token)?;

        Ok(AuthedUser(user_id))
    }
}

// ============================================================================
// BearerToken Extractor
// ============================================================================

/// Axum extractor for the raw presented token, without validating it.
///
/// Logout revokes by token value, so it needs the token itself rather than
/// the resolved user id. Pair with `AuthedUser` when validity matters.
pub struct BearerToken(pub String);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(BearerToken(extract_token(parts)?))
    }
}

/// Extract token from request headers or query params
fn extract_token(parts: &Parts) -> std::result::Result<String, AuthError> {
    // 1. Authorization: Bearer <token>
    if let Some(auth_header) = parts.headers.get("authorization") {
        if let Ok(value) = auth_header.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Ok(token.trim().to_string());
            }
        }
    }

    // 2. ?token= query parameter (for WebSocket upgrades)
    if let Some(query) = parts.uri.query() {
        for param in query.split('&') {
            if let Some(token) = param.strip_prefix("token=") {
                return Ok(token.to_string());
            }
        }
    }

    Err(AuthError::MissingCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_for(uri: &str, bearer: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_missing_credentials_is_unauthorized() {
        let rejection = AuthRejection::from(AuthError::MissingCredentials);
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_invalid_token_is_unauthorized() {
        let rejection = AuthRejection::from(AuthError::InvalidToken);
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_error_is_500() {
        let rejection = AuthRejection::from(AuthError::Internal("boom".to_string()));
        assert_eq!(rejection.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_extract_token_prefers_bearer_header() {
        let parts = parts_for("/ws?token=from-query", Some("from-header"));
        assert_eq!(extract_token(&parts).unwrap(), "from-header");
    }

    #[test]
    fn test_extract_token_falls_back_to_query() {
        let parts = parts_for("/ws?foo=bar&token=from-query", None);
        assert_eq!(extract_token(&parts).unwrap(), "from-query");
    }

    #[test]
    fn test_extract_token_missing() {
        let parts = parts_for("/ws", None);
        assert_eq!(
            extract_token(&parts).unwrap_err(),
            AuthError::MissingCredentials
        );
    }

    #[tokio::test]
    async fn test_extractor_round_trip() {
        let store = Arc::new(AuthStore::new());
        let user_id = Uuid::new_v4();
        let token = store.issue(user_id).unwrap();

        let mut parts = parts_for("/api/profile/me", Some(&token));
        parts.extensions.insert(store.clone());

        let AuthedUser(extracted) = AuthedUser::from_request_parts(&mut parts, &())
            .await
            .map_err(|_| "rejected")
            .unwrap();
        assert_eq!(extracted, user_id);
    }

    #[tokio::test]
    async fn test_extractor_rejects_unknown_token() {
        let store = Arc::new(AuthStore::new());
        let mut parts = parts_for("/api/profile/me", Some("amora_not_issued"));
        parts.extensions.insert(store);

        let result = AuthedUser::from_request_parts(&mut parts, &()).await;
        let rejection = match result {
            Err(rejection) => rejection,
            Ok(_) => panic!("unknown token must be rejected"),
        };
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
    }
}
