//! Web API module for Amora
//!
//! Provides REST API endpoints for:
//! - Phone verification and token auth
//! - Profile management
//! - Conversations and message history
//! - AI reply suggestions

pub mod ai;
pub mod auth;
pub mod conversations;
pub mod health;
pub mod profile;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use tracing::error;

pub use ai::ai_routes;
pub use auth::auth_routes;
pub use conversations::conversations_routes;
pub use health::health_routes;
pub use profile::profile_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .merge(profile_routes())
        .merge(conversations_routes())
        .merge(ai_routes())
}

/// Uniform REST error: a status code plus an `{"error": "<message>"}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<amora_core::Error> for ApiError {
    fn from(err: amora_core::Error) -> Self {
        use amora_core::Error;
        match err {
            Error::Validation(msg) => Self::bad_request(msg),
            Error::Unauthorized(msg) => Self::forbidden(msg),
            Error::NotFound(entity) => Self::not_found(format!("{} not found", entity)),
            err => {
                error!(error = %err, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<amora_core::AuthError> for ApiError {
    fn from(err: amora_core::AuthError) -> Self {
        match err {
            amora_core::AuthError::Internal(msg) => {
                error!(error = %msg, "auth store failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            err => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
        }
    }
}
