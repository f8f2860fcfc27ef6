//! Profile API endpoints
//!
//! GET /api/profile/me             - Own user record
//! PUT /api/profile/me             - Partial profile update
//! PUT /api/profile/flirt-style    - Change the suggestion style
//! GET /api/profile/users/:user_id - Another user's record

use axum::{
    extract::Path,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use amora_core::types::{FlirtStyle, ProfileUpdate, User};
use amora_core::ChatStore;

use super::ApiError;
use crate::middleware::auth::AuthedUser;

/// Create the profile router
pub fn profile_routes() -> Router {
    Router::new()
        .route("/api/profile/me", get(my_profile).put(update_my_profile))
        .route("/api/profile/flirt-style", put(update_flirt_style))
        .route("/api/profile/users/:user_id", get(user_profile))
}

#[derive(Debug, Deserialize)]
pub struct FlirtStyleRequest {
    pub flirt_style: FlirtStyle,
}

/// `GET /api/profile/me`
async fn my_profile(
    AuthedUser(user_id): AuthedUser,
    Extension(store): Extension<Arc<ChatStore>>,
) -> Result<Json<User>, ApiError> {
    let user = store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user))
}

/// `PUT /api/profile/me`: unset fields keep their stored value.
async fn update_my_profile(
    AuthedUser(user_id): AuthedUser,
    Extension(store): Extension<Arc<ChatStore>>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Value>, ApiError> {
    store.update_profile(user_id, &update).await?;
    Ok(Json(json!({ "message": "Profile updated successfully" })))
}

/// `PUT /api/profile/flirt-style`
async fn update_flirt_style(
    AuthedUser(user_id): AuthedUser,
    Extension(store): Extension<Arc<ChatStore>>,
    Json(request): Json<FlirtStyleRequest>,
) -> Result<Json<Value>, ApiError> {
    store.set_flirt_style(user_id, request.flirt_style).await?;
    Ok(Json(json!({ "message": "Flirt style updated successfully" })))
}

/// `GET /api/profile/users/:user_id`
async fn user_profile(
    AuthedUser(_requester): AuthedUser,
    Path(user_id): Path<Uuid>,
    Extension(store): Extension<Arc<ChatStore>>,
) -> Result<Json<User>, ApiError> {
    let user = store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user))
}
