//! Authentication API endpoints
//!
//! POST /api/auth/send-code - Issue an SMS verification code
//! POST /api/auth/register  - Create an account with a verified code
//! POST /api/auth/login     - Exchange a verified code for a session token
//! POST /api/auth/logout    - Revoke the presented token

use axum::{http::StatusCode, routing::post, Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use amora_core::types::{FlirtStyle, Gender, User};
use amora_core::{is_valid_phone, AuthStore, ChatStore, CodeStore};

use super::ApiError;
use crate::middleware::auth::{AuthedUser, BearerToken};

/// Create the auth router
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/send-code", post(send_code))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub phone: String,
    pub code: String,
    pub nickname: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub flirt_style: Option<FlirtStyle>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub code: String,
}

/// User record plus session token, returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// `POST /api/auth/send-code`
async fn send_code(
    Extension(codes): Extension<Arc<CodeStore>>,
    Json(request): Json<SendCodeRequest>,
) -> Result<Json<Value>, ApiError> {
    if !is_valid_phone(&request.phone) {
        return Err(ApiError::bad_request("Invalid phone number"));
    }

    // Delivery is stubbed: the code store logs the code instead of texting it.
    codes.issue(&request.phone).await;

    Ok(Json(json!({
        "message": "Verification code sent",
        "phone": request.phone,
    })))
}

/// `POST /api/auth/register`
async fn register(
    Extension(store): Extension<Arc<ChatStore>>,
    Extension(auth): Extension<Arc<AuthStore>>,
    Extension(codes): Extension<Arc<CodeStore>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    codes
        .verify(&request.phone, &request.code)
        .await
        .map_err(|_| ApiError::bad_request("Invalid verification code"))?;

    if store.user_by_phone(&request.phone).await?.is_some() {
        return Err(ApiError::conflict("User already exists"));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        phone: request.phone,
        nickname: request.nickname,
        gender: request.gender,
        age: request.age,
        avatar_url: None,
        bio: None,
        flirt_style: request.flirt_style.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user).await?;

    let token = auth.issue(user.id)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

/// `POST /api/auth/login`
async fn login(
    Extension(store): Extension<Arc<ChatStore>>,
    Extension(auth): Extension<Arc<AuthStore>>,
    Extension(codes): Extension<Arc<CodeStore>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    codes
        .verify(&request.phone, &request.code)
        .await
        .map_err(|_| ApiError::bad_request("Invalid verification code"))?;

    let user = store
        .user_by_phone(&request.phone)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let token = auth.issue(user.id)?;
    Ok(Json(AuthResponse { user, token }))
}

/// `POST /api/auth/logout`
///
/// Revocation is keyed by the token itself, which is why this takes the raw
/// token alongside the validity check.
async fn logout(
    AuthedUser(_user_id): AuthedUser,
    BearerToken(token): BearerToken,
    Extension(auth): Extension<Arc<AuthStore>>,
) -> Result<Json<Value>, ApiError> {
    auth.revoke(&token)?;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn stores() -> (Arc<ChatStore>, Arc<AuthStore>, Arc<CodeStore>) {
        (
            Arc::new(ChatStore::in_memory().await.unwrap()),
            Arc::new(AuthStore::new()),
            Arc::new(CodeStore::new()),
        )
    }

    #[tokio::test]
    async fn test_send_code_rejects_short_phone() {
        let (_, _, codes) = stores().await;
        let result = send_code(
            Extension(codes),
            Json(SendCodeRequest {
                phone: "12345".to_string(),
            }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_register_then_login_round_trip() {
        let (store, auth, codes) = stores().await;
        let phone = "13800138000".to_string();

        let code = codes.issue(&phone).await;
        let (status, Json(created)) = register(
            Extension(store.clone()),
            Extension(auth.clone()),
            Extension(codes.clone()),
            Json(RegisterRequest {
                phone: phone.clone(),
                code,
                nickname: "小明".to_string(),
                gender: Some(Gender::Male),
                age: Some(27),
                flirt_style: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.user.flirt_style, FlirtStyle::Humorous);
        assert_eq!(auth.validate(&created.token).unwrap(), created.user.id);

        let code = codes.issue(&phone).await;
        let Json(logged_in) = login(
            Extension(store),
            Extension(auth.clone()),
            Extension(codes),
            Json(LoginRequest { phone, code }),
        )
        .await
        .unwrap();

        assert_eq!(logged_in.user.id, created.user.id);
        assert_eq!(auth.validate(&logged_in.token).unwrap(), created.user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_wrong_code() {
        let (store, auth, codes) = stores().await;
        codes.issue("13800138000").await;

        let result = register(
            Extension(store),
            Extension(auth),
            Extension(codes),
            Json(RegisterRequest {
                phone: "13800138000".to_string(),
                code: "000000x".to_string(),
                nickname: "小明".to_string(),
                gender: None,
                age: None,
                flirt_style: None,
            }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_register_conflicts_on_existing_phone() {
        let (store, auth, codes) = stores().await;
        let phone = "13800138000".to_string();

        let code = codes.issue(&phone).await;
        register(
            Extension(store.clone()),
            Extension(auth.clone()),
            Extension(codes.clone()),
            Json(RegisterRequest {
                phone: phone.clone(),
                code,
                nickname: "小明".to_string(),
                gender: None,
                age: None,
                flirt_style: None,
            }),
        )
        .await
        .unwrap();

        let code = codes.issue(&phone).await;
        let result = register(
            Extension(store),
            Extension(auth),
            Extension(codes),
            Json(RegisterRequest {
                phone,
                code,
                nickname: "李鬼".to_string(),
                gender: None,
                age: None,
                flirt_style: None,
            }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_login_unknown_phone_is_not_found() {
        let (store, auth, codes) = stores().await;
        let code = codes.issue("13800138000").await;

        let result = login(
            Extension(store),
            Extension(auth),
            Extension(codes),
            Json(LoginRequest {
                phone: "13800138000".to_string(),
                code,
            }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_logout_revokes_the_token() {
        let (_, auth, _) = stores().await;
        let user_id = Uuid::new_v4();
        let token = auth.issue(user_id).unwrap();

        logout(
            AuthedUser(user_id),
            BearerToken(token.clone()),
            Extension(auth.clone()),
        )
        .await
        .unwrap();

        assert!(auth.validate(&token).is_err());
    }
}
