//! Conversation API endpoints
//!
//! POST /api/conversations              - Get or create the conversation with a user
//! GET  /api/conversations              - List own conversations with activity metadata
//! GET  /api/conversations/:id/messages - Message history, chronological
//! POST /api/conversations/:id/messages - Send a message without a socket

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use amora_core::types::{
    Conversation, ConversationSummary, Message, MessageType, PeerProfile,
};
use amora_core::{advisory, ChatStore};

use super::ApiError;
use crate::middleware::auth::AuthedUser;
use crate::websocket::session::spawn_memory_update;

/// Default page size for message history.
const DEFAULT_MESSAGE_LIMIT: i64 = 50;
/// Largest accepted `limit`; anything above falls back to the default.
const MAX_MESSAGE_LIMIT: i64 = 200;

/// Create the conversations router
pub fn conversations_routes() -> Router {
    Router::new()
        .route(
            "/api/conversations",
            post(create_conversation).get(list_conversations),
        )
        .route(
            "/api/conversations/:id/messages",
            get(list_messages).post(send_message),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

/// `POST /api/conversations`
///
/// Get-or-create keeps the pair unique: both directions land on the same
/// row, so repeating the call is harmless.
async fn create_conversation(
    AuthedUser(user_id): AuthedUser,
    Extension(store): Extension<Arc<ChatStore>>,
    Json(request): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    if request.user_id == user_id {
        return Err(ApiError::bad_request(
            "Cannot start a conversation with yourself",
        ));
    }
    if store.user_by_id(request.user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let conversation = store
        .get_or_create_conversation(user_id, request.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// `GET /api/conversations`
///
/// Each entry carries the counterpart's public profile, the latest message,
/// the unread count and the requester's own memory stage, newest first.
async fn list_conversations(
    AuthedUser(user_id): AuthedUser,
    Extension(store): Extension<Arc<ChatStore>>,
) -> Result<Json<Value>, ApiError> {
    let conversations = store.conversations_for_user(user_id).await?;

    let mut summaries = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let Some(counterpart_id) = conversation.counterpart_of(user_id) else {
            continue;
        };
        let Some(counterpart) = store.user_by_id(counterpart_id).await? else {
            continue;
        };

        let last_message = store.last_message(conversation.id).await?;
        let unread_count = store.unread_count(conversation.id, user_id).await?;
        let stage = store
            .memory_context(conversation.id, user_id)
            .await?
            .map_or(0, |ctx| ctx.stage.as_i64());

        summaries.push(ConversationSummary {
            conversation,
            other_user: PeerProfile::from(&counterpart),
            last_message,
            unread_count,
            stage,
        });
    }

    Ok(Json(json!({ "conversations": summaries })))
}

/// `GET /api/conversations/:id/messages?limit=`
async fn list_messages(
    AuthedUser(user_id): AuthedUser,
    Path(conversation_id): Path<String>,
    Query(query): Query<MessagesQuery>,
    Extension(store): Extension<Arc<ChatStore>>,
) -> Result<Json<Value>, ApiError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;
    require_participant(&store, conversation_id, user_id).await?;

    let limit = query
        .limit
        .filter(|l| *l > 0 && *l <= MAX_MESSAGE_LIMIT)
        .unwrap_or(DEFAULT_MESSAGE_LIMIT);
    let messages = store.recent_messages(conversation_id, limit).await?;

    Ok(Json(json!({ "messages": messages })))
}

/// `POST /api/conversations/:id/messages`
///
/// REST twin of the relay's message frame for clients without an open
/// socket. Persists as sent and evolves the sender's memory; nothing is
/// pushed, the counterpart picks it up on their next pull.
async fn send_message(
    AuthedUser(user_id): AuthedUser,
    Path(conversation_id): Path<String>,
    Extension(store): Extension<Arc<ChatStore>>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;
    if request.content.is_empty() {
        return Err(ApiError::bad_request("Message content cannot be empty"));
    }
    let counterpart_id = require_participant(&store, conversation_id, user_id).await?;

    let message = Message::new(conversation_id, user_id, request.content, request.message_type);
    store.insert_message(&message).await?;

    advisory(
        "touch_last_message",
        store
            .touch_last_message(conversation_id, message.created_at)
            .await,
    );
    spawn_memory_update(
        store.clone(),
        conversation_id,
        user_id,
        counterpart_id,
        message.content.clone(),
    );

    Ok((StatusCode::CREATED, Json(message)))
}

fn parse_conversation_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid conversation ID"))
}

/// Resolve the counterpart, rejecting outsiders.
///
/// An unknown conversation gets the same 403 as a foreign one, so the
/// response does not reveal which conversation ids exist.
async fn require_participant(
    store: &ChatStore,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<Uuid, ApiError> {
    store
        .conversation_by_id(conversation_id)
        .await?
        .and_then(|conversation| conversation.counterpart_of(user_id))
        .ok_or_else(|| ApiError::forbidden("Access denied"))
}
