//! AI suggestion API endpoints
//!
//! GET /api/ai/suggestions/:conversation_id - Three reply suggestions

use axum::{extract::Path, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use amora_core::types::Suggestion;
use amora_core::{advisory, ChatStore, HistoryTurn, SuggestionAssembler, SuggestionContext};
use amora_memory::{Stage, TargetTraits};

use super::ApiError;
use crate::middleware::auth::AuthedUser;

/// How many recent messages feed the prompt context.
const SUGGESTION_HISTORY_LIMIT: i64 = 10;

/// Create the AI router
pub fn ai_routes() -> Router {
    Router::new().route("/api/ai/suggestions/:conversation_id", get(suggestions))
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub conversation_id: Uuid,
    pub stage: i64,
    pub suggestions: Vec<Suggestion>,
}

/// `GET /api/ai/suggestions/:conversation_id`
///
/// Always answers with exactly three suggestions; provider trouble degrades
/// to the style-dependent fallback inside the assembler rather than erroring
/// out here.
async fn suggestions(
    AuthedUser(user_id): AuthedUser,
    Path(conversation_id): Path<String>,
    Extension(store): Extension<Arc<ChatStore>>,
    Extension(assembler): Extension<Arc<SuggestionAssembler>>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let conversation_id = Uuid::parse_str(&conversation_id)
        .map_err(|_| ApiError::bad_request("Invalid conversation ID"))?;

    let counterpart_id = store
        .conversation_by_id(conversation_id)
        .await?
        .and_then(|conversation| conversation.counterpart_of(user_id))
        .ok_or_else(|| ApiError::forbidden("Access denied"))?;

    let style = store
        .user_by_id(user_id)
        .await?
        .map(|user| user.flirt_style)
        .unwrap_or_default();

    let (peer_nickname, peer_gender) = match store.user_by_id(counterpart_id).await? {
        Some(user) => (user.nickname, user.gender),
        None => ("对方".to_string(), None),
    };

    // No memory row yet means the relationship has not started moving.
    let (stage, traits) = match store.memory_context(conversation_id, user_id).await? {
        Some(ctx) => (ctx.stage, ctx.traits),
        None => (Stage::ColdStart, TargetTraits::default()),
    };

    let history = store
        .recent_messages(conversation_id, SUGGESTION_HISTORY_LIMIT)
        .await?
        .iter()
        .map(|message| HistoryTurn::new(message.sender_id == user_id, message.content.clone()))
        .collect();

    let generated = assembler
        .generate(&SuggestionContext {
            stage,
            style,
            peer_nickname,
            peer_gender,
            history,
            traits,
        })
        .await;

    // Analytics rows are best-effort; losing one never fails the request.
    for suggestion in &generated {
        advisory(
            "log_suggestion",
            store.log_suggestion(conversation_id, &suggestion.text).await,
        );
    }

    Ok(Json(SuggestionsResponse {
        conversation_id,
        stage: stage.as_i64(),
        suggestions: generated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use amora_core::types::{FlirtStyle, Message, MessageType, User};
    use chrono::Utc;

    async fn seed_user(store: &ChatStore, phone: &str, nickname: &str) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            nickname: nickname.to_string(),
            gender: None,
            age: None,
            avatar_url: None,
            bio: None,
            flirt_style: FlirtStyle::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.create_user(&user).await.unwrap();
        user.id
    }

    async fn setup() -> (Arc<ChatStore>, Arc<SuggestionAssembler>, Uuid, Uuid, Uuid) {
        let store = Arc::new(ChatStore::in_memory().await.unwrap());
        let assembler = Arc::new(SuggestionAssembler::without_provider());
        let alice = seed_user(&store, "13800138001", "小明").await;
        let bob = seed_user(&store, "13800138002", "小红").await;
        let conversation = store.get_or_create_conversation(alice, bob).await.unwrap();
        (store, assembler, alice, bob, conversation.id)
    }

    #[tokio::test]
    async fn test_suggestions_always_three_and_logged() {
        let (store, assembler, alice, bob, conversation) = setup().await;

        let message = Message::new(conversation, bob, "你喜欢旅行吗", MessageType::Text);
        store.insert_message(&message).await.unwrap();

        let Json(response) = suggestions(
            AuthedUser(alice),
            Path(conversation.to_string()),
            Extension(store.clone()),
            Extension(assembler),
        )
        .await
        .unwrap();

        assert_eq!(response.conversation_id, conversation);
        assert_eq!(response.stage, 0);
        assert_eq!(response.suggestions.len(), 3);

        let logged = store.suggestions_for(conversation).await.unwrap();
        assert_eq!(logged.len(), 3);
    }

    #[tokio::test]
    async fn test_outsider_gets_no_suggestions() {
        let (store, assembler, _alice, _bob, conversation) = setup().await;
        let mallory = seed_user(&store, "13800138003", "马洛").await;

        let result = suggestions(
            AuthedUser(mallory),
            Path(conversation.to_string()),
            Extension(store),
            Extension(assembler),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_malformed_id_is_rejected() {
        let (store, assembler, alice, _bob, _conversation) = setup().await;
        let result = suggestions(
            AuthedUser(alice),
            Path("definitely-not-a-uuid".to_string()),
            Extension(store),
            Extension(assembler),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stage_reflects_memory_context() {
        let (store, assembler, alice, _bob, conversation) = setup().await;

        let mut ctx = store
            .get_or_create_memory(conversation, alice)
            .await
            .unwrap();
        ctx.stage = Stage::WarmUp;
        store.save_memory(&ctx).await.unwrap();

        let Json(response) = suggestions(
            AuthedUser(alice),
            Path(conversation.to_string()),
            Extension(store),
            Extension(assembler),
        )
        .await
        .unwrap();
        assert_eq!(response.stage, Stage::WarmUp.as_i64());
    }
}
