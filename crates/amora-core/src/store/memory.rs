//! Conversational memory persistence.
//!
//! Traits and patterns are stored as JSON text; the stage is stored as its
//! numeric level.

use amora_memory::{MemoryContext, Stage};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Result;

use super::{parse_uuid, ChatStore};

#[derive(FromRow)]
struct MemoryRow {
    id: String,
    conversation_id: String,
    user_id: String,
    stage: i64,
    target_traits: String,
    successful_patterns: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MemoryRow> for MemoryContext {
    type Error = crate::error::Error;

    fn try_from(row: MemoryRow) -> Result<MemoryContext> {
        Ok(MemoryContext {
            id: parse_uuid(&row.id)?,
            conversation_id: parse_uuid(&row.conversation_id)?,
            user_id: parse_uuid(&row.user_id)?,
            stage: Stage::from_i64(row.stage),
            traits: serde_json::from_str(&row.target_traits)?,
            patterns: serde_json::from_str(&row.successful_patterns)?,
            updated_at: row.updated_at,
        })
    }
}

impl ChatStore {
    /// The memory context a user has built up in a conversation, if any.
    pub async fn memory_context(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MemoryContext>> {
        let row: Option<MemoryRow> = sqlx::query_as(
            "SELECT * FROM memory_contexts WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(conversation_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(MemoryContext::try_from).transpose()
    }

    /// Fetch a memory context, creating a cold-start one on first use.
    pub async fn get_or_create_memory(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<MemoryContext> {
        let fresh = MemoryContext::fresh(conversation_id, user_id);
        let traits_json = serde_json::to_string(&fresh.traits)?;
        let patterns_json = serde_json::to_string(&fresh.patterns)?;

        // INSERT OR IGNORE so an existing context is never reset.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO memory_contexts (
                id, conversation_id, user_id, stage,
                target_traits, successful_patterns, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fresh.id.to_string())
        .bind(fresh.conversation_id.to_string())
        .bind(fresh.user_id.to_string())
        .bind(fresh.stage.as_i64())
        .bind(traits_json)
        .bind(patterns_json)
        .bind(fresh.updated_at)
        .execute(&self.pool)
        .await?;

        let row: MemoryRow = sqlx::query_as(
            "SELECT * FROM memory_contexts WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(conversation_id.to_string())
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Insert or update a memory context for its (conversation, user) pair.
    pub async fn save_memory(&self, ctx: &MemoryContext) -> Result<()> {
        let traits_json = serde_json::to_string(&ctx.traits)?;
        let patterns_json = serde_json::to_string(&ctx.patterns)?;

        sqlx::query(
            r#"
            INSERT INTO memory_contexts (
                id, conversation_id, user_id, stage,
                target_traits, successful_patterns, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(conversation_id, user_id) DO UPDATE SET
                stage = excluded.stage,
                target_traits = excluded.target_traits,
                successful_patterns = excluded.successful_patterns,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(ctx.id.to_string())
        .bind(ctx.conversation_id.to_string())
        .bind(ctx.user_id.to_string())
        .bind(ctx.stage.as_i64())
        .bind(traits_json)
        .bind(patterns_json)
        .bind(ctx.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FlirtStyle, User};
    use amora_memory::advance;

    async fn seed_conversation(store: &ChatStore) -> (Uuid, Uuid) {
        let now = Utc::now();
        let mut ids = Vec::new();
        for phone in ["13800138001", "13800138002"] {
            let user = User {
                id: Uuid::new_v4(),
                phone: phone.to_string(),
                nickname: "测试".to_string(),
                gender: None,
                age: None,
                avatar_url: None,
                bio: None,
                flirt_style: FlirtStyle::Humorous,
                created_at: now,
                updated_at: now,
            };
            store.create_user(&user).await.unwrap();
            ids.push(user.id);
        }
        let conv = store
            .get_or_create_conversation(ids[0], ids[1])
            .await
            .unwrap();
        (conv.id, ids[0])
    }

    #[tokio::test]
    async fn test_absent_context_is_none() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, user) = seed_conversation(&store).await;
        assert!(store.memory_context(conv, user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_or_create_starts_cold() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, user) = seed_conversation(&store).await;

        let ctx = store.get_or_create_memory(conv, user).await.unwrap();
        assert_eq!(ctx.stage, Stage::ColdStart);
        assert!(ctx.traits.interests.is_empty());
        assert_eq!(ctx.patterns.message_count, 0);

        // Second call returns the same row.
        let again = store.get_or_create_memory(conv, user).await.unwrap();
        assert_eq!(again.id, ctx.id);
    }

    #[tokio::test]
    async fn test_save_and_reload_round_trip() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, user) = seed_conversation(&store).await;

        let mut ctx = store.get_or_create_memory(conv, user).await.unwrap();
        ctx = advance(&ctx, "我喜欢音乐和旅行");
        store.save_memory(&ctx).await.unwrap();

        let reloaded = store.memory_context(conv, user).await.unwrap().unwrap();
        assert_eq!(reloaded.id, ctx.id);
        assert_eq!(reloaded.stage, Stage::BreakingIce);
        assert_eq!(reloaded.traits.interests, vec!["music", "travel"]);
        assert_eq!(reloaded.patterns.message_count, 1);
    }

    #[tokio::test]
    async fn test_save_updates_existing_row() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, user) = seed_conversation(&store).await;

        let mut ctx = store.get_or_create_memory(conv, user).await.unwrap();
        for content in ["你好", "今天怎么样?", "我喜欢运动"] {
            ctx = advance(&ctx, content);
            store.save_memory(&ctx).await.unwrap();
        }

        let reloaded = store.memory_context(conv, user).await.unwrap().unwrap();
        assert_eq!(reloaded.patterns.message_count, 3);
        assert_eq!(reloaded.patterns.question, 1);
        assert_eq!(reloaded.traits.interests, vec!["sports"]);
    }

    #[tokio::test]
    async fn test_empty_json_columns_decode_to_defaults() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, user) = seed_conversation(&store).await;

        sqlx::query(
            r#"
            INSERT INTO memory_contexts (
                id, conversation_id, user_id, stage,
                target_traits, successful_patterns, updated_at
            ) VALUES (?, ?, ?, 0, '{}', '{}', ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(conv.to_string())
        .bind(user.to_string())
        .bind(Utc::now())
        .execute(&store.pool)
        .await
        .unwrap();

        let ctx = store.memory_context(conv, user).await.unwrap().unwrap();
        assert_eq!(ctx.stage, Stage::ColdStart);
        assert!(ctx.traits.topics.is_empty());
        assert_eq!(ctx.patterns.statement, 0);
    }
}
