//! Conversation persistence.
//!
//! A pair of users maps to exactly one conversation: participants are stored
//! in canonical order and the pair carries a UNIQUE constraint.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Result;
use crate::types::Conversation;

use super::{parse_uuid, ChatStore};

#[derive(FromRow)]
struct ConversationRow {
    id: String,
    user1_id: String,
    user2_id: String,
    created_at: DateTime<Utc>,
    last_message_at: DateTime<Utc>,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = crate::error::Error;

    fn try_from(row: ConversationRow) -> Result<Conversation> {
        Ok(Conversation {
            id: parse_uuid(&row.id)?,
            user1_id: parse_uuid(&row.user1_id)?,
            user2_id: parse_uuid(&row.user2_id)?,
            created_at: row.created_at,
            last_message_at: row.last_message_at,
        })
    }
}

impl ChatStore {
    /// Fetch the conversation for a user pair, creating it on first contact.
    ///
    /// Argument order does not matter; both orders resolve to the same row.
    pub async fn get_or_create_conversation(&self, a: Uuid, b: Uuid) -> Result<Conversation> {
        let candidate = Conversation::new(a, b);

        // INSERT OR IGNORE keeps this race-safe: losing a concurrent insert
        // just means the select below returns the winner's row.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO conversations (id, user1_id, user2_id, created_at, last_message_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(candidate.id.to_string())
        .bind(candidate.user1_id.to_string())
        .bind(candidate.user2_id.to_string())
        .bind(candidate.created_at)
        .bind(candidate.last_message_at)
        .execute(&self.pool)
        .await?;

        let row: ConversationRow =
            sqlx::query_as("SELECT * FROM conversations WHERE user1_id = ? AND user2_id = ?")
                .bind(candidate.user1_id.to_string())
                .bind(candidate.user2_id.to_string())
                .fetch_one(&self.pool)
                .await?;

        row.try_into()
    }

    /// Look up a conversation by id.
    pub async fn conversation_by_id(&self, id: Uuid) -> Result<Option<Conversation>> {
        let row: Option<ConversationRow> =
            sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Conversation::try_from).transpose()
    }

    /// All conversations a user participates in, most recently active first.
    pub async fn conversations_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        let rows: Vec<ConversationRow> = sqlx::query_as(
            r#"
            SELECT * FROM conversations
            WHERE user1_id = ? OR user2_id = ?
            ORDER BY last_message_at DESC
            "#,
        )
        .bind(user_id.to_string())
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Conversation::try_from).collect()
    }

    /// Bump a conversation's last-activity timestamp.
    pub async fn touch_last_message(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE conversations SET last_message_at = ? WHERE id = ?")
            .bind(at)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Messages the reader has not read yet: incoming rows not marked read.
    pub async fn unread_count(&self, conversation_id: Uuid, reader: Uuid) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = ? AND sender_id != ? AND status != 'read'
            "#,
        )
        .bind(conversation_id.to_string())
        .bind(reader.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FlirtStyle, Message, MessageType, User};

    async fn seed_user(store: &ChatStore, phone: &str) -> Uuid {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            nickname: format!("用户{}", &phone[phone.len() - 4..]),
            gender: None,
            age: None,
            avatar_url: None,
            bio: None,
            flirt_style: FlirtStyle::Humorous,
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user).await.unwrap();
        user.id
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = ChatStore::in_memory().await.unwrap();
        let a = seed_user(&store, "13800138001").await;
        let b = seed_user(&store, "13800138002").await;

        let first = store.get_or_create_conversation(a, b).await.unwrap();
        let second = store.get_or_create_conversation(a, b).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_pair_order_does_not_matter() {
        let store = ChatStore::in_memory().await.unwrap();
        let a = seed_user(&store, "13800138001").await;
        let b = seed_user(&store, "13800138002").await;

        let ab = store.get_or_create_conversation(a, b).await.unwrap();
        let ba = store.get_or_create_conversation(b, a).await.unwrap();
        assert_eq!(ab.id, ba.id);
        assert!(ab.user1_id <= ab.user2_id);
    }

    #[tokio::test]
    async fn test_conversation_by_id() {
        let store = ChatStore::in_memory().await.unwrap();
        let a = seed_user(&store, "13800138001").await;
        let b = seed_user(&store, "13800138002").await;

        let conv = store.get_or_create_conversation(a, b).await.unwrap();
        let fetched = store.conversation_by_id(conv.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, conv.id);
        assert!(fetched.is_participant(a));
        assert!(fetched.is_participant(b));

        assert!(store
            .conversation_by_id(Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_activity() {
        let store = ChatStore::in_memory().await.unwrap();
        let me = seed_user(&store, "13800138001").await;
        let first = seed_user(&store, "13800138002").await;
        let second = seed_user(&store, "13800138003").await;

        let conv_first = store.get_or_create_conversation(me, first).await.unwrap();
        let conv_second = store.get_or_create_conversation(me, second).await.unwrap();

        // Make the first conversation the most recently active.
        store
            .touch_last_message(conv_first.id, Utc::now() + chrono::Duration::seconds(10))
            .await
            .unwrap();

        let listed = store.conversations_for_user(me).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, conv_first.id);
        assert_eq!(listed[1].id, conv_second.id);

        // A third party sees neither.
        let outsider = seed_user(&store, "13800138004").await;
        assert!(store
            .conversations_for_user(outsider)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_unread_count_skips_own_and_read() {
        let store = ChatStore::in_memory().await.unwrap();
        let me = seed_user(&store, "13800138001").await;
        let peer = seed_user(&store, "13800138002").await;
        let conv = store.get_or_create_conversation(me, peer).await.unwrap();

        let mine = Message::new(conv.id, me, "我发的", MessageType::Text);
        let theirs_a = Message::new(conv.id, peer, "对方一", MessageType::Text);
        let theirs_b = Message::new(conv.id, peer, "对方二", MessageType::Text);
        store.insert_message(&mine).await.unwrap();
        store.insert_message(&theirs_a).await.unwrap();
        store.insert_message(&theirs_b).await.unwrap();

        assert_eq!(store.unread_count(conv.id, me).await.unwrap(), 2);
        // The peer has nothing unread: my message is the only incoming one
        // and it has not been read, so it counts for them instead.
        assert_eq!(store.unread_count(conv.id, peer).await.unwrap(), 1);

        store
            .mark_read(&[theirs_a.id, theirs_b.id], conv.id, me)
            .await
            .unwrap();
        assert_eq!(store.unread_count(conv.id, me).await.unwrap(), 0);
    }
}
