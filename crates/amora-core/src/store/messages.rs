//! Message persistence.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Message, MessageStatus, MessageType};

use super::{parse_uuid, ChatStore};

#[derive(FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    sender_id: String,
    content: String,
    message_type: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = crate::error::Error;

    fn try_from(row: MessageRow) -> Result<Message> {
        Ok(Message {
            id: parse_uuid(&row.id)?,
            conversation_id: parse_uuid(&row.conversation_id)?,
            sender_id: parse_uuid(&row.sender_id)?,
            content: row.content,
            message_type: MessageType::parse(&row.message_type),
            status: MessageStatus::parse(&row.status),
            created_at: row.created_at,
        })
    }
}

impl ChatStore {
    /// Persist a message.
    pub async fn insert_message(&self, message: &Message) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, message_type, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(message.sender_id.to_string())
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(message.status.as_str())
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The newest `limit` messages of a conversation, returned in
    /// chronological order.
    pub async fn recent_messages(&self, conversation_id: Uuid, limit: i64) -> Result<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(conversation_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = rows
            .into_iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }

    /// The most recent message of a conversation, if any.
    pub async fn last_message(&self, conversation_id: Uuid) -> Result<Option<Message>> {
        let row: Option<MessageRow> = sqlx::query_as(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Message::try_from).transpose()
    }

    /// Record that a message reached its recipient. Only a `sent` message
    /// advances; `read` never regresses.
    pub async fn mark_delivered(&self, message_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE messages SET status = 'delivered' WHERE id = ? AND status = 'sent'")
            .bind(message_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Mark messages as read on behalf of `reader`. Rows sent by the reader
    /// themselves are left untouched, as are ids outside the conversation.
    /// Returns how many rows changed.
    pub async fn mark_read(
        &self,
        message_ids: &[Uuid],
        conversation_id: Uuid,
        reader: Uuid,
    ) -> Result<u64> {
        let mut updated = 0;
        for id in message_ids {
            let result = sqlx::query(
                r#"
                UPDATE messages SET status = 'read'
                WHERE id = ? AND conversation_id = ? AND sender_id != ?
                "#,
            )
            .bind(id.to_string())
            .bind(conversation_id.to_string())
            .bind(reader.to_string())
            .execute(&self.pool)
            .await?;
            updated += result.rows_affected();
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FlirtStyle, User};

    async fn seed_user(store: &ChatStore, phone: &str) -> Uuid {
        let now = Utc::now();
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
        user.id
    }

    async fn seed_conversation(store: &ChatStore) -> (Uuid, Uuid, Uuid) {
        let a = seed_user(store, "13800138001").await;
        let b = seed_user(store, "13800138002").await;
        let conv = store.get_or_create_conversation(a, b).await.unwrap();
        (conv.id, a, b)
    }

    fn message_at(conv: Uuid, sender: Uuid, content: &str, at: DateTime<Utc>) -> Message {
        let mut msg = Message::new(conv, sender, content, MessageType::Text);
        msg.created_at = at;
        msg
    }

    #[tokio::test]
    async fn test_insert_and_fetch_round_trip() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, a, _) = seed_conversation(&store).await;

        let msg = Message::new(conv, a, "你好呀", MessageType::Text);
        store.insert_message(&msg).await.unwrap();

        let fetched = store.last_message(conv).await.unwrap().unwrap();
        assert_eq!(fetched.id, msg.id);
        assert_eq!(fetched.content, "你好呀");
        assert_eq!(fetched.status, MessageStatus::Sent);
        assert_eq!(fetched.message_type, MessageType::Text);
    }

    #[tokio::test]
    async fn test_recent_messages_chronological_window() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, a, b) = seed_conversation(&store).await;

        let base = Utc::now();
        for i in 0..5 {
            let sender = if i % 2 == 0 { a } else { b };
            let msg = message_at(
                conv,
                sender,
                &format!("第{}条", i + 1),
                base + chrono::Duration::seconds(i),
            );
            store.insert_message(&msg).await.unwrap();
        }

        let window = store.recent_messages(conv, 3).await.unwrap();
        assert_eq!(window.len(), 3);
        // Newest three, oldest first.
        assert_eq!(window[0].content, "第3条");
        assert_eq!(window[1].content, "第4条");
        assert_eq!(window[2].content, "第5条");

        let all = store.recent_messages(conv, 50).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].content, "第1条");
    }

    #[tokio::test]
    async fn test_empty_conversation() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, _, _) = seed_conversation(&store).await;

        assert!(store.recent_messages(conv, 10).await.unwrap().is_empty());
        assert!(store.last_message(conv).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_delivered_only_advances_sent() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, a, b) = seed_conversation(&store).await;

        let msg = Message::new(conv, a, "在吗", MessageType::Text);
        store.insert_message(&msg).await.unwrap();

        store.mark_delivered(msg.id).await.unwrap();
        let fetched = store.last_message(conv).await.unwrap().unwrap();
        assert_eq!(fetched.status, MessageStatus::Delivered);

        // Once read, a late delivery confirmation must not regress it.
        store.mark_read(&[msg.id], conv, b).await.unwrap();
        store.mark_delivered(msg.id).await.unwrap();
        let fetched = store.last_message(conv).await.unwrap().unwrap();
        assert_eq!(fetched.status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn test_mark_read_excludes_own_messages() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, a, b) = seed_conversation(&store).await;

        let mine = Message::new(conv, a, "我的", MessageType::Text);
        let theirs = Message::new(conv, b, "对方的", MessageType::Text);
        store.insert_message(&mine).await.unwrap();
        store.insert_message(&theirs).await.unwrap();

        // Reader a marks both ids; only the counterpart's row changes.
        let updated = store
            .mark_read(&[mine.id, theirs.id], conv, a)
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let all = store.recent_messages(conv, 10).await.unwrap();
        let mine_after = all.iter().find(|m| m.id == mine.id).unwrap();
        let theirs_after = all.iter().find(|m| m.id == theirs.id).unwrap();
        assert_eq!(mine_after.status, MessageStatus::Sent);
        assert_eq!(theirs_after.status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn test_mark_read_scoped_to_conversation() {
        let store = ChatStore::in_memory().await.unwrap();
        let (conv, a, _b) = seed_conversation(&store).await;
        let c = seed_user(&store, "13800138003").await;
        let other = store.get_or_create_conversation(a, c).await.unwrap();

        let elsewhere = Message::new(other.id, c, "别的会话", MessageType::Text);
        store.insert_message(&elsewhere).await.unwrap();

        // Passing a foreign message id with this conversation changes nothing.
        let updated = store.mark_read(&[elsewhere.id], conv, a).await.unwrap();
        assert_eq!(updated, 0);

        let fetched = store.last_message(other.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, MessageStatus::Sent);
    }
}
