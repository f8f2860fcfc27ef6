//! Served-suggestion log, kept for effectiveness tracking.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Result;
use crate::types::SuggestionRecord;

use super::{parse_uuid, ChatStore};

#[derive(FromRow)]
struct SuggestionRow {
    id: String,
    conversation_id: String,
    suggestion: String,
    was_used: bool,
    response_received: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<SuggestionRow> for SuggestionRecord {
    type Error = crate::error::Error;

    fn try_from(row: SuggestionRow) -> Result<SuggestionRecord> {
        Ok(SuggestionRecord {
            id: parse_uuid(&row.id)?,
            conversation_id: parse_uuid(&row.conversation_id)?,
            suggestion: row.suggestion,
            was_used: row.was_used,
            response_received: row.response_received,
            created_at: row.created_at,
        })
    }
}

impl ChatStore {
    /// Record one served suggestion.
    pub async fn log_suggestion(&self, conversation_id: Uuid, text: &str) -> Result<()> {
        let record = SuggestionRecord::new(conversation_id, text);

        sqlx::query(
            r#"
            INSERT INTO ai_suggestions (
                id, conversation_id, suggestion, was_used, response_received, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.conversation_id.to_string())
        .bind(&record.suggestion)
        .bind(record.was_used)
        .bind(record.response_received)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Suggestions served for a conversation, oldest first.
    pub async fn suggestions_for(&self, conversation_id: Uuid) -> Result<Vec<SuggestionRecord>> {
        let rows: Vec<SuggestionRow> = sqlx::query_as(
            "SELECT * FROM ai_suggestions WHERE conversation_id = ? ORDER BY created_at ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SuggestionRecord::try_from).collect()
    }
}
