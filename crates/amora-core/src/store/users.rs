//! User account persistence.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{FlirtStyle, Gender, ProfileUpdate, User};

use super::{parse_uuid, ChatStore};

#[derive(FromRow)]
struct UserRow {
    id: String,
    phone: String,
    nickname: String,
    gender: Option<String>,
    age: Option<i64>,
    avatar_url: Option<String>,
    bio: Option<String>,
    flirt_style: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<User> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            phone: row.phone,
            nickname: row.nickname,
            gender: row.gender.as_deref().and_then(Gender::parse),
            age: row.age,
            avatar_url: row.avatar_url,
            bio: row.bio,
            flirt_style: FlirtStyle::parse(&row.flirt_style).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl ChatStore {
    /// Insert a new user. Fails if the phone number is already registered.
    pub async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, phone, nickname, gender, age, avatar_url, bio,
                flirt_style, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.phone)
        .bind(&user.nickname)
        .bind(user.gender.map(|g| g.as_str()))
        .bind(user.age)
        .bind(&user.avatar_url)
        .bind(&user.bio)
        .bind(user.flirt_style.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up a user by id.
    pub async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    /// Look up a user by phone number.
    pub async fn user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE phone = ?")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    /// Apply a partial profile update. Unset fields keep their stored value.
    pub async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                nickname = COALESCE(?, nickname),
                gender = COALESCE(?, gender),
                age = COALESCE(?, age),
                bio = COALESCE(?, bio),
                avatar_url = COALESCE(?, avatar_url),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.nickname)
        .bind(update.gender.map(|g| g.as_str()))
        .bind(update.age)
        .bind(&update.bio)
        .bind(&update.avatar_url)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("user"));
        }

        Ok(())
    }

    /// Change the preferred suggestion style.
    pub async fn set_flirt_style(&self, id: Uuid, style: FlirtStyle) -> Result<()> {
        let result = sqlx::query("UPDATE users SET flirt_style = ?, updated_at = ? WHERE id = ?")
            .bind(style.as_str())
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("user"));
        }

        Ok(())
    }
}
