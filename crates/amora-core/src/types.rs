//! Domain types shared across the chat engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Self-reported gender, used for prompt pronouns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    /// Parse a stored value. Unknown values are treated as unset.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }

    /// Chinese pronoun used when referring to this person in prompts.
    pub fn pronoun(&self) -> &'static str {
        match self {
            Gender::Male => "他",
            Gender::Female => "她",
            Gender::Other => "TA",
        }
    }
}

/// Preferred reply style for generated suggestions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlirtStyle {
    Direct,
    #[default]
    Humorous,
    Romantic,
    Subtle,
}

impl FlirtStyle {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlirtStyle::Direct => "direct",
            FlirtStyle::Humorous => "humorous",
            FlirtStyle::Romantic => "romantic",
            FlirtStyle::Subtle => "subtle",
        }
    }

    /// Parse a stored value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "direct" => Some(FlirtStyle::Direct),
            "humorous" => Some(FlirtStyle::Humorous),
            "romantic" => Some(FlirtStyle::Romantic),
            "subtle" => Some(FlirtStyle::Subtle),
            _ => None,
        }
    }

    /// Chinese display name, shown in prompts and suggestion labels.
    pub fn display_name(&self) -> &'static str {
        match self {
            FlirtStyle::Direct => "直球型",
            FlirtStyle::Humorous => "幽默风趣",
            FlirtStyle::Romantic => "温柔浪漫",
            FlirtStyle::Subtle => "含蓄内敛",
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Phone number, unique per account.
    pub phone: String,
    pub nickname: String,
    pub gender: Option<Gender>,
    pub age: Option<i64>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub flirt_style: FlirtStyle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update. Unset fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Trimmed counterpart view embedded in conversation listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerProfile {
    pub id: Uuid,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<i64>,
}

impl From<&User> for PeerProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname.clone(),
            avatar_url: user.avatar_url.clone(),
            gender: user.gender,
            age: user.age,
        }
    }
}

/// A one-to-one conversation between two users.
///
/// The participant pair is stored in canonical order so each pair maps to
/// exactly one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation for a pair of users, normalizing participant order.
    pub fn new(a: Uuid, b: Uuid) -> Self {
        let (user1_id, user2_id) = Self::ordered_pair(a, b);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user1_id,
            user2_id,
            created_at: now,
            last_message_at: now,
        }
    }

    /// Canonical participant order: byte-wise smaller UUID first.
    pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The other participant, or `None` if `user_id` is not in this conversation.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }
}

/// Conversation listing entry with counterpart and activity metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_user: PeerProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    pub unread_count: i64,
    /// Memory stage as a numeric level, 0 when no context exists yet.
    pub stage: i64,
}

/// Message payload kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Voice,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Voice => "voice",
        }
    }

    /// Parse a stored value, defaulting unknown kinds to text.
    pub fn parse(value: &str) -> Self {
        match value {
            "image" => MessageType::Image,
            "voice" => MessageType::Voice,
            _ => MessageType::Text,
        }
    }
}

/// Delivery state of a message. Advances monotonically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
        }
    }

    /// Parse a stored value, defaulting unknown states to sent.
    pub fn parse(value: &str) -> Self {
        match value {
            "delivered" => MessageStatus::Delivered,
            "read" => MessageStatus::Read,
            _ => MessageStatus::Sent,
        }
    }

    /// Whether a transition to `next` moves forward. Status never regresses.
    pub fn can_advance_to(&self, next: MessageStatus) -> bool {
        next > *self
    }
}

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a freshly sent message.
    pub fn new(
        conversation_id: Uuid,
        sender_id: Uuid,
        content: impl Into<String>,
        message_type: MessageType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.into(),
            message_type,
            status: MessageStatus::Sent,
            created_at: Utc::now(),
        }
    }
}

/// One generated reply suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    /// Chinese style label, e.g. 幽默风趣.
    pub style: String,
    pub reason: String,
}

/// Stored record of a served suggestion, kept for effectiveness tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionRecord {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub suggestion: String,
    pub was_used: bool,
    pub response_received: bool,
    pub created_at: DateTime<Utc>,
}

impl SuggestionRecord {
    pub fn new(conversation_id: Uuid, suggestion: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            suggestion: suggestion.into(),
            was_used: false,
            response_received: false,
            created_at: Utc::now(),
        }
    }
}
