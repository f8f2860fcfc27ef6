//! Core data types for the conversational-memory model.
//!
//! A [`MemoryContext`] is one user's private view of one conversation:
//! their relationship [`Stage`], the traits extracted from their messages,
//! and the pattern counters that gate stage transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Relationship progression stage, ordered and monotonic per
/// (conversation, user). Advances at most one step per message, never
/// regresses, and `Deep` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// No exchange yet (冷启动)
    ColdStart,
    /// First contact made (破冰)
    BreakingIce,
    /// Regular back-and-forth (热身)
    WarmUp,
    /// Mutual interest showing (暧昧)
    Flirty,
    /// Emotional intimacy (深入)
    Deep,
}

impl Stage {
    /// Integer wire/storage representation (0..=4).
    pub fn as_i64(self) -> i64 {
        match self {
            Self::ColdStart => 0,
            Self::BreakingIce => 1,
            Self::WarmUp => 2,
            Self::Flirty => 3,
            Self::Deep => 4,
        }
    }

    /// Parse from the stored integer; anything out of range falls back to
    /// `ColdStart` rather than failing.
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => Self::BreakingIce,
            2 => Self::WarmUp,
            3 => Self::Flirty,
            4 => Self::Deep,
            _ => Self::ColdStart,
        }
    }

    /// Chinese display name used in prompts and clients.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::ColdStart => "冷启动",
            Self::BreakingIce => "破冰",
            Self::WarmUp => "热身",
            Self::Flirty => "暧昧",
            Self::Deep => "深入",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColdStart => write!(f, "cold_start"),
            Self::BreakingIce => write!(f, "breaking_ice"),
            Self::WarmUp => write!(f, "warm_up"),
            Self::Flirty => write!(f, "flirty"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

/// Message tone. Unlike [`Sentiment`], a question marker wins outright and
/// positive/negative are decided by comparing keyword hit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Contains a question keyword
    Questioning,
    /// More positive than negative keyword hits
    Positive,
    /// More negative than positive keyword hits
    Negative,
    /// Tie or no hits
    Neutral,
}

/// Message sentiment. Any positive keyword hit wins, then any negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// At least one positive keyword hit
    Positive,
    /// No positive hit, at least one negative
    Negative,
    /// No hits either way
    Neutral,
}

/// Traits inferred from a user's messages.
///
/// `interests` and `topics` accumulate (union, first-seen order); `tone`
/// and `sentiment` track the most recent message. A fresh value serializes
/// to `{}` so the stored JSON starts empty like the row default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetTraits {
    /// Accumulated interest categories (e.g. "music", "travel")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    /// Accumulated topic categories (e.g. "work", "family")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    /// Tone of the latest message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    /// Sentiment of the latest message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

/// Running tallies that gate stage transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patterns {
    /// Messages observed from this user in this conversation
    #[serde(default)]
    pub message_count: u64,
    /// Messages classified as questions
    #[serde(default)]
    pub question: u64,
    /// Messages classified as statements
    #[serde(default)]
    pub statement: u64,
}

/// One user's private memory of one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryContext {
    /// Row id
    pub id: Uuid,
    /// Conversation this memory belongs to
    pub conversation_id: Uuid,
    /// The participant whose view this is
    pub user_id: Uuid,
    /// Current relationship stage (monotonic)
    pub stage: Stage,
    /// Extracted traits
    pub traits: TargetTraits,
    /// Pattern counters
    pub patterns: Patterns,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl MemoryContext {
    /// A brand-new context: `ColdStart`, no traits, zero counters.
    pub fn fresh(conversation_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            user_id,
            stage: Stage::ColdStart,
            traits: TargetTraits::default(),
            patterns: Patterns::default(),
            updated_at: Utc::now(),
        }
    }
}
