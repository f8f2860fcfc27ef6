//! Keyword-driven trait extraction.
//!
//! All matching is substring containment on the lowercased message, and a
//! keyword contributes at most once however often it repeats. The tables
//! are fixed Chinese vocabularies mapped to English category labels; tone
//! and sentiment deliberately use different keyword sets, so the same
//! message can read neutral on one axis and positive on the other.

use crate::types::{Sentiment, TargetTraits, Tone};

/// Interest keyword -> category label.
static INTEREST_KEYWORDS: &[(&str, &str)] = &[
    ("音乐", "music"),
    ("运动", "sports"),
    ("电影", "movies"),
    ("旅行", "travel"),
    ("美食", "food"),
    ("游戏", "gaming"),
    ("读书", "reading"),
    ("摄影", "photography"),
    ("健身", "fitness"),
    ("舞蹈", "dancing"),
    ("画画", "drawing"),
    ("唱歌", "singing"),
];

/// Topic keyword -> category label.
static TOPIC_KEYWORDS: &[(&str, &str)] = &[
    ("工作", "work"),
    ("学校", "school"),
    ("家庭", "family"),
    ("朋友", "friends"),
    ("学习", "study"),
    ("梦想", "dreams"),
];

static TONE_POSITIVE: &[&str] = &["哈哈", "开心", "喜欢", "爱", "棒", "厉害"];
static TONE_NEGATIVE: &[&str] = &["难过", "伤心", "讨厌", "烦", "生气"];
static TONE_QUESTION: &[&str] = &["吗", "呢", "什么", "如何", "怎么"];

static SENTIMENT_POSITIVE: &[&str] = &[
    "哈哈", "开心", "喜欢", "爱", "棒", "厉害", "好", "漂亮", "帅",
];
static SENTIMENT_NEGATIVE: &[&str] = &["难过", "伤心", "讨厌", "烦", "生气", "不好", "糟糕"];

/// Extract traits from a single message. Never fails: a message that
/// matches nothing yields empty lists with neutral tone and sentiment.
pub fn extract(content: &str) -> TargetTraits {
    let content = content.to_lowercase();

    let interests = match_categories(&content, INTEREST_KEYWORDS);
    let topics = match_categories(&content, TOPIC_KEYWORDS);

    TargetTraits {
        interests,
        topics,
        tone: Some(detect_tone(&content)),
        sentiment: Some(detect_sentiment(&content)),
    }
}

/// Collect the category labels whose keyword appears in `content`,
/// preserving table order.
fn match_categories(content: &str, table: &[(&str, &str)]) -> Vec<String> {
    table
        .iter()
        .filter(|(keyword, _)| content.contains(keyword))
        .map(|(_, category)| (*category).to_string())
        .collect()
}

/// A question keyword wins outright; otherwise compare positive and
/// negative hit counts, ties landing neutral.
fn detect_tone(content: &str) -> Tone {
    if TONE_QUESTION.iter().any(|k| content.contains(k)) {
        return Tone::Questioning;
    }
    let positive = count_hits(content, TONE_POSITIVE);
    let negative = count_hits(content, TONE_NEGATIVE);
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Tone::Positive,
        std::cmp::Ordering::Less => Tone::Negative,
        std::cmp::Ordering::Equal => Tone::Neutral,
    }
}

/// Any positive hit wins, then any negative.
fn detect_sentiment(content: &str) -> Sentiment {
    if SENTIMENT_POSITIVE.iter().any(|k| content.contains(k)) {
        Sentiment::Positive
    } else if SENTIMENT_NEGATIVE.iter().any(|k| content.contains(k)) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Distinct keywords present, each counted once.
fn count_hits(content: &str, keywords: &[&str]) -> u64 {
    keywords.iter().filter(|k| content.contains(*k)).count() as u64
}
