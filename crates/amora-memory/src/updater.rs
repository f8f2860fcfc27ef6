//! Memory mutation: trait merging, pattern counters, and the stage machine.
//!
//! Every transition gate reads the context as it stood BEFORE the current
//! message is folded in: `message_count` is the pre-increment tally and
//! `sentiment` is the stored value from the previous merge. Stages advance
//! at most one step per message, never regress, and [`Stage::Deep`] is
//! terminal.

use std::collections::HashSet;

use chrono::Utc;
use tracing::debug;

use crate::extractor::extract;
use crate::types::{MemoryContext, Patterns, Sentiment, Stage, TargetTraits};

/// Affection marker that can substitute for stored positive sentiment in
/// the warm-up gate.
static AFFECTION_KEYWORD: &str = "喜欢";

/// Emotional-investment markers required to reach [`Stage::Deep`].
static EMOTIONAL_KEYWORDS: &[&str] = &["想", "想念", "在乎", "在意", "喜欢", "爱"];

/// Merge freshly extracted traits into the stored ones.
///
/// Lists union in first-seen order; `tone` and `sentiment` are overwritten
/// only when the incoming side carries a value, so merging a default
/// `TargetTraits` is a no-op.
pub fn merge_traits(existing: &TargetTraits, incoming: &TargetTraits) -> TargetTraits {
    TargetTraits {
        interests: merge_lists(&existing.interests, &incoming.interests),
        topics: merge_lists(&existing.topics, &incoming.topics),
        tone: incoming.tone.or(existing.tone),
        sentiment: incoming.sentiment.or(existing.sentiment),
    }
}

fn merge_lists(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    for item in existing.iter().chain(incoming) {
        if seen.insert(item.as_str()) {
            merged.push(item.clone());
        }
    }
    merged
}

/// Fold one message into the pattern counters. A message counts as a
/// question when it contains `?` or 吗, as a statement otherwise.
pub fn observe_patterns(patterns: Patterns, content: &str) -> Patterns {
    let is_question = content.contains('?') || content.contains('吗');
    Patterns {
        message_count: patterns.message_count + 1,
        question: patterns.question + u64::from(is_question),
        statement: patterns.statement + u64::from(!is_question),
    }
}

/// Decide the stage after this message, given the PRE-update counters and
/// stored traits. The very first message always breaks the ice; later
/// gates combine a message-count floor with a content or sentiment signal.
pub fn next_stage(
    current: Stage,
    patterns: &Patterns,
    traits: &TargetTraits,
    content: &str,
) -> Stage {
    let content = content.to_lowercase();
    match current {
        Stage::ColdStart => Stage::BreakingIce,
        Stage::BreakingIce if patterns.message_count >= 5 => Stage::WarmUp,
        Stage::WarmUp
            if patterns.message_count >= 10
                && (traits.sentiment == Some(Sentiment::Positive)
                    || content.contains(AFFECTION_KEYWORD)) =>
        {
            Stage::Flirty
        }
        Stage::Flirty
            if patterns.message_count >= 20
                && EMOTIONAL_KEYWORDS.iter().any(|k| content.contains(k)) =>
        {
            Stage::Deep
        }
        _ => current,
    }
}

/// Apply one message to a context and return the updated copy.
///
/// Order matters: the stage decision reads the old counters and traits,
/// then the merge and counter update produce the new ones.
pub fn advance(ctx: &MemoryContext, content: &str) -> MemoryContext {
    let extracted = extract(content);
    let stage = next_stage(ctx.stage, &ctx.patterns, &ctx.traits, content);
    let traits = merge_traits(&ctx.traits, &extracted);
    let patterns = observe_patterns(ctx.patterns, content);

    if stage != ctx.stage {
        debug!(
            conversation_id = %ctx.conversation_id,
            user_id = %ctx.user_id,
            from = %ctx.stage,
            to = %stage,
            message_count = patterns.message_count,
            "conversation stage advanced"
        );
    }

    MemoryContext {
        stage,
        traits,
        patterns,
        updated_at: Utc::now(),
        ..ctx.clone()
    }
}
