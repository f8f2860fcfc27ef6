//! Reply suggestion assembly.
//!
//! [`SuggestionAssembler`] turns a conversation snapshot into exactly three
//! reply suggestions: the user's preferred style first, then one humorous
//! and one romantic option. A configured [`ChatProvider`] is asked first;
//! any failure there (transport, bad JSON, wrong count) falls back to
//! canned suggestions so the endpoint never errors out.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use amora_llm::{ChatProvider, ChatRequest, Message};
use amora_memory::{Stage, TargetTraits};

use crate::types::{FlirtStyle, Gender, Suggestion};

/// Most recent history turns included in the prompt.
const HISTORY_WINDOW: usize = 5;

/// Generation parameters mirroring the production backend.
const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.8;

/// One prior message, attributed from the requesting user's point of view.
#[derive(Debug, Clone)]
pub struct HistoryTurn {
    /// Whether the requesting user sent this message.
    pub is_self: bool,
    /// Message text.
    pub content: String,
}

impl HistoryTurn {
    pub fn new(is_self: bool, content: impl Into<String>) -> Self {
        Self {
            is_self,
            content: content.into(),
        }
    }
}

/// Everything the assembler knows about a conversation when prompting.
#[derive(Debug, Clone)]
pub struct SuggestionContext {
    /// Requesting user's relationship stage.
    pub stage: Stage,
    /// Requesting user's preferred reply style.
    pub style: FlirtStyle,
    /// Counterpart's display name.
    pub peer_nickname: String,
    /// Counterpart's gender, if set; picks the prompt pronoun.
    pub peer_gender: Option<Gender>,
    /// Recent messages in chronological order.
    pub history: Vec<HistoryTurn>,
    /// Traits extracted from the requesting user's messages.
    pub traits: TargetTraits,
}

/// Shape the model is instructed to reply with.
#[derive(Debug, Deserialize)]
struct ParsedSuggestions {
    suggestions: Vec<Suggestion>,
}

/// Assembles reply suggestions from a provider, with a deterministic
/// fallback when no provider is configured or the provider misbehaves.
pub struct SuggestionAssembler {
    provider: Option<Arc<dyn ChatProvider>>,
}

impl SuggestionAssembler {
    pub fn new(provider: Option<Arc<dyn ChatProvider>>) -> Self {
        Self { provider }
    }

    /// Assembler that always serves the canned fallback.
    pub fn without_provider() -> Self {
        Self { provider: None }
    }

    /// Generate exactly three suggestions. Never fails: provider problems
    /// degrade to the fallback set.
    pub async fn generate(&self, ctx: &SuggestionContext) -> Vec<Suggestion> {
        let Some(provider) = &self.provider else {
            debug!("no chat provider configured, serving fallback suggestions");
            return fallback_suggestions(ctx.style);
        };

        let request = ChatRequest::new()
            .with_message(Message::user(build_prompt(ctx)))
            .with_max_tokens(MAX_TOKENS)
            .with_temperature(TEMPERATURE);

        let content = match provider.chat(request).await {
            Ok(response) => response.content,
            Err(err) => {
                warn!(provider = provider.name(), error = %err, "suggestion request failed");
                return fallback_suggestions(ctx.style);
            }
        };

        match parse_suggestions(&content) {
            Some(suggestions) => suggestions,
            None => {
                warn!(
                    provider = provider.name(),
                    "provider returned unusable suggestions, serving fallback"
                );
                fallback_suggestions(ctx.style)
            }
        }
    }
}

/// Build the Chinese generation prompt.
fn build_prompt(ctx: &SuggestionContext) -> String {
    let stage = ctx.stage.display_name();
    let style = ctx.style.display_name();
    let pronoun = ctx.peer_gender.map_or("对方", |g| g.pronoun());

    let mut history = String::new();
    let start = ctx.history.len().saturating_sub(HISTORY_WINDOW);
    for turn in &ctx.history[start..] {
        history.push_str(if turn.is_self { "你: " } else { "对方: " });
        history.push_str(&turn.content);
        history.push('\n');
    }

    let mut traits = String::new();
    if !ctx.traits.interests.is_empty() {
        traits.push_str("兴趣爱好: ");
        traits.push_str(&ctx.traits.interests.join(", "));
        traits.push('\n');
    }
    if !ctx.traits.topics.is_empty() {
        traits.push_str("话题: ");
        traits.push_str(&ctx.traits.topics.join(", "));
        traits.push('\n');
    }

    format!(
        r#"你是一个专业的中文聊天和约会助手。根据以下信息生成3条回复建议：

【当前语境】
- 对话阶段: {stage}
- 你的风格: {style}
- 对方: {nickname} ({pronoun})
- 对话历史:
{history}
- 对方特点:
{traits}
【要求】
1. 必须生成恰好3条建议，每条风格不同
2. 第1条：符合你偏好的风格 ({style})
3. 第2条：幽默风趣 - 适合轻松氛围
4. 第3条：温柔浪漫 - 适合推进关系
5. 回复自然、不油腻
6. 符合当前对话阶段
7. 引导继续对话
8. 保持尊重和礼貌

请生成JSON格式回复:
{{
  "suggestions": [
    {{"text": "...", "style": "{style}", "reason": "..."}},
    {{"text": "...", "style": "幽默风趣", "reason": "..."}},
    {{"text": "...", "style": "温柔浪漫", "reason": "..."}}
  ]
}}

只输出JSON，不要有任何其他文字。"#,
        stage = stage,
        style = style,
        nickname = ctx.peer_nickname,
        pronoun = pronoun,
        history = history,
        traits = traits,
    )
}

/// Parse a model reply into exactly three suggestions.
///
/// Models wrap JSON in prose or code fences often enough that we first cut
/// the text down to the outermost braces. Anything that does not decode to
/// exactly three entries is rejected.
fn parse_suggestions(raw: &str) -> Option<Vec<Suggestion>> {
    let parsed: ParsedSuggestions = serde_json::from_str(extract_json(raw)).ok()?;
    if parsed.suggestions.len() != 3 {
        return None;
    }
    Some(parsed.suggestions)
}

/// Slice `raw` down to its outermost `{...}` span, if it has one.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Canned suggestions in the fixed style order: the user's own style,
/// then humorous, then romantic.
fn fallback_suggestions(style: FlirtStyle) -> Vec<Suggestion> {
    let (text, reason) = match style {
        FlirtStyle::Direct => (
            "我想直接告诉你，和你聊天真的很开心",
            "直接表达情感，展现真诚态度",
        ),
        FlirtStyle::Humorous => (
            "哈哈，你这人说话真有意思，和你聊天特别放松",
            "用轻松愉快的语气，增加互动趣味",
        ),
        FlirtStyle::Romantic => (
            "感觉和你聊天就像认识很久的朋友一样，很舒服",
            "用温柔浪漫的语气，拉近心理距离",
        ),
        FlirtStyle::Subtle => (
            "每次和你聊天都觉得时间过得很快，可能是因为太投机了吧",
            "含蓄地表达对聊天的珍视",
        ),
    };

    vec![
        Suggestion {
            text: text.to_string(),
            style: style.display_name().to_string(),
            reason: reason.to_string(),
        },
        Suggestion {
            text: "看来我们很有共同语言嘛，以后要多聊聊~".to_string(),
            style: "幽默风趣".to_string(),
            reason: "用轻松的语气发现共同点，鼓励继续交流".to_string(),
        },
        Suggestion {
            text: "感觉和你聊天的时候，心情都会变好".to_string(),
            style: "温柔浪漫".to_string(),
            reason: "表达对方带来的正面影响，增进情感连接".to_string(),
        },
    ]
}
