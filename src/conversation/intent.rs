//! Intent analysis of a user message in the light of the session so far.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::context::ConversationContext;
use super::HistoryTurn;
use crate::cognition::classifier::log_fallback;
use crate::cognition::parse::{clamp_score, clean_list, from_reply};
use crate::cognition::Classifier;
use crate::error::ProviderError;
use crate::provider::CompletionRequest;

/// History turns shown to the model.
const HISTORY_TURNS: usize = 5;
const FALLBACK_CONFIDENCE: u8 = 60;
const DEFAULT_CONFIDENCE: u8 = 50;

static FOLLOW_UP_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(that|this|it|one|point|more|elaborate|explain|detail)\b").expect("valid regex")
});

static BACK_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(you mentioned|you said|earlier|before|above|previous)\b").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FollowUpQuestion,
    NewTopic,
    ClarificationRequest,
    PointReference,
    GeneralQuestion,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FollowUpQuestion => "follow_up_question",
            Self::NewTopic => "new_topic",
            Self::ClarificationRequest => "clarification_request",
            Self::PointReference => "point_reference",
            Self::GeneralQuestion => "general_question",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "follow_up_question" => Ok(Self::FollowUpQuestion),
            "new_topic" => Ok(Self::NewTopic),
            "clarification_request" => Ok(Self::ClarificationRequest),
            "point_reference" => Ok(Self::PointReference),
            "general_question" => Ok(Self::GeneralQuestion),
            other => Err(format!("unknown intent: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAnalysis {
    pub intent: Intent,
    pub confidence: u8,
    pub topics: Vec<String>,
    pub is_follow_up: bool,
    pub reference_terms: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    intent: Option<String>,
    confidence: Option<f64>,
    topics: Option<Vec<String>>,
    is_follow_up: Option<bool>,
    reference_terms: Option<Vec<String>>,
}

pub fn parse_analysis(value: &serde_json::Value) -> Result<MessageAnalysis, ProviderError> {
    let raw: RawAnalysis = from_reply(value)?;
    Ok(MessageAnalysis {
        intent: raw
            .intent
            .as_deref()
            .and_then(|i| i.parse().ok())
            .unwrap_or(Intent::GeneralQuestion),
        confidence: clamp_score(raw.confidence, DEFAULT_CONFIDENCE),
        topics: clean_list(raw.topics),
        is_follow_up: raw.is_follow_up.unwrap_or(false),
        reference_terms: clean_list(raw.reference_terms),
    })
}

/// Regex-only analysis: demonstratives, "more"/"explain" style words or explicit back
/// references mark a follow-up.
pub fn fallback_analysis(message: &str) -> MessageAnalysis {
    let is_follow_up = FOLLOW_UP_WORDS.is_match(message) || BACK_REFERENCE.is_match(message);
    MessageAnalysis {
        intent: if is_follow_up {
            Intent::FollowUpQuestion
        } else {
            Intent::GeneralQuestion
        },
        confidence: FALLBACK_CONFIDENCE,
        topics: Vec::new(),
        is_follow_up,
        reference_terms: Vec::new(),
    }
}

pub async fn analyze_intent(
    classifier: &Classifier,
    message: &str,
    context: &ConversationContext,
    history: &[HistoryTurn],
) -> MessageAnalysis {
    let request = CompletionRequest::new(intent_prompt(message, context, history), 0.2, 1000);
    match classifier
        .ask("analyze_intent", request)
        .await
        .and_then(|value| parse_analysis(&value))
    {
        Ok(analysis) => analysis,
        Err(e) => {
            log_fallback("analyze_intent", &e);
            fallback_analysis(message)
        }
    }
}

fn intent_prompt(message: &str, context: &ConversationContext, history: &[HistoryTurn]) -> String {
    let recent = history[history.len().saturating_sub(HISTORY_TURNS)..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n");
    let points = context
        .discussed_points
        .keys()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Analyze this message in the context of the conversation.

Recent conversation:
{recent}

Current message: "{message}"

Recent topics discussed: {topics}
Points discussed: {points}

Determine:
1. Intent (follow_up_question, new_topic, clarification_request, point_reference, general_question)
2. Whether it references a previous point or topic
3. Which terms suggest references to previous content
4. Main topics in this message
5. Confidence (0-100)

Reply with a JSON object:
{{
  "intent": "follow_up_question|new_topic|clarification_request|point_reference|general_question",
  "confidence": 0-100,
  "topics": ["..."],
  "isFollowUp": true,
  "referenceTerms": ["..."]
}}"#,
        topics = context.current_topics.join(", "),
    )
}
