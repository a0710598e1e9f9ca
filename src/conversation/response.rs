//! Grounded reply generation for one conversational turn.

use serde::Deserialize;
use std::fmt::Write as _;

use super::context::ConversationContext;
use super::intent::MessageAnalysis;
use crate::cognition::classifier::log_fallback;
use crate::cognition::parse::{clean_list, from_reply};
use crate::cognition::Classifier;
use crate::error::ProviderError;
use crate::provider::CompletionRequest;

const MISSING_REPLY: &str = "I understand you're asking about our previous discussion. \
     Let me provide more details based on what we covered earlier.";
const GENERIC_CLARIFICATION: &str = "I understand you're referencing something from our conversation. \
     Let me provide more context based on what we've discussed.";
const DEFAULT_FOLLOW_UPS: [&str; 3] = [
    "Tell me more about this",
    "How does this apply to my situation?",
    "What should I do next?",
];
const FALLBACK_FOLLOW_UPS: [&str; 2] = ["Can you be more specific?", "What aspect interests you most?"];
/// Topics and points shown for an unanchored follow-up.
const FOLLOW_UP_CONTEXT: usize = 3;

/// Context assembled for the reply prompt.
#[derive(Debug, Clone, Default)]
pub struct ReplyGrounding {
    /// Session context: the referenced point, or recent topics and points.
    pub session: Option<String>,
    /// Snippets of the user's own stored material.
    pub retrieved: Vec<String>,
}

impl ReplyGrounding {
    pub fn is_used(&self) -> bool {
        self.session.is_some() || !self.retrieved.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub follow_ups: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReply {
    response: Option<String>,
    suggested_follow_ups: Option<Vec<String>>,
}

pub fn parse_reply(value: &serde_json::Value) -> Result<Reply, ProviderError> {
    let raw: RawReply = from_reply(value)?;
    let follow_ups = clean_list(raw.suggested_follow_ups);
    Ok(Reply {
        text: raw
            .response
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| MISSING_REPLY.to_string()),
        follow_ups: if follow_ups.is_empty() {
            DEFAULT_FOLLOW_UPS.iter().map(|s| s.to_string()).collect()
        } else {
            follow_ups
        },
    })
}

/// Describe the session context relevant to this message.
///
/// A referenced point is injected verbatim with its details. Without one, a follow-up
/// gets the most recent topics and points. Anything else gets nothing.
pub fn session_grounding(
    context: &ConversationContext,
    analysis: &MessageAnalysis,
    referenced: Option<&str>,
) -> Option<String> {
    if let Some(point) = referenced.and_then(|key| context.discussed_points.get(key)) {
        return Some(format!(
            "Referenced point: \"{}\"\nPrevious details: {}\nThis was discussed earlier in the conversation.",
            point.content,
            point.details.join(", ")
        ));
    }

    if analysis.is_follow_up {
        let topics = &context.current_topics[context.current_topics.len().saturating_sub(FOLLOW_UP_CONTEXT)..];
        let points: Vec<&str> = context
            .recent_points(FOLLOW_UP_CONTEXT)
            .into_iter()
            .map(|(_, p)| p.content.as_str())
            .collect();
        return Some(format!(
            "Recent topics: {}\nRecent points discussed: {}\nThe user seems to be following up on the previous discussion.",
            topics.join(", "),
            points.join(", ")
        ));
    }

    None
}

pub async fn generate_reply(
    classifier: &Classifier,
    message: &str,
    analysis: &MessageAnalysis,
    grounding: &ReplyGrounding,
) -> Result<Reply, ProviderError> {
    let request = CompletionRequest::new(reply_prompt(message, analysis, grounding), 0.4, 1500);
    classifier
        .ask("generate_reply", request)
        .await
        .and_then(|value| parse_reply(&value))
}

/// Reply without a model: restate the referenced point, or ask for clarification.
pub fn fallback_reply(context: &ConversationContext, referenced: Option<&str>) -> Reply {
    let point = referenced.and_then(|key| context.discussed_points.get(key));
    let text = match point {
        Some(point) if point.details.is_empty() => format!(
            "Let me elaborate on \"{}\", which came up earlier in our conversation.",
            point.content
        ),
        Some(point) => format!(
            "Let me elaborate on \"{}\": {}",
            point.content,
            point.details.join(" ")
        ),
        None => GENERIC_CLARIFICATION.to_string(),
    };
    Reply {
        text,
        follow_ups: FALLBACK_FOLLOW_UPS.iter().map(|s| s.to_string()).collect(),
    }
}

/// Model reply if available, otherwise [`fallback_reply`].
pub async fn reply_or_fallback(
    classifier: &Classifier,
    message: &str,
    context: &ConversationContext,
    analysis: &MessageAnalysis,
    referenced: Option<&str>,
    grounding: &ReplyGrounding,
) -> Reply {
    match generate_reply(classifier, message, analysis, grounding).await {
        Ok(reply) => reply,
        Err(e) => {
            log_fallback("generate_reply", &e);
            fallback_reply(context, referenced)
        }
    }
}

fn reply_prompt(message: &str, analysis: &MessageAnalysis, grounding: &ReplyGrounding) -> String {
    let mut prompt = format!(
        "You are an assistant with conversational memory. Respond to the user's message \
         with full awareness of the context below.\n\nUser message: \"{message}\"\n"
    );

    if let Some(session) = &grounding.session {
        let _ = write!(prompt, "\n{session}\n");
    }
    if !grounding.retrieved.is_empty() {
        let _ = writeln!(prompt, "\nRelated material from the user's own notes:");
        for snippet in &grounding.retrieved {
            let _ = writeln!(prompt, "- {snippet}");
        }
    }

    let _ = write!(
        prompt,
        r#"
Intent detected: {intent}
Is follow-up: {follow_up}
Confidence: {confidence}%

Guidelines:
1. If a specific point is referenced, elaborate on that exact point in detail
2. If this is a follow-up, acknowledge the connection to the earlier discussion
3. Anticipate likely follow-up questions
4. Keep the conversation flowing naturally
5. Be specific and actionable

Reply with a JSON object:
{{
  "response": "your reply",
  "suggestedFollowUps": ["question", "question", "question"]
}}"#,
        intent = analysis.intent,
        follow_up = analysis.is_follow_up,
        confidence = analysis.confidence,
    );
    prompt
}
