//! Session summaries.

use serde::Serialize;

use super::context::{ConversationContext, Role};

/// Points at or above this interest are reported as user interests.
pub const INTEREST_THRESHOLD: u8 = 7;
const MAX_KEY_POINTS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Most frequent first; ties keep first-seen order.
    pub topics_discussed: Vec<String>,
    /// Up to ten points, highest interest first.
    pub key_points: Vec<String>,
    pub user_interests: Vec<String>,
    pub conversation_flow: Vec<String>,
}

pub fn summarize(context: &ConversationContext) -> ConversationSummary {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let assistant_topics = context
        .messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .filter_map(|m| m.key_topics.as_ref())
        .flatten();
    for topic in assistant_topics.chain(context.current_topics.iter()) {
        match counts.iter_mut().find(|(t, _)| *t == topic.as_str()) {
            Some((_, count)) => *count += 1,
            None => counts.push((topic.as_str(), 1)),
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let mut by_interest: Vec<_> = context.discussed_points.iter().collect();
    by_interest.sort_by(|a, b| {
        b.1.user_interest
            .cmp(&a.1.user_interest)
            .then_with(|| a.1.first_discussed.cmp(&b.1.first_discussed))
            .then_with(|| a.0.cmp(b.0))
    });

    let user_interests = by_interest
        .iter()
        .filter(|(_, p)| p.user_interest >= INTEREST_THRESHOLD)
        .map(|(key, _)| (*key).clone())
        .collect();
    let key_points = by_interest
        .iter()
        .take(MAX_KEY_POINTS)
        .map(|(key, _)| (*key).clone())
        .collect();

    ConversationSummary {
        topics_discussed: counts.into_iter().map(|(t, _)| t.to_string()).collect(),
        key_points,
        user_interests,
        conversation_flow: context.contextual_memory.conversation_flow.clone(),
    }
}
