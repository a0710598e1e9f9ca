//! Per-session conversation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Initial interest of a newly extracted point.
pub const BASE_INTEREST: u8 = 5;
/// Initial interest of a point the user referenced in the same turn it was extracted.
pub const REFERENCED_INTEREST: u8 = 8;
pub const MAX_INTEREST: u8 = 10;
/// Details kept per point.
pub const MAX_POINT_DETAILS: usize = 5;
/// Characters of the assistant reply stored as a detail of a referenced point.
pub const DETAIL_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_discussed: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_topics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mentioned_point: Option<String>,
}

/// A claim from an assistant reply, tracked for later reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussedPoint {
    /// The point as first extracted, before canonicalization.
    pub content: String,
    pub details: Vec<String>,
    /// Always within `[1, 10]`.
    pub user_interest: u8,
    pub first_discussed: DateTime<Utc>,
    pub last_discussed: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualMemory {
    pub referenced_items: Vec<String>,
    pub user_preferences: Vec<String>,
    /// One intent label per turn.
    pub conversation_flow: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub session_id: String,
    pub user_id: String,
    /// Oldest first, never longer than the configured window.
    pub messages: Vec<Message>,
    /// Unique, oldest first, never longer than the configured cap.
    pub current_topics: Vec<String>,
    /// Keyed by canonical point text.
    pub discussed_points: HashMap<String, DiscussedPoint>,
    pub contextual_memory: ContextualMemory,
}

impl ConversationContext {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            messages: Vec::new(),
            current_topics: Vec::new(),
            discussed_points: HashMap::new(),
            contextual_memory: ContextualMemory::default(),
        }
    }

    /// Append messages and drop the oldest beyond `max_messages`.
    pub fn push_messages(&mut self, messages: impl IntoIterator<Item = Message>, max_messages: usize) {
        self.messages.extend(messages);
        let overflow = self.messages.len().saturating_sub(max_messages);
        self.messages.drain(..overflow);
    }

    /// Union existing and detected topics, keeping first-seen positions, then keep the
    /// `max_topics` most recent.
    pub fn merge_topics(&mut self, topics: &[String], max_topics: usize) {
        for topic in topics {
            let topic = topic.trim();
            if !topic.is_empty() && !self.current_topics.iter().any(|t| t == topic) {
                self.current_topics.push(topic.to_string());
            }
        }
        let overflow = self.current_topics.len().saturating_sub(max_topics);
        self.current_topics.drain(..overflow);
    }

    /// Record a point extracted from the latest reply.
    ///
    /// A new point starts at [`BASE_INTEREST`], or [`REFERENCED_INTEREST`] when it is the
    /// point the user referenced this turn. A known point only has its recency refreshed.
    pub fn record_point(&mut self, key: String, content: &str, referenced: Option<&str>, now: DateTime<Utc>) {
        match self.discussed_points.get_mut(&key) {
            Some(existing) => existing.last_discussed = now,
            None => {
                let user_interest = if referenced == Some(key.as_str()) {
                    REFERENCED_INTEREST
                } else {
                    BASE_INTEREST
                };
                self.discussed_points.insert(
                    key,
                    DiscussedPoint {
                        content: content.to_string(),
                        details: Vec::new(),
                        user_interest,
                        first_discussed: now,
                        last_discussed: now,
                    },
                );
            }
        }
    }

    /// Register that the user referenced `key`: raise its interest by one (capped),
    /// refresh its recency and keep an excerpt of the reply as a detail.
    pub fn reinforce_point(&mut self, key: &str, reply: &str, now: DateTime<Utc>) {
        let Some(point) = self.discussed_points.get_mut(key) else {
            return;
        };
        point.user_interest = (point.user_interest + 1).min(MAX_INTEREST);
        point.last_discussed = now;

        let excerpt = crate::store::truncate_chars(reply.trim(), DETAIL_EXCERPT_CHARS);
        if !excerpt.is_empty() {
            point.details.push(excerpt);
            let overflow = point.details.len().saturating_sub(MAX_POINT_DETAILS);
            point.details.drain(..overflow);
        }

        if !self.contextual_memory.referenced_items.iter().any(|r| r == key) {
            self.contextual_memory.referenced_items.push(key.to_string());
        }
    }

    /// Append this turn's intent label to the flow, bounded like the message window.
    pub fn record_flow(&mut self, intent: &str, max_entries: usize) {
        let flow = &mut self.contextual_memory.conversation_flow;
        flow.push(intent.to_string());
        let overflow = flow.len().saturating_sub(max_entries);
        flow.drain(..overflow);
    }

    /// Points ordered by most recent discussion, at most `limit`.
    ///
    /// Ties fall back to the point discussed first, then to the key.
    pub fn recent_points(&self, limit: usize) -> Vec<(&String, &DiscussedPoint)> {
        let mut points: Vec<_> = self.discussed_points.iter().collect();
        points.sort_by(|a, b| {
            b.1.last_discussed
                .cmp(&a.1.last_discussed)
                .then_with(|| b.1.first_discussed.cmp(&a.1.first_discussed))
                .then_with(|| a.0.cmp(b.0))
        });
        points.truncate(limit);
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message(role: Role, content: &str) -> Message {
        Message {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            points_discussed: None,
            key_topics: None,
            last_mentioned_point: None,
        }
    }

    #[test]
    fn message_window_keeps_newest() {
        let mut ctx = ConversationContext::new("s", "u");
        for i in 0..15 {
            ctx.push_messages(
                [
                    message(Role::User, &format!("q{i}")),
                    message(Role::Assistant, &format!("a{i}")),
                ],
                20,
            );
        }
        assert_eq!(ctx.messages.len(), 20);
        assert_eq!(ctx.messages[0].content, "q5");
        assert_eq!(ctx.messages[19].content, "a14");
    }

    #[test]
    fn topics_are_unique_and_capped() {
        let mut ctx = ConversationContext::new("s", "u");
        let topics: Vec<String> = (0..12).map(|i| format!("t{i}")).collect();
        ctx.merge_topics(&topics, 10);
        ctx.merge_topics(&["t5".to_string(), " ".to_string()], 10);
        assert_eq!(ctx.current_topics.len(), 10);
        assert_eq!(ctx.current_topics[0], "t2");
        assert_eq!(ctx.current_topics.iter().filter(|t| *t == "t5").count(), 1);
    }

    #[test]
    fn interest_is_capped_at_ten() {
        let mut ctx = ConversationContext::new("s", "u");
        let now = Utc::now();
        ctx.record_point("diet".into(), "Diet", None, now);
        assert_eq!(ctx.discussed_points["diet"].user_interest, BASE_INTEREST);
        for _ in 0..10 {
            ctx.reinforce_point("diet", "more about diet", now);
        }
        let point = &ctx.discussed_points["diet"];
        assert_eq!(point.user_interest, MAX_INTEREST);
        assert_eq!(point.details.len(), MAX_POINT_DETAILS);
        assert_eq!(ctx.contextual_memory.referenced_items, vec!["diet"]);
    }

    #[test]
    fn new_referenced_point_starts_high() {
        let mut ctx = ConversationContext::new("s", "u");
        ctx.record_point("sleep".into(), "Sleep", Some("sleep"), Utc::now());
        assert_eq!(ctx.discussed_points["sleep"].user_interest, REFERENCED_INTEREST);
    }

    #[test]
    fn known_point_keeps_original_content() {
        let mut ctx = ConversationContext::new("s", "u");
        let earlier = Utc::now() - Duration::minutes(5);
        ctx.record_point("sleep more".into(), "Sleep more.", None, earlier);
        ctx.record_point("sleep more".into(), "sleep  MORE", None, Utc::now());
        let point = &ctx.discussed_points["sleep more"];
        assert_eq!(point.content, "Sleep more.");
        assert!(point.last_discussed > earlier);
    }

    #[test]
    fn recent_points_orders_by_last_discussed() {
        let mut ctx = ConversationContext::new("s", "u");
        let now = Utc::now();
        ctx.record_point("old".into(), "old", None, now - Duration::minutes(10));
        ctx.record_point("new".into(), "new", None, now);
        let keys: Vec<&String> = ctx.recent_points(10).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["new", "old"]);
    }
}
