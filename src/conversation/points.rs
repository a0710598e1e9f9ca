//! Point extraction from assistant replies and point-reference detection in user
//! messages.
//!
//! Points are keyed by their canonical form (see [`canonicalize`]), so the same claim
//! restated with different casing, spacing or trailing punctuation maps to one entry.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::context::DiscussedPoint;

static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s+([^.!?\n]+[.!?]?)").expect("valid regex"));

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-•*]\s+([^.!?\n]+[.!?]?)").expect("valid regex"));

static TRANSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:First|Second|Third|Additionally|Also|Furthermore|Moreover),?\s+([^.!?]+[.!?])")
        .expect("valid regex")
});

static DEICTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:that|this|first|second|third|last|previous|earlier)\s+(?:point|one|item|topic)\b")
        .expect("valid regex")
});

/// Words this short ("a", "to", "is") overlap with nearly anything and are ignored.
const MIN_WORD_CHARS: usize = 3;
/// Keyword-count threshold at or below which a single overlapping keyword suffices.
const SHORT_POINT_KEYWORDS: usize = 3;
const MIN_MATCHES: usize = 2;

/// Splits an assistant reply into trackable points.
pub trait PointExtractor: Send + Sync {
    /// Return points in reply order, original text preserved.
    fn extract(&self, reply: &str) -> Vec<String>;
}

/// Extracts numbered items, bullet items and sentences opened by a transition word.
#[derive(Debug, Clone)]
pub struct RegexPointExtractor {
    max_points: usize,
}

impl RegexPointExtractor {
    pub fn new(max_points: usize) -> Self {
        Self { max_points }
    }
}

impl Default for RegexPointExtractor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl PointExtractor for RegexPointExtractor {
    fn extract(&self, reply: &str) -> Vec<String> {
        let mut points: Vec<String> = Vec::new();
        for pattern in [&*NUMBERED, &*BULLET, &*TRANSITION] {
            for caps in pattern.captures_iter(reply) {
                let Some(text) = caps.get(1).map(|m| m.as_str().trim()) else {
                    continue;
                };
                let key = canonicalize(text);
                if key.is_empty() || points.iter().any(|p| canonicalize(p) == key) {
                    continue;
                }
                points.push(text.to_string());
            }
        }
        points.truncate(self.max_points);
        points
    }
}

/// Canonical key of a point: lowercase, whitespace collapsed, trailing `.,;:!?` and
/// surrounding whitespace removed.
pub fn canonicalize(point: &str) -> String {
    let collapsed = point
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(['.', ',', ';', ':', '!', '?'])
        .trim_end()
        .to_string()
}

/// Find the discussed point a message refers to, if any.
///
/// Only the `window` most recently discussed points are considered. An explicit
/// phrase such as "that point" or "the last one" selects the most recent point.
/// Otherwise, in recency order, the first point with at least two keywords overlapping
/// the message wins; points of three keywords or fewer need only one. Words shorter
/// than three characters are ignored on both sides, and a keyword overlaps when it
/// contains, or is contained in, a message word.
pub fn detect_point_reference(
    message: &str,
    points: &HashMap<String, DiscussedPoint>,
    window: usize,
) -> Option<String> {
    let mut recent: Vec<(&String, &DiscussedPoint)> = points.iter().collect();
    recent.sort_by(|a, b| {
        b.1.last_discussed
            .cmp(&a.1.last_discussed)
            .then_with(|| b.1.first_discussed.cmp(&a.1.first_discussed))
            .then_with(|| a.0.cmp(b.0))
    });
    recent.truncate(window);

    if DEICTIC.is_match(message) {
        return recent.first().map(|(key, _)| (*key).clone());
    }

    let lowered = message.to_lowercase();
    let message_words: Vec<&str> = significant_words(&lowered).collect();
    if message_words.is_empty() {
        return None;
    }

    recent
        .into_iter()
        .find(|(key, _)| {
            let keywords: Vec<&str> = significant_words(key).collect();
            if keywords.is_empty() {
                return false;
            }
            let matches = keywords
                .iter()
                .filter(|keyword| {
                    message_words
                        .iter()
                        .any(|word| word.contains(*keyword) || keyword.contains(*word))
                })
                .count();
            matches >= MIN_MATCHES || (keywords.len() <= SHORT_POINT_KEYWORDS && matches >= 1)
        })
        .map(|(key, _)| key.clone())
}

/// Whitespace tokens trimmed of surrounding punctuation, at least [`MIN_WORD_CHARS`] long.
fn significant_words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() >= MIN_WORD_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn points(entries: &[(&str, i64)]) -> HashMap<String, DiscussedPoint> {
        let now = Utc::now();
        entries
            .iter()
            .map(|(text, minutes_ago)| {
                let at = now - Duration::minutes(*minutes_ago);
                (
                    canonicalize(text),
                    DiscussedPoint {
                        content: text.to_string(),
                        details: Vec::new(),
                        user_interest: 5,
                        first_discussed: at,
                        last_discussed: at,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn canonical_form() {
        assert_eq!(canonicalize("  Switch to a   Plant-based diet. "), "switch to a plant-based diet");
        assert_eq!(canonicalize("Sleep more!?"), "sleep more");
        assert_eq!(canonicalize("..."), "");
    }

    #[test]
    fn extracts_numbered_bullets_and_transitions() {
        let reply = "Here is a plan:\n\
                     1. Switch to a plant-based diet.\n\
                     2) Walk every morning\n\
                     - Drink more water.\n\
                     Additionally, track your sleep each night. That is all.";
        let extracted = RegexPointExtractor::default().extract(reply);
        assert_eq!(
            extracted,
            vec![
                "Switch to a plant-based diet.",
                "Walk every morning",
                "Drink more water.",
                "track your sleep each night.",
            ]
        );
    }

    #[test]
    fn hyphenated_words_are_not_bullets() {
        let extracted = RegexPointExtractor::default().extract("Try a plant-based diet today.");
        assert!(extracted.is_empty());
    }

    #[test]
    fn extraction_is_capped_and_deduplicated() {
        let reply = "1. One.\n2. Two.\n3. Three.\n4. Four.\n5. Five.\n6. Six.\n- one";
        let extracted = RegexPointExtractor::new(5).extract(reply);
        assert_eq!(extracted.len(), 5);
        assert_eq!(extracted[0], "One.");
    }

    #[test]
    fn diet_point_is_found_by_keywords() {
        let discussed = points(&[("switch to a plant-based diet", 1), ("sleep eight hours", 0)]);
        assert_eq!(
            detect_point_reference("tell me more about that diet point", &discussed, 10).as_deref(),
            Some("switch to a plant-based diet")
        );
    }

    #[test]
    fn deictic_phrase_selects_most_recent() {
        let discussed = points(&[("switch to a plant-based diet", 5), ("sleep eight hours", 1)]);
        assert_eq!(
            detect_point_reference("can you expand on that point?", &discussed, 10).as_deref(),
            Some("sleep eight hours")
        );
    }

    #[test]
    fn unrelated_message_matches_nothing() {
        let discussed = points(&[("switch to a plant-based diet", 1)]);
        assert_eq!(detect_point_reference("what's the weather like", &discussed, 10), None);
        assert_eq!(detect_point_reference("that point", &HashMap::new(), 10), None);
    }

    #[test]
    fn short_words_do_not_count_as_overlap() {
        let discussed = points(&[("switch to a plant-based diet", 1)]);
        assert_eq!(detect_point_reference("what is a good book?", &discussed, 10), None);
        assert_eq!(detect_point_reference("should I go hiking tomorrow", &discussed, 10), None);
        assert_eq!(detect_point_reference("is it ok to do so?", &discussed, 10), None);
    }

    #[test]
    fn punctuation_does_not_hide_a_keyword() {
        let discussed = points(&[("switch to a plant-based diet", 1)]);
        assert_eq!(
            detect_point_reference("What about the diet?", &discussed, 10).as_deref(),
            Some("switch to a plant-based diet")
        );
    }

    #[test]
    fn window_limits_candidates() {
        let discussed = points(&[("hydration", 30), ("journaling habit", 1)]);
        assert_eq!(detect_point_reference("hydration", &discussed, 1), None);
        assert_eq!(
            detect_point_reference("hydration", &discussed, 2).as_deref(),
            Some("hydration")
        );
    }

    #[test]
    fn detection_is_deterministic() {
        let discussed = points(&[("morning walks", 2), ("evening walks", 2)]);
        let first = detect_point_reference("walks", &discussed, 10);
        for _ in 0..10 {
            assert_eq!(detect_point_reference("walks", &discussed, 10), first);
        }
    }
}
