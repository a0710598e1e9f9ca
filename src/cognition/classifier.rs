//! Model-backed classification with deterministic fallbacks.
//!
//! Every operation sends one prompt to the configured [`CompletionProvider`] and
//! parses the reply strictly. Any provider failure (absent provider, transport error,
//! malformed reply) is logged and replaced by a rule-based fallback, so the only error
//! callers ever see is [`EngineError::InvalidInput`] for empty content.

use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};

use super::parse;
use super::types::{
    CognitiveStructure, ContextualInsights, HistoryEntry, KeyEntities, RelatedSnippet,
    SemanticAnalysis, StructureKind, SuggestedStructure,
};
use crate::error::{require_text, EngineError, ProviderError};
use crate::provider::{CompletionProvider, CompletionRequest};

/// Minimum word count before goal words promote a thought to a wheel.
const WHEEL_MIN_WORDS: usize = 8;
/// Minimum word count before life/identity words promote a thought to a chakra.
const CHAKRA_MIN_WORDS: usize = 12;
const FALLBACK_CONFIDENCE: u8 = 60;
const FALLBACK_INDICATOR: &str = "automated fallback classification";

static GOAL_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(goals?|achieve|plan|planning|target|deadline|by|complete|finish|decided|training|milestones?|weekly|daily)\b",
    )
    .expect("valid regex")
});

static LIFE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(life|lifelong|identity|purpose|values|transformation|vision|who i am)\b")
        .expect("valid regex")
});

static ACTION_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(goal|plan|do|action|complete|achieve)\b").expect("valid regex")
});

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Classifies thoughts and derives semantics, entities and insights.
#[derive(Clone)]
pub struct Classifier {
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl Classifier {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self { provider }
    }

    /// A classifier with no model: every call takes the fallback path.
    pub fn offline() -> Self {
        Self { provider: None }
    }

    pub(crate) async fn ask(
        &self,
        operation: &str,
        request: CompletionRequest,
    ) -> Result<serde_json::Value, ProviderError> {
        let provider = self.provider.as_ref().ok_or(ProviderError::NotConfigured)?;
        tracing::debug!(operation, provider = provider.name(), "calling completion provider");
        provider.complete(&request).await
    }

    /// Classify text as a dot, wheel or chakra.
    pub async fn classify(&self, content: &str) -> Result<CognitiveStructure, EngineError> {
        require_text(content, "content")?;

        let request = CompletionRequest::new(classification_prompt(content), 0.3, 1200);
        let reply = self.ask("classify", request).await;
        match reply.and_then(|value| parse::parse_classification(&value, content)) {
            Ok(structure) => Ok(structure),
            Err(e) => {
                log_fallback("classify", &e);
                Ok(fallback_classification(content))
            }
        }
    }

    /// Produce the seven-field semantic profile of the text.
    pub async fn analyze_semantics(&self, content: &str) -> Result<SemanticAnalysis, EngineError> {
        require_text(content, "content")?;

        let request = CompletionRequest::new(semantics_prompt(content), 0.2, 1000);
        let reply = self.ask("analyze_semantics", request).await;
        match reply.and_then(|value| parse::parse_semantics(&value)) {
            Ok(analysis) => Ok(analysis),
            Err(e) => {
                log_fallback("analyze_semantics", &e);
                Ok(fallback_semantics(content))
            }
        }
    }

    /// Extract named entities, concepts, keywords and topics.
    pub async fn extract_entities(&self, content: &str) -> Result<KeyEntities, EngineError> {
        require_text(content, "content")?;

        let request = CompletionRequest::new(entities_prompt(content), 0.1, 1000);
        let reply = self.ask("extract_entities", request).await;
        match reply.and_then(|value| parse::parse_entities(&value)) {
            Ok(entities) => Ok(entities),
            Err(e) => {
                log_fallback("extract_entities", &e);
                Ok(fallback_entities(content))
            }
        }
    }

    /// Generate insights grounded in the structure, related snippets and recent history.
    ///
    /// Only the last three history entries are used.
    pub async fn generate_insights(
        &self,
        structure: &CognitiveStructure,
        related: &[RelatedSnippet],
        history: &[HistoryEntry],
    ) -> ContextualInsights {
        let request = CompletionRequest::new(insights_prompt(structure, related, history), 0.4, 1200);
        let reply = self.ask("generate_insights", request).await;
        match reply.and_then(|value| parse::parse_insights(&value)) {
            Ok(insights) => insights,
            Err(e) => {
                log_fallback("generate_insights", &e);
                fallback_insights(structure)
            }
        }
    }
}

pub(crate) fn log_fallback(operation: &str, error: &ProviderError) {
    match error {
        ProviderError::NotConfigured => {
            tracing::debug!(operation, "no completion provider, using fallback")
        }
        other => tracing::warn!(operation, error = %other, "provider call failed, using fallback"),
    }
}

// ── Fallbacks ─────────────────────────────────────────────────────────────────

/// Rule-based classification: life words in a long enough thought make a chakra,
/// goal words make a wheel, anything else is a dot.
pub fn fallback_classification(content: &str) -> CognitiveStructure {
    let word_count = content.split_whitespace().count();
    let has_life_terms = LIFE_WORDS.is_match(content);
    let has_goals = GOAL_WORDS.is_match(content);

    let kind = if has_life_terms && word_count >= CHAKRA_MIN_WORDS {
        StructureKind::Chakra
    } else if has_goals && word_count >= WHEEL_MIN_WORDS {
        StructureKind::Wheel
    } else {
        StructureKind::Dot
    };

    let heading = content
        .split('.')
        .next()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or("Untitled")
        .to_string();

    CognitiveStructure {
        kind,
        confidence: FALLBACK_CONFIDENCE,
        reasoning: "Fallback classification based on keyword analysis".into(),
        key_indicators: vec![FALLBACK_INDICATOR.into()],
        suggested_structure: SuggestedStructure {
            heading,
            content: content.to_string(),
            timeline: None,
            purpose: None,
            goals: None,
        },
    }
}

pub fn fallback_semantics(content: &str) -> SemanticAnalysis {
    SemanticAnalysis {
        action_oriented: ACTION_WORDS.is_match(content),
        ..SemanticAnalysis::neutral()
    }
}

/// Up to five unique lowercase words longer than three characters, in order of appearance.
pub fn fallback_entities(content: &str) -> KeyEntities {
    let lowered = content.to_lowercase();
    let mut seen = HashSet::new();
    let keywords = NON_WORD
        .split(&lowered)
        .filter(|w| w.chars().count() > 3)
        .filter(|w| seen.insert(*w))
        .take(5)
        .map(str::to_string)
        .collect();

    KeyEntities {
        entities: Vec::new(),
        concepts: Vec::new(),
        keywords,
        topics: vec!["general".into()],
    }
}

pub fn fallback_insights(structure: &CognitiveStructure) -> ContextualInsights {
    let kind = structure.kind;
    ContextualInsights {
        insights: vec![format!(
            "This {kind} represents {}",
            structure.reasoning.to_lowercase()
        )],
        recommendations: vec![format!(
            "Consider developing this {kind} further based on your patterns"
        )],
        connections: vec![format!("Look for other {kind}s in your thinking that share these themes")],
        next_steps: vec![format!("Review and refine this {kind}")],
    }
}

// ── Prompts ───────────────────────────────────────────────────────────────────

fn classification_prompt(content: &str) -> String {
    format!(
        r#"Classify the content below as exactly one of DOT, WHEEL or CHAKRA.

DOT: one specific insight or realization. No goal, no timeline, no plan. At most two sentences.
WHEEL: an explicit goal with actionable steps, measurable outcomes or time-bound elements (deadlines, milestones). Project level.
CHAKRA: life-level purpose or identity change touching several life domains (career, health, relationships...). Long-term personal evolution or core values.

Be conservative: when unsure, choose the simpler structure (DOT before WHEEL before CHAKRA).

Content: "{content}"

Reply with a JSON object:
{{
  "type": "dot|wheel|chakra",
  "confidence": 0-100,
  "reasoning": "why this structure fits",
  "keyIndicators": ["indicator", "..."],
  "suggestedStructure": {{
    "heading": "short descriptive title",
    "content": "main content",
    "timeline": "optional, wheel/chakra time elements",
    "purpose": "optional, chakra life purpose",
    "goals": "optional, wheel goals"
  }}
}}"#
    )
}

fn semantics_prompt(content: &str) -> String {
    format!(
        r#"Analyze the content below and report:
1. two to four main themes
2. emotional mood
3. complexity: simple, moderate or complex
4. whether it is action oriented
5. time horizon: immediate, short-term, long-term or life-long
6. life domains involved
7. readiness score (0-100) for turning it into a structured record

Content: "{content}"

Reply with a JSON object:
{{
  "themes": ["..."],
  "mood": "...",
  "complexity": "simple|moderate|complex",
  "actionOriented": true,
  "timeHorizon": "immediate|short-term|long-term|life-long",
  "domains": ["career", "health", "..."],
  "readinessScore": 0-100
}}"#
    )
}

fn entities_prompt(content: &str) -> String {
    format!(
        r#"Extract from the content below: named entities (people, places, organizations, dates), core concepts, important keywords and main topics.

Content: "{content}"

Reply with a JSON object:
{{
  "entities": ["..."],
  "concepts": ["..."],
  "keywords": ["..."],
  "topics": ["..."]
}}"#
    )
}

fn insights_prompt(
    structure: &CognitiveStructure,
    related: &[RelatedSnippet],
    history: &[HistoryEntry],
) -> String {
    let mut related_block = String::new();
    for (i, item) in related.iter().enumerate() {
        let _ = writeln!(
            related_block,
            "{}. [{}] {} ({}% similar)",
            i + 1,
            item.content_type,
            item.content,
            (item.similarity * 100.0).round()
        );
    }
    if related_block.is_empty() {
        related_block.push_str("None found\n");
    }

    let recent = &history[history.len().saturating_sub(3)..];
    let history_block = if recent.is_empty() {
        "No recent history".to_string()
    } else {
        recent
            .iter()
            .map(|h| format!("- {}", h.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Generate insights for a {kind_upper}.

Current structure:
- Type: {kind}
- Content: {content}
- Confidence: {confidence}%

Related content:
{related_block}
Recent history:
{history_block}

Reply with a JSON object:
{{
  "insights": ["..."],
  "recommendations": ["..."],
  "connections": ["connection to related content"],
  "nextSteps": ["..."]
}}"#,
        kind_upper = structure.kind.as_str().to_uppercase(),
        kind = structure.kind,
        content = structure.suggested_structure.content,
        confidence = structure.confidence,
    )
}
