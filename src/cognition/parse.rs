//! Strict parsing of model replies.
//!
//! Each reply is first deserialized into a `Raw*` shape where every field is optional
//! but typed. A field of the wrong JSON type fails the whole reply with
//! [`ProviderError::Parse`]; a missing field, an unknown enum label or an out-of-range
//! score is replaced by its documented default or clamped. Nothing from a reply is
//! consumed before it has passed through here.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::types::{
    CognitiveStructure, Complexity, ContextualInsights, KeyEntities, SemanticAnalysis,
    StructureKind, SuggestedStructure, TimeHorizon,
};
use crate::error::ProviderError;

pub(crate) fn from_reply<T: DeserializeOwned>(value: &Value) -> Result<T, ProviderError> {
    T::deserialize(value).map_err(|e| ProviderError::Parse(e.to_string()))
}

/// Clamp a model-reported score into `[0, 100]`.
pub(crate) fn clamp_score(value: Option<f64>, default: u8) -> u8 {
    match value {
        Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u8,
        _ => default,
    }
}

/// Drop blank entries and surrounding whitespace.
pub(crate) fn clean_list(items: Option<Vec<String>>) -> Vec<String> {
    items
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ── Classification ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    #[serde(rename = "type")]
    kind: Option<String>,
    confidence: Option<f64>,
    reasoning: Option<String>,
    key_indicators: Option<Vec<String>>,
    suggested_structure: Option<RawSuggestedStructure>,
}

#[derive(Deserialize, Default)]
struct RawSuggestedStructure {
    heading: Option<String>,
    content: Option<String>,
    timeline: Option<String>,
    purpose: Option<String>,
    goals: Option<String>,
}

/// Parse a classification reply. `content` backs the suggested body when the reply omits it.
pub fn parse_classification(value: &Value, content: &str) -> Result<CognitiveStructure, ProviderError> {
    let raw: RawClassification = from_reply(value)?;
    let suggested = raw.suggested_structure.unwrap_or_default();

    // Unknown labels fall back to the simplest structure.
    let kind = raw
        .kind
        .as_deref()
        .and_then(|k| k.parse::<StructureKind>().ok())
        .unwrap_or(StructureKind::Dot);

    Ok(CognitiveStructure {
        kind,
        confidence: clamp_score(raw.confidence, 70),
        reasoning: non_blank(raw.reasoning)
            .unwrap_or_else(|| "Classification based on content analysis".into()),
        key_indicators: clean_list(raw.key_indicators),
        suggested_structure: SuggestedStructure {
            heading: non_blank(suggested.heading).unwrap_or_else(|| "Untitled".into()),
            content: non_blank(suggested.content).unwrap_or_else(|| content.to_string()),
            timeline: non_blank(suggested.timeline),
            purpose: non_blank(suggested.purpose),
            goals: non_blank(suggested.goals),
        },
    })
}

// ── Semantic analysis ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSemantics {
    themes: Option<Vec<String>>,
    mood: Option<String>,
    complexity: Option<String>,
    action_oriented: Option<bool>,
    time_horizon: Option<String>,
    domains: Option<Vec<String>>,
    readiness_score: Option<f64>,
}

pub fn parse_semantics(value: &Value) -> Result<SemanticAnalysis, ProviderError> {
    let raw: RawSemantics = from_reply(value)?;
    let neutral = SemanticAnalysis::neutral();

    let themes = clean_list(raw.themes);
    let domains = clean_list(raw.domains);

    Ok(SemanticAnalysis {
        themes: if themes.is_empty() { neutral.themes } else { themes },
        mood: non_blank(raw.mood).unwrap_or(neutral.mood),
        complexity: raw
            .complexity
            .as_deref()
            .and_then(|c| c.parse::<Complexity>().ok())
            .unwrap_or(neutral.complexity),
        action_oriented: raw.action_oriented.unwrap_or(false),
        time_horizon: raw
            .time_horizon
            .as_deref()
            .and_then(|t| t.parse::<TimeHorizon>().ok())
            .unwrap_or(neutral.time_horizon),
        domains: if domains.is_empty() { neutral.domains } else { domains },
        readiness_score: clamp_score(raw.readiness_score, neutral.readiness_score),
    })
}

// ── Entities and insights ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawEntities {
    entities: Option<Vec<String>>,
    concepts: Option<Vec<String>>,
    keywords: Option<Vec<String>>,
    topics: Option<Vec<String>>,
}

pub fn parse_entities(value: &Value) -> Result<KeyEntities, ProviderError> {
    let raw: RawEntities = from_reply(value)?;
    Ok(KeyEntities {
        entities: clean_list(raw.entities),
        concepts: clean_list(raw.concepts),
        keywords: clean_list(raw.keywords),
        topics: clean_list(raw.topics),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInsights {
    insights: Option<Vec<String>>,
    recommendations: Option<Vec<String>>,
    connections: Option<Vec<String>>,
    next_steps: Option<Vec<String>>,
}

pub fn parse_insights(value: &Value) -> Result<ContextualInsights, ProviderError> {
    let raw: RawInsights = from_reply(value)?;
    Ok(ContextualInsights {
        insights: clean_list(raw.insights),
        recommendations: clean_list(raw.recommendations),
        connections: clean_list(raw.connections),
        next_steps: clean_list(raw.next_steps),
    })
}
