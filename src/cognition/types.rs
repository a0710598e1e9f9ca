//! Value types produced by the classifier.
//!
//! Defines [`StructureKind`] (dot / wheel / chakra), [`CognitiveStructure`],
//! [`SemanticAnalysis`], [`KeyEntities`] and [`ContextualInsights`]. Scores are
//! stored as `u8` and always lie in `[0, 100]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three structural granularities a thought can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// A single insight with no goal or timeline.
    Dot,
    /// A goal- and timeline-bound project.
    Wheel,
    /// A life-level, multi-domain purpose or identity change.
    Chakra,
}

impl StructureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Wheel => "wheel",
            Self::Chakra => "chakra",
        }
    }

    /// Map a similarity-store content type onto a structure kind.
    ///
    /// Plain journal entries count as dots; conversations and unknown types have no kind.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "entry" => Some(Self::Dot),
            other => other.parse().ok(),
        }
    }
}

impl std::fmt::Display for StructureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StructureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dot" => Ok(Self::Dot),
            "wheel" => Ok(Self::Wheel),
            "chakra" => Ok(Self::Chakra),
            other => Err(format!("unknown structure type: {other}")),
        }
    }
}

/// Proposed shape for storing the classified thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedStructure {
    pub heading: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
}

/// Classification of a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveStructure {
    #[serde(rename = "type")]
    pub kind: StructureKind,
    /// Confidence in `[0, 100]`.
    pub confidence: u8,
    pub reasoning: String,
    pub key_indicators: Vec<String>,
    pub suggested_structure: SuggestedStructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl std::str::FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "moderate" => Ok(Self::Moderate),
            "complex" => Ok(Self::Complex),
            other => Err(format!("unknown complexity: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeHorizon {
    Immediate,
    ShortTerm,
    LongTerm,
    LifeLong,
}

impl std::str::FromStr for TimeHorizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "short-term" => Ok(Self::ShortTerm),
            "long-term" => Ok(Self::LongTerm),
            "life-long" => Ok(Self::LifeLong),
            other => Err(format!("unknown time horizon: {other}")),
        }
    }
}

/// Semantic profile of a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticAnalysis {
    pub themes: Vec<String>,
    pub mood: String,
    pub complexity: Complexity,
    pub action_oriented: bool,
    pub time_horizon: TimeHorizon,
    pub domains: Vec<String>,
    /// How well-formed the thought is for promotion into a stored record, `[0, 100]`.
    pub readiness_score: u8,
}

impl SemanticAnalysis {
    /// Neutral profile used when semantic analysis is skipped or unavailable.
    pub fn neutral() -> Self {
        Self {
            themes: vec!["general".into()],
            mood: "neutral".into(),
            complexity: Complexity::Moderate,
            action_oriented: false,
            time_horizon: TimeHorizon::ShortTerm,
            domains: vec!["personal".into()],
            readiness_score: 70,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyEntities {
    pub entities: Vec<String>,
    pub concepts: Vec<String>,
    pub keywords: Vec<String>,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualInsights {
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub connections: Vec<String>,
    pub next_steps: Vec<String>,
}

impl ContextualInsights {
    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
            && self.recommendations.is_empty()
            && self.connections.is_empty()
            && self.next_steps.is_empty()
    }
}

/// A related item handed to insight generation.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedSnippet {
    pub content: String,
    pub content_type: String,
    /// Similarity in `[0, 1]`.
    pub similarity: f64,
}

/// One entry of the user's recent material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_kind_round_trips_through_str() {
        for kind in [StructureKind::Dot, StructureKind::Wheel, StructureKind::Chakra] {
            assert_eq!(kind.as_str().parse::<StructureKind>().unwrap(), kind);
        }
        assert!("galaxy".parse::<StructureKind>().is_err());
    }

    #[test]
    fn entries_count_as_dots() {
        assert_eq!(StructureKind::from_content_type("entry"), Some(StructureKind::Dot));
        assert_eq!(StructureKind::from_content_type("conversation"), None);
    }

    #[test]
    fn semantic_analysis_serializes_with_wire_names() {
        let json = serde_json::to_value(SemanticAnalysis::neutral()).unwrap();
        assert_eq!(json["timeHorizon"], "short-term");
        assert_eq!(json["readinessScore"], 70);
        assert_eq!(json["actionOriented"], false);
    }

    #[test]
    fn cognitive_structure_serializes_type_field() {
        let structure = CognitiveStructure {
            kind: StructureKind::Wheel,
            confidence: 80,
            reasoning: "goal with deadline".into(),
            key_indicators: vec!["deadline".into()],
            suggested_structure: SuggestedStructure {
                heading: "Marathon".into(),
                content: "Run a marathon".into(),
                timeline: Some("June".into()),
                purpose: None,
                goals: None,
            },
        };
        let json = serde_json::to_value(&structure).unwrap();
        assert_eq!(json["type"], "wheel");
        assert_eq!(json["keyIndicators"][0], "deadline");
        assert!(json["suggestedStructure"].get("purpose").is_none());
    }
}
