//! Relevance ranking of merged retrieval results.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cognition::SemanticAnalysis;
use crate::store::VectorHit;

use super::ScoredStructure;

const THEME_BOOST: f64 = 0.2;
const RECENCY_BOOST: f64 = 0.1;
const RECENCY_WINDOW_DAYS: i64 = 7;
const TYPE_MISMATCH_FACTOR: f64 = 0.5;

/// One retrieved item, from either source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RetrievedItem {
    Related(VectorHit),
    Structure(ScoredStructure),
}

impl RetrievedItem {
    /// Source similarity, used as the base score.
    pub fn similarity(&self) -> f64 {
        match self {
            Self::Related(hit) => hit.score,
            Self::Structure(s) => s.similarity,
        }
    }

    pub fn content(&self) -> String {
        match self {
            Self::Related(hit) => hit.content.clone(),
            Self::Structure(s) => s.structure.searchable_text(),
        }
    }

    /// Structure kind or stored content type.
    pub fn item_type(&self) -> &str {
        match self {
            Self::Related(hit) => &hit.content_type,
            Self::Structure(s) => s.structure.kind.as_str(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Related(hit) => hit.created_at,
            Self::Structure(s) => s.structure.created_at,
        }
    }
}

/// Ranking filters. An empty type list applies no penalty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankFilters {
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    pub item: RetrievedItem,
    /// Always within `[0, 1]`.
    pub relevance_score: f64,
    pub match_reasons: Vec<String>,
}

/// Rank items against the query's semantic profile, best first.
pub fn rank(items: Vec<RetrievedItem>, semantics: &SemanticAnalysis, filters: &RankFilters) -> Vec<RankedItem> {
    rank_at(items, semantics, filters, Utc::now())
}

/// [`rank`] with an explicit clock.
///
/// Base score is the item's similarity. Theme alignment adds 0.2, content younger than
/// seven days adds 0.1, and an item outside a non-empty type filter is halved. The
/// result is clamped to `[0, 1]` and sorted stably, so equal scores keep input order.
pub fn rank_at(
    items: Vec<RetrievedItem>,
    semantics: &SemanticAnalysis,
    filters: &RankFilters,
    now: DateTime<Utc>,
) -> Vec<RankedItem> {
    let themes: Vec<String> = semantics
        .themes
        .iter()
        .map(|t| t.to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let mut ranked: Vec<RankedItem> = items
        .into_iter()
        .map(|item| {
            let mut score = item.similarity();
            let mut reasons = Vec::new();

            let content = item.content().to_lowercase();
            if themes.iter().any(|theme| content.contains(theme.as_str())) {
                score += THEME_BOOST;
                reasons.push("Theme alignment".to_string());
            }

            if now - item.created_at() < Duration::days(RECENCY_WINDOW_DAYS) {
                score += RECENCY_BOOST;
                reasons.push("Recent content".to_string());
            }

            if !filters.types.is_empty() && !filters.types.iter().any(|t| t == item.item_type()) {
                score *= TYPE_MISMATCH_FACTOR;
            }

            RankedItem {
                item,
                relevance_score: score.clamp(0.0, 1.0),
                match_reasons: reasons,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}
