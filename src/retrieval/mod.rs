//! Hybrid retrieval over a user's own material.
//!
//! [`Retriever::retrieve`] classifies the query, searches the similarity store and the
//! keyword store, gathers recent history and asks the classifier for grounded insights.
//! Every source is optional and every source failure is logged and skipped, so a call
//! with valid input always returns whatever the working sources produced.

pub mod rank;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cognition::{
    Classifier, CognitiveStructure, ContextualInsights, HistoryEntry, KeyEntities, RelatedSnippet,
    SemanticAnalysis,
};
use crate::config::RetrievalConfig;
use crate::error::{require_text, require_user, EngineError};
use crate::store::{SimilaritySearch, StoredStructure, StructureStore, VectorFilter, VectorHit};

pub use rank::{rank, RankFilters, RankedItem, RetrievedItem};

/// Content type used for free-form journal entries in the similarity store.
const ENTRY_CONTENT_TYPE: &str = "entry";

/// Limit used by [`Retriever::enhanced_search`].
const ENHANCED_SEARCH_LIMIT: usize = 20;

/// Keyword candidates fetched per requested result before Jaccard re-scoring.
const KEYWORD_CANDIDATE_FACTOR: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
    pub include_vector: bool,
    pub include_database: bool,
    pub include_semantic: bool,
    pub limit: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            include_vector: true,
            include_database: true,
            include_semantic: true,
            limit: 10,
        }
    }
}

/// A keyword-store hit with its Jaccard word-overlap score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredStructure {
    #[serde(flatten)]
    pub structure: StoredStructure,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub cognitive_structure: CognitiveStructure,
    pub semantic_analysis: SemanticAnalysis,
    /// Similarity-store hits, best first.
    pub related_content: Vec<VectorHit>,
    /// Keyword-store hits, best first. Not deduplicated against `related_content`.
    pub similar_structures: Vec<ScoredStructure>,
    pub contextual_insights: ContextualInsights,
    pub key_entities: KeyEntities,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedSearchResult {
    pub results: RetrievalResult,
    pub ranked_content: Vec<RankedItem>,
}

/// Jaccard overlap of the lowercase whitespace-separated word sets of `a` and `b`.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();

    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    words_a.intersection(&words_b).count() as f64 / union as f64
}

/// Lowercase query words longer than two characters, deduplicated in order.
pub fn query_keywords(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .filter(|w| seen.insert(w.to_string()))
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct Retriever {
    classifier: Classifier,
    similarity: Option<Arc<dyn SimilaritySearch>>,
    structures: Option<Arc<dyn StructureStore>>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        classifier: Classifier,
        similarity: Option<Arc<dyn SimilaritySearch>>,
        structures: Option<Arc<dyn StructureStore>>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            classifier,
            similarity,
            structures,
            config,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Retrieve everything relevant to `query` from `user_id`'s material.
    pub async fn retrieve(
        &self,
        query: &str,
        user_id: &str,
        options: &RetrievalOptions,
    ) -> Result<RetrievalResult, EngineError> {
        require_user(user_id)?;
        require_text(query, "query")?;

        tracing::debug!(user_id = %user_id, limit = options.limit, "retrieve");

        let semantics = async {
            if options.include_semantic {
                self.classifier.analyze_semantics(query).await
            } else {
                Ok(SemanticAnalysis::neutral())
            }
        };
        let (structure, semantics, entities) = tokio::join!(
            self.classifier.classify(query),
            semantics,
            self.classifier.extract_entities(query),
        );
        let (cognitive_structure, semantic_analysis, key_entities) = (structure?, semantics?, entities?);

        let related_content = if options.include_vector {
            self.similarity_search(query, user_id, options.limit).await
        } else {
            Vec::new()
        };

        let similar_structures = if options.include_database || related_content.is_empty() {
            self.keyword_search(query, user_id, options.limit).await
        } else {
            Vec::new()
        };

        let history = self.recent_history(user_id).await;

        let snippets: Vec<RelatedSnippet> = related_content
            .iter()
            .take(self.config.insight_snippets)
            .map(|hit| RelatedSnippet {
                content: hit.content.clone(),
                content_type: hit.content_type.clone(),
                similarity: hit.score,
            })
            .collect();
        let contextual_insights = self
            .classifier
            .generate_insights(&cognitive_structure, &snippets, &history)
            .await;

        tracing::info!(
            user_id = %user_id,
            kind = %cognitive_structure.kind,
            related = related_content.len(),
            similar = similar_structures.len(),
            "retrieval complete"
        );

        Ok(RetrievalResult {
            cognitive_structure,
            semantic_analysis,
            related_content,
            similar_structures,
            contextual_insights,
            key_entities,
        })
    }

    /// Retrieve with every source enabled and a wider limit, then rank related content
    /// and similar structures together.
    pub async fn enhanced_search(
        &self,
        query: &str,
        user_id: &str,
        filters: &RankFilters,
    ) -> Result<EnhancedSearchResult, EngineError> {
        let options = RetrievalOptions {
            limit: ENHANCED_SEARCH_LIMIT,
            ..RetrievalOptions::default()
        };
        let results = self.retrieve(query, user_id, &options).await?;

        let items: Vec<RetrievedItem> = results
            .related_content
            .iter()
            .cloned()
            .map(RetrievedItem::Related)
            .chain(
                results
                    .similar_structures
                    .iter()
                    .cloned()
                    .map(RetrievedItem::Structure),
            )
            .collect();
        let ranked_content = rank(items, &results.semantic_analysis, filters);

        Ok(EnhancedSearchResult {
            results,
            ranked_content,
        })
    }

    async fn similarity_search(&self, query: &str, user_id: &str, limit: usize) -> Vec<VectorHit> {
        let Some(similarity) = &self.similarity else {
            return Vec::new();
        };
        let filter = VectorFilter {
            user_id: user_id.to_string(),
            content_types: self.config.content_types.clone(),
            top_k: limit,
            threshold: self.config.similarity_threshold,
        };
        match similarity.search(query, &filter).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "similarity search failed, falling back to keyword search");
                Vec::new()
            }
        }
    }

    async fn keyword_search(&self, query: &str, user_id: &str, limit: usize) -> Vec<ScoredStructure> {
        let Some(structures) = &self.structures else {
            return Vec::new();
        };
        let keywords = query_keywords(query);
        if keywords.is_empty() {
            return Vec::new();
        }

        let candidates = match structures
            .search(user_id, &keywords, limit * KEYWORD_CANDIDATE_FACTOR)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "keyword search failed");
                return Vec::new();
            }
        };

        let mut scored: Vec<ScoredStructure> = candidates
            .into_iter()
            // The store is already owner-scoped; this guards foreign implementations.
            .filter(|s| s.user_id == user_id)
            .map(|structure| {
                let similarity = jaccard_similarity(query, &structure.searchable_text());
                ScoredStructure {
                    structure,
                    similarity,
                }
            })
            .collect();
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        scored
    }

    /// Newest material from both stores, half the budget each, newest first.
    async fn recent_history(&self, user_id: &str) -> Vec<HistoryEntry> {
        let count = self.config.history_count;
        let per_source = count.div_ceil(2);
        let mut history: Vec<HistoryEntry> = Vec::new();

        if let Some(structures) = &self.structures {
            match structures.recent(user_id, per_source).await {
                Ok(recent) => history.extend(recent.into_iter().map(|s| {
                    let detail = s.goals.as_deref().or(s.purpose.as_deref()).unwrap_or(&s.body);
                    history_entry(format!("{}: {}", s.heading, detail), s.created_at)
                })),
                Err(e) => tracing::warn!(user_id = %user_id, error = %e, "failed to load recent structures"),
            }
        }

        if let Some(similarity) = &self.similarity {
            let types = [ENTRY_CONTENT_TYPE.to_string()];
            match similarity.recent(user_id, &types, per_source).await {
                Ok(recent) => history.extend(
                    recent
                        .into_iter()
                        .map(|hit| history_entry(hit.content, hit.created_at)),
                ),
                Err(e) => tracing::warn!(user_id = %user_id, error = %e, "failed to load recent entries"),
            }
        }

        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history.truncate(count);
        history
    }
}

fn history_entry(content: String, timestamp: DateTime<Utc>) -> HistoryEntry {
    HistoryEntry { content, timestamp }
}
