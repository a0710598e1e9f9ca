//! Storage collaborators consumed by the retriever and the conversation engine.
//!
//! Two seams are defined here:
//!
//! - [`SimilaritySearch`]: embedding-backed search over the user's material, which
//!   also accepts new records (conversation archival, newly stored thoughts).
//! - [`StructureStore`]: the user's stored dots, wheels and chakras, queryable by
//!   keyword and by recency.
//!
//! Both report failures as [`ProviderError`] so callers can log them and carry on with
//! whatever the other sources returned. The SQLite implementations live in [`vector`]
//! and [`structures`].

pub mod structures;
pub mod vector;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cognition::StructureKind;
use crate::error::ProviderError;

pub use structures::{NewStructure, SqliteStructureStore};
pub use vector::SqliteVectorStore;

// ── Similarity search ─────────────────────────────────────────────────────────

/// Constraints applied to a similarity search.
#[derive(Debug, Clone)]
pub struct VectorFilter {
    /// Only records owned by this user are returned.
    pub user_id: String,
    /// Allowed content types. Empty means any.
    pub content_types: Vec<String>,
    pub top_k: usize,
    /// Minimum cosine similarity in `[0, 1]`.
    pub threshold: f64,
}

/// A similarity hit with its stored metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorHit {
    pub id: String,
    /// Cosine similarity in `[0, 1]`.
    pub score: f64,
    pub content: String,
    pub content_type: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A record handed to the similarity store for indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub user_id: String,
    pub content_type: String,
    /// Id of the row this record mirrors, if any.
    pub content_id: Option<String>,
    pub session_id: Option<String>,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
}

#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Return up to `filter.top_k` hits at or above `filter.threshold`, best first.
    async fn search(&self, query: &str, filter: &VectorFilter) -> Result<Vec<VectorHit>, ProviderError>;

    /// Index a record. Returns the new record id.
    async fn store(&self, record: VectorRecord) -> Result<String, ProviderError>;

    /// The user's most recent records of the given content types, newest first.
    async fn recent(
        &self,
        _user_id: &str,
        _content_types: &[String],
        _limit: usize,
    ) -> Result<Vec<VectorHit>, ProviderError> {
        Ok(Vec::new())
    }
}

// ── Stored structures ─────────────────────────────────────────────────────────

/// One stored dot, wheel or chakra.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredStructure {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: StructureKind,
    pub heading: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredStructure {
    /// All searchable text of the structure joined by spaces.
    pub fn searchable_text(&self) -> String {
        let mut text = format!("{} {}", self.heading, self.body);
        for extra in [&self.goals, &self.purpose].into_iter().flatten() {
            text.push(' ');
            text.push_str(extra);
        }
        text
    }
}

#[async_trait]
pub trait StructureStore: Send + Sync {
    /// Structures owned by `user_id` matching any of `keywords`, at most `limit`.
    async fn search(
        &self,
        user_id: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<StoredStructure>, ProviderError>;

    /// The user's most recent structures, newest first.
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<StoredStructure>, ProviderError>;
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Parse an RFC 3339 timestamp column, treating garbage as the epoch.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}
