//! Similarity store on top of sqlite-vec.
//!
//! Metadata lives in `vectors`, embeddings in the `vectors_vec` vec0 table keyed by the
//! same id and partitioned by owner. Embeddings are unit length, so sqlite-vec's L2
//! distance converts to cosine similarity as `1 - d²/2`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{parse_timestamp, truncate_chars, SimilaritySearch, VectorFilter, VectorHit, VectorRecord};
use crate::embedding::{embedding_to_bytes, EmbeddingProvider};
use crate::error::ProviderError;

/// Stored record content is cut to this many characters.
pub const MAX_RECORD_CHARS: usize = 1000;

/// Initial KNN candidates per requested hit; content types are filtered afterwards.
const CANDIDATE_FACTOR: usize = 4;
/// Largest `k` sqlite-vec accepts in a KNN query.
const MAX_KNN_K: usize = 4096;

/// Convert an L2 distance between unit vectors into cosine similarity in `[0, 1]`.
pub fn l2_to_cosine(distance: f64) -> f64 {
    (1.0 - distance * distance / 2.0).clamp(0.0, 1.0)
}

/// Insert a record and its embedding in one transaction. Returns the new id.
pub fn insert_record(conn: &mut Connection, record: &VectorRecord, embedding: &[f32]) -> Result<String> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
    let content = truncate_chars(&record.content, MAX_RECORD_CHARS);
    let metadata_json = record.metadata.as_ref().map(serde_json::to_string).transpose()?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO vectors (id, user_id, content_type, content_id, session_id, content, metadata, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            record.user_id,
            record.content_type,
            record.content_id,
            record.session_id,
            content,
            metadata_json,
            now,
        ],
    )
    .context("failed to insert vector metadata")?;
    tx.execute(
        "INSERT INTO vectors_vec (id, user_id, embedding) VALUES (?1, ?2, ?3)",
        params![id, record.user_id, embedding_to_bytes(embedding)],
    )
    .context("failed to insert embedding")?;
    tx.commit()?;

    Ok(id)
}

/// KNN search within the owner's partition, then type and threshold filtering.
///
/// The candidate window doubles while other content types crowd out the requested
/// ones. It stops once `top_k` hits are found, a candidate falls below the threshold,
/// or the partition is exhausted.
pub fn search_records(conn: &Connection, embedding: &[f32], filter: &VectorFilter) -> Result<Vec<VectorHit>> {
    if filter.top_k == 0 {
        return Ok(Vec::new());
    }

    let query = embedding_to_bytes(embedding);
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM vectors_vec \
         WHERE embedding MATCH ?1 AND k = ?2 AND user_id = ?3 \
         ORDER BY distance",
    )?;

    let mut k = (filter.top_k * CANDIDATE_FACTOR).min(MAX_KNN_K);
    loop {
        let candidates: Vec<(String, f64)> = stmt
            .query_map(params![query, k as i64, filter.user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let (hits, below_threshold) = filter_candidates(conn, &candidates, filter)?;
        if hits.len() >= filter.top_k || below_threshold || candidates.len() < k || k >= MAX_KNN_K {
            return Ok(hits);
        }
        tracing::debug!(k, hits = hits.len(), "widening similarity window");
        k = (k * 2).min(MAX_KNN_K);
    }
}

/// Walk nearest-first candidates. The flag reports whether one fell below the
/// threshold, after which no further candidate can qualify.
fn filter_candidates(
    conn: &Connection,
    candidates: &[(String, f64)],
    filter: &VectorFilter,
) -> Result<(Vec<VectorHit>, bool)> {
    let ids: Vec<&str> = candidates.iter().map(|(id, _)| id.as_str()).collect();
    let rows = fetch_records(conn, &ids)?;

    let mut hits = Vec::new();
    for (id, distance) in candidates {
        let score = l2_to_cosine(*distance);
        if score < filter.threshold {
            return Ok((hits, true));
        }
        let Some(row) = rows.get(id) else { continue };
        if row.user_id != filter.user_id {
            continue;
        }
        if !filter.content_types.is_empty() && !filter.content_types.contains(&row.content_type) {
            continue;
        }
        hits.push(VectorHit {
            score,
            ..row.clone()
        });
        if hits.len() >= filter.top_k {
            break;
        }
    }
    Ok((hits, false))
}

/// Newest records for a user, optionally restricted to some content types.
pub fn recent_records(
    conn: &Connection,
    user_id: &str,
    content_types: &[String],
    limit: usize,
) -> Result<Vec<VectorHit>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, content_type, session_id, content, metadata, created_at \
         FROM vectors WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map(params![user_id], row_to_hit)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .filter(|r| content_types.is_empty() || content_types.contains(&r.content_type))
        .take(limit)
        .collect())
}

fn fetch_records(conn: &Connection, ids: &[&str]) -> Result<HashMap<String, VectorHit>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT id, user_id, content_type, session_id, content, metadata, created_at \
         FROM vectors WHERE id IN ({})",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

    let rows = stmt
        .query_map(params.as_slice(), row_to_hit)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|r| (r.id.clone(), r)).collect())
}

fn row_to_hit(row: &rusqlite::Row<'_>) -> rusqlite::Result<VectorHit> {
    let metadata: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(VectorHit {
        id: row.get(0)?,
        score: 0.0,
        user_id: row.get(1)?,
        content_type: row.get(2)?,
        session_id: row.get(3)?,
        content: row.get(4)?,
        metadata: metadata.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: parse_timestamp(&created_at),
    })
}

// ── Async store ───────────────────────────────────────────────────────────────

/// [`SimilaritySearch`] over the shared SQLite connection and a remote embedding model.
#[derive(Clone)]
pub struct SqliteVectorStore {
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
}

impl SqliteVectorStore {
    pub fn new(db: Arc<Mutex<Connection>>, embedding: Arc<dyn EmbeddingProvider>) -> Self {
        Self { db, embedding }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, ProviderError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| ProviderError::Unavailable(format!("db task failed: {e}")))?
        .map_err(ProviderError::from)
    }
}

#[async_trait]
impl SimilaritySearch for SqliteVectorStore {
    async fn search(&self, query: &str, filter: &VectorFilter) -> Result<Vec<VectorHit>, ProviderError> {
        let embedding = self.embedding.embed(query).await?;
        let filter = filter.clone();
        let hits = self
            .with_conn(move |conn| search_records(conn, &embedding, &filter))
            .await?;
        tracing::debug!(hits = hits.len(), "similarity search complete");
        Ok(hits)
    }

    async fn store(&self, record: VectorRecord) -> Result<String, ProviderError> {
        let embedding = self.embedding.embed(&record.content).await?;
        self.with_conn(move |conn| insert_record(conn, &record, &embedding))
            .await
    }

    async fn recent(
        &self,
        user_id: &str,
        content_types: &[String],
        limit: usize,
    ) -> Result<Vec<VectorHit>, ProviderError> {
        let user_id = user_id.to_string();
        let content_types = content_types.to_vec();
        self.with_conn(move |conn| recent_records(conn, &user_id, &content_types, limit))
            .await
    }
}
