//! SQLite-backed store of dots, wheels and chakras.
//!
//! Rows live in `structures`; the `structures_fts` external-content FTS5 index is kept
//! in sync by hand on insert, using the same rowid. Keyword search ORs the quoted
//! keywords together and is always restricted to the owning user.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

use super::{parse_timestamp, StoredStructure, StructureStore};
use crate::cognition::{CognitiveStructure, StructureKind};
use crate::error::ProviderError;

/// A structure about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStructure {
    pub kind: StructureKind,
    pub heading: String,
    pub body: String,
    pub goals: Option<String>,
    pub purpose: Option<String>,
    pub timeline: Option<String>,
}

impl From<&CognitiveStructure> for NewStructure {
    fn from(structure: &CognitiveStructure) -> Self {
        let suggested = &structure.suggested_structure;
        Self {
            kind: structure.kind,
            heading: suggested.heading.clone(),
            body: suggested.content.clone(),
            goals: suggested.goals.clone(),
            purpose: suggested.purpose.clone(),
            timeline: suggested.timeline.clone(),
        }
    }
}

const SELECT_COLUMNS: &str =
    "s.id, s.user_id, s.kind, s.heading, s.body, s.goals, s.purpose, s.timeline, s.created_at";

/// Insert a structure and its FTS row in one transaction.
pub fn insert_structure(
    conn: &mut Connection,
    user_id: &str,
    structure: &NewStructure,
) -> Result<StoredStructure> {
    let id = uuid::Uuid::now_v7().to_string();
    let created_at = chrono::Utc::now();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO structures (id, user_id, kind, heading, body, goals, purpose, timeline, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            user_id,
            structure.kind.as_str(),
            structure.heading,
            structure.body,
            structure.goals,
            structure.purpose,
            structure.timeline,
            created_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        ],
    )
    .context("failed to insert structure")?;
    let rowid = tx.last_insert_rowid();

    // Must reuse the structures rowid for the external-content index.
    tx.execute(
        "INSERT INTO structures_fts (rowid, heading, body, goals, purpose, id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            rowid,
            structure.heading,
            structure.body,
            structure.goals,
            structure.purpose,
            id
        ],
    )
    .context("failed to index structure")?;
    tx.commit()?;

    Ok(StoredStructure {
        id,
        user_id: user_id.to_string(),
        kind: structure.kind,
        heading: structure.heading.clone(),
        body: structure.body.clone(),
        goals: structure.goals.clone(),
        purpose: structure.purpose.clone(),
        timeline: structure.timeline.clone(),
        created_at,
    })
}

/// Keyword search restricted to `user_id`, best FTS rank first.
pub fn search_structures(
    conn: &Connection,
    user_id: &str,
    keywords: &[String],
    limit: usize,
) -> Result<Vec<StoredStructure>> {
    let query = fts_or_query(keywords);
    if query.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM structures_fts f \
         JOIN structures s ON s.rowid = f.rowid \
         WHERE structures_fts MATCH ?1 AND s.user_id = ?2 \
         ORDER BY f.rank LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![query, user_id, limit as i64], row_to_structure)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The user's newest structures.
pub fn recent_structures(conn: &Connection, user_id: &str, limit: usize) -> Result<Vec<StoredStructure>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM structures s \
         WHERE s.user_id = ?1 ORDER BY s.created_at DESC, s.rowid DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id, limit as i64], row_to_structure)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_structure(row: &Row<'_>) -> rusqlite::Result<StoredStructure> {
    let kind: String = row.get(2)?;
    let kind = kind.parse::<StructureKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
    })?;
    let created_at: String = row.get(8)?;
    Ok(StoredStructure {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind,
        heading: row.get(3)?,
        body: row.get(4)?,
        goals: row.get(5)?,
        purpose: row.get(6)?,
        timeline: row.get(7)?,
        created_at: parse_timestamp(&created_at),
    })
}

/// Build an FTS5 MATCH expression that ORs the quoted keywords.
///
/// Quoting keeps punctuation in user text from being read as FTS5 syntax.
pub fn fts_or_query(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| k.replace('"', ""))
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}

// ── Async store ───────────────────────────────────────────────────────────────

/// [`StructureStore`] over a shared SQLite connection.
#[derive(Clone)]
pub struct SqliteStructureStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStructureStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, user_id: &str, structure: NewStructure) -> Result<StoredStructure> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            insert_structure(&mut conn, &user_id, &structure)
        })
        .await
        .context("db task failed")?
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, ProviderError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&conn)
        })
        .await
        .map_err(|e| ProviderError::Unavailable(format!("db task failed: {e}")))?
        .map_err(ProviderError::from)
    }
}

#[async_trait]
impl StructureStore for SqliteStructureStore {
    async fn search(
        &self,
        user_id: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<StoredStructure>, ProviderError> {
        let user_id = user_id.to_string();
        let keywords = keywords.to_vec();
        self.with_conn(move |conn| search_structures(conn, &user_id, &keywords, limit))
            .await
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<StoredStructure>, ProviderError> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| recent_structures(conn, &user_id, limit))
            .await
    }
}
