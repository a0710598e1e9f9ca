//! SQL DDL for all dotspark tables.
//!
//! Defines `structures` (stored dots, wheels and chakras) with its `structures_fts`
//! FTS5 index, the `vectors` metadata table with its `vectors_vec` (vec0) index, and
//! `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

use super::migrations::CURRENT_SCHEMA_VERSION;

const SCHEMA_SQL: &str = r#"
-- Stored thoughts, one row per dot / wheel / chakra
CREATE TABLE IF NOT EXISTS structures (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL CHECK(kind IN ('dot','wheel','chakra')),
    heading TEXT NOT NULL,
    body TEXT NOT NULL DEFAULT '',
    goals TEXT,
    purpose TEXT,
    timeline TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_structures_user ON structures(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_structures_kind ON structures(kind);

-- Keyword index over the searchable text fields
CREATE VIRTUAL TABLE IF NOT EXISTS structures_fts USING fts5(
    heading,
    body,
    goals,
    purpose,
    id UNINDEXED,
    content='structures',
    content_rowid='rowid'
);

-- Similarity-search records (metadata side)
CREATE TABLE IF NOT EXISTS vectors (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    content_type TEXT NOT NULL,
    content_id TEXT,
    session_id TEXT,
    content TEXT NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vectors_user ON vectors(user_id, content_type);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// vec0 DDL; the dimension is fixed at creation time. Rows are partitioned by owner
/// so a KNN query only ranks the requesting user's vectors.
pub(crate) fn vec_table_sql(dimensions: usize) -> String {
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS vectors_vec USING vec0(\n\
         id TEXT PRIMARY KEY,\n\
         user_id TEXT PARTITION KEY,\n\
         embedding FLOAT[{dimensions}]\n\
         );"
    )
}

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
///
/// A fresh database is created at [`CURRENT_SCHEMA_VERSION`] with its vector
/// dimension recorded. An existing database keeps its version and tables untouched;
/// [`run_migrations`](super::migrations::run_migrations) brings it forward.
pub fn init_schema(conn: &Connection, dimensions: usize) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let existing: i64 = conn.query_row(
        "SELECT COUNT(*) FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| row.get(0),
    )?;
    if existing > 0 {
        return Ok(());
    }

    conn.execute_batch(&vec_table_sql(dimensions))?;
    conn.execute(
        "INSERT INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('vector_dimensions', ?1)",
        [dimensions.to_string()],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 8).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"structures".to_string()));
        assert!(tables.contains(&"structures_fts".to_string()));
        assert!(tables.contains(&"vectors".to_string()));
        assert!(tables.contains(&"vectors_vec".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 8).unwrap();
        init_schema(&conn, 8).unwrap();
    }

    #[test]
    fn fresh_schema_is_current_and_records_dimensions() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 8).unwrap();

        let version: String = conn
            .query_row("SELECT value FROM schema_meta WHERE key = 'schema_version'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION.to_string());

        let ddl: String = conn
            .query_row("SELECT sql FROM sqlite_master WHERE name = 'vectors_vec'", [], |r| r.get(0))
            .unwrap();
        assert!(ddl.contains("PARTITION KEY"), "{ddl}");
    }

    #[test]
    fn kind_constraint_rejects_unknown_types() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 8).unwrap();
        let result = conn.execute(
            "INSERT INTO structures (id, user_id, kind, heading, created_at) \
             VALUES ('x', 'u', 'galaxy', 'h', '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
