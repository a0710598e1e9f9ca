//! Forward-only schema migrations.
//!
//! Version history:
//! - v1: `vectors_vec` is one unpartitioned vec0 index shared by every user.
//! - v2: `vectors_vec` is partitioned by `user_id` and the index dimension is
//!   recorded in `schema_meta`.
//!
//! Each step and its version bump commit together, so an interrupted upgrade
//! leaves the database at the last completed version.

use rusqlite::{Connection, OptionalExtension};

use super::schema::vec_table_sql;

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Read the schema version; an unparsable value counts as 0.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let value: String = conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| row.get(0),
    )?;
    Ok(value.parse().unwrap_or(0))
}

/// The dimension `vectors_vec` was created with, if recorded.
pub fn get_vector_dimensions(conn: &Connection) -> rusqlite::Result<Option<usize>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_meta WHERE key = 'vector_dimensions'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()))
}

/// Bring the database up to [`CURRENT_SCHEMA_VERSION`]. `dimensions` is the configured
/// embedding size, used only when an older index holds no vectors to measure.
pub fn run_migrations(conn: &Connection, dimensions: usize) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        let tx = conn.unchecked_transaction()?;
        match next {
            2 => partition_vectors_by_owner(&tx, dimensions)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }
        tx.execute(
            "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
            [next.to_string()],
        )?;
        tx.commit()?;

        version = next;
    }

    Ok(())
}

/// v1 → v2: rebuild `vectors_vec` with `user_id` as a partition key so KNN ranks
/// only the owner's vectors. Index rows without a metadata row are dropped.
fn partition_vectors_by_owner(conn: &Connection, configured: usize) -> rusqlite::Result<()> {
    let ddl: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE name = 'vectors_vec'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let measured: Option<i64> = match &ddl {
        Some(_) => conn
            .query_row("SELECT vec_length(embedding) FROM vectors_vec LIMIT 1", [], |row| row.get(0))
            .optional()?,
        None => None,
    };
    let dimensions = measured.map_or(configured, |d| d as usize);

    let already_partitioned = ddl.as_deref().is_some_and(|sql| sql.contains("PARTITION KEY"));
    if !already_partitioned {
        if ddl.is_some() {
            conn.execute_batch(
                "CREATE TEMP TABLE vectors_vec_v1 AS SELECT id, embedding FROM vectors_vec;
                 DROP TABLE vectors_vec;",
            )?;
        }
        conn.execute_batch(&vec_table_sql(dimensions))?;

        if ddl.is_some() {
            let moved = conn.execute(
                "INSERT INTO vectors_vec (id, user_id, embedding)
                 SELECT old.id, v.user_id, old.embedding
                 FROM vectors_vec_v1 old JOIN vectors v ON v.id = old.id",
                [],
            )?;
            let orphaned: i64 = conn.query_row(
                "SELECT COUNT(*) FROM vectors_vec_v1 WHERE id NOT IN (SELECT id FROM vectors)",
                [],
                |row| row.get(0),
            )?;
            conn.execute_batch("DROP TABLE vectors_vec_v1;")?;
            tracing::info!(moved, orphaned, dimensions, "vector index partitioned by owner");
        }
    }

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('vector_dimensions', ?1)",
        [dimensions.to_string()],
    )?;
    Ok(())
}
