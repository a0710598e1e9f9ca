pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Open (or create) the dotspark database at the given path, with sqlite-vec
/// loaded, schema initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>, dimensions: usize) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    schema::init_schema(&conn, dimensions).context("failed to initialize schema")?;
    migrations::run_migrations(&conn, dimensions).context("failed to run migrations")?;

    if let Some(stored) = migrations::get_vector_dimensions(&conn)? {
        if stored != dimensions {
            tracing::warn!(
                stored,
                configured = dimensions,
                "embedding dimensions changed; similarity search will fail until the database is rebuilt"
            );
        }
    }

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_memory_database(dimensions: usize) -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn, dimensions).context("failed to initialize schema")?;
    migrations::run_migrations(&conn, dimensions).context("failed to run migrations")?;
    Ok(conn)
}

/// Snapshot of database state for the `doctor` command.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub schema_version: u32,
    pub sqlite_vec_version: String,
    pub vector_dimensions: Option<usize>,
    pub structure_count: i64,
    pub vector_count: i64,
    pub conversation_count: i64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Run `PRAGMA integrity_check` and collect row counts.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;
    let sqlite_vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
    let vector_dimensions = migrations::get_vector_dimensions(conn)?;

    let structure_count: i64 = conn.query_row("SELECT COUNT(*) FROM structures", [], |row| row.get(0))?;
    let vector_count: i64 = conn.query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))?;
    let conversation_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM vectors WHERE content_type = 'conversation'",
        [],
        |row| row.get(0),
    )?;

    let integrity_details: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;

    Ok(HealthReport {
        schema_version,
        sqlite_vec_version,
        vector_dimensions,
        structure_count,
        vector_count,
        conversation_count,
        integrity_ok: integrity_details == "ok",
        integrity_details,
    })
}
