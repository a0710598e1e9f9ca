use dotspark::db;
use tempfile::TempDir;

const DIM: usize = 16;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");

    assert!(!db_path.exists());

    let conn = db::open_database(&db_path, DIM).unwrap();

    assert!(db_path.exists());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM structures", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn health_check_passes_on_valid_db() {
    let conn = db::open_memory_database(DIM).unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert!(!report.sqlite_vec_version.is_empty());
    assert_eq!(report.vector_dimensions, Some(DIM));
    assert_eq!(report.structure_count, 0);
    assert_eq!(report.vector_count, 0);
    assert_eq!(report.conversation_count, 0);
}

#[test]
fn busy_timeout_is_set() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    let conn = db::open_database(&db_path, DIM).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn reopening_with_other_dimensions_keeps_recorded_size() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("dims.db");

    drop(db::open_database(&db_path, DIM).unwrap());
    // Opening still succeeds; the mismatch is only logged.
    let conn = db::open_database(&db_path, DIM * 2).unwrap();

    assert_eq!(db::migrations::get_vector_dimensions(&conn).unwrap(), Some(DIM));
}
