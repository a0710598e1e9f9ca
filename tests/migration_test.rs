mod helpers;

use dotspark::db;
use dotspark::db::migrations::{get_schema_version, get_vector_dimensions, run_migrations, CURRENT_SCHEMA_VERSION};
use dotspark::embedding::embedding_to_bytes;
use dotspark::store::vector::search_records;
use dotspark::store::VectorFilter;

fn unit_vector() -> Vec<f32> {
    (0..helpers::DIM).map(|i| if i == 0 { 1.0 } else { 0.0 }).collect()
}

/// Lay out a database the way schema v1 did: one vec0 index shared by all users.
fn v1_database() -> rusqlite::Connection {
    db::load_sqlite_vec();
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE schema_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
         INSERT INTO schema_meta (key, value) VALUES ('schema_version', '1');
         CREATE VIRTUAL TABLE vectors_vec USING vec0(id TEXT PRIMARY KEY, embedding FLOAT[{}]);",
        helpers::DIM
    ))
    .unwrap();
    db::schema::init_schema(&conn, helpers::DIM).unwrap();

    for (id, user, content) in [("old-a", "alice", "alice before upgrade"), ("old-b", "bob", "bob before upgrade")] {
        conn.execute(
            "INSERT INTO vectors (id, user_id, content_type, content, created_at)
             VALUES (?1, ?2, 'dot', ?3, '2026-01-01T00:00:00Z')",
            rusqlite::params![id, user, content],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO vectors_vec (id, embedding) VALUES (?1, ?2)",
            rusqlite::params![id, embedding_to_bytes(&unit_vector())],
        )
        .unwrap();
    }
    conn
}

#[test]
fn fresh_db_starts_at_current_version() {
    let conn = helpers::test_db();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    assert_eq!(get_vector_dimensions(&conn).unwrap(), Some(helpers::DIM));
}

#[test]
fn migrations_are_idempotent() {
    let conn = helpers::test_db();
    run_migrations(&conn, helpers::DIM).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn v1_vectors_stay_searchable_by_their_owner() {
    let conn = v1_database();
    assert_eq!(get_schema_version(&conn).unwrap(), 1);

    run_migrations(&conn, helpers::DIM).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    assert_eq!(get_vector_dimensions(&conn).unwrap(), Some(helpers::DIM));

    let filter = VectorFilter {
        user_id: "alice".into(),
        content_types: vec!["dot".into()],
        top_k: 5,
        threshold: 0.6,
    };
    let hits = search_records(&conn, &unit_vector(), &filter).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "alice before upgrade");
}
