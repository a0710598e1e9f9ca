use dotspark::db;
use dotspark::embedding::embedding_to_bytes;

const DIM: usize = 16;

#[test]
fn full_schema_creates_all_tables_and_indexes() {
    let conn = db::open_memory_database(DIM).unwrap();

    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    for table in ["structures", "structures_fts", "vectors", "vectors_vec", "schema_meta"] {
        assert!(tables.contains(&table.to_string()), "{table} table missing");
    }

    let indexes: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert!(indexes.contains(&"idx_structures_user".to_string()));
    assert!(indexes.contains(&"idx_structures_kind".to_string()));
    assert!(indexes.contains(&"idx_vectors_user".to_string()));
}

#[test]
fn vec0_table_accepts_configured_dimension() {
    let conn = db::open_memory_database(DIM).unwrap();

    let embedding: Vec<f32> = (0..DIM).map(|i| i as f32 / DIM as f32).collect();
    conn.execute(
        "INSERT INTO vectors_vec (id, user_id, embedding) VALUES (?, ?, ?)",
        rusqlite::params!["test-vec", "alice", embedding_to_bytes(&embedding)],
    )
    .unwrap();

    let count: i64 = conn
        .query_row("SELECT count(*) FROM vectors_vec", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);

    // Wrong length is rejected by vec0
    let short = vec![0.5f32; DIM / 2];
    let result = conn.execute(
        "INSERT INTO vectors_vec (id, user_id, embedding) VALUES (?, ?, ?)",
        rusqlite::params!["short-vec", "alice", embedding_to_bytes(&short)],
    );
    assert!(result.is_err(), "vec0 should reject a vector of the wrong size");
}

#[test]
fn knn_only_ranks_the_requested_partition() {
    let conn = db::open_memory_database(DIM).unwrap();

    let embedding: Vec<f32> = (0..DIM).map(|i| if i == 0 { 1.0 } else { 0.0 }).collect();
    for (id, user) in [("a-1", "alice"), ("b-1", "bob"), ("b-2", "bob")] {
        conn.execute(
            "INSERT INTO vectors_vec (id, user_id, embedding) VALUES (?, ?, ?)",
            rusqlite::params![id, user, embedding_to_bytes(&embedding)],
        )
        .unwrap();
    }

    let ids: Vec<String> = conn
        .prepare(
            "SELECT id FROM vectors_vec WHERE embedding MATCH ?1 AND k = 10 AND user_id = ?2 ORDER BY distance",
        )
        .unwrap()
        .query_map(rusqlite::params![embedding_to_bytes(&embedding), "alice"], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(ids, vec!["a-1".to_string()]);
}

#[test]
fn structure_kind_check_constraint() {
    let conn = db::open_memory_database(DIM).unwrap();

    conn.execute(
        "INSERT INTO structures (id, user_id, kind, heading, created_at)
         VALUES ('s-1', 'alice', 'wheel', 'Marathon', '2024-01-01T00:00:00Z')",
        [],
    )
    .unwrap();

    let result = conn.execute(
        "INSERT INTO structures (id, user_id, kind, heading, created_at)
         VALUES ('s-2', 'alice', 'galaxy', 'bad', '2024-01-01T00:00:00Z')",
        [],
    );
    assert!(result.is_err(), "CHECK constraint should reject unknown kinds");
}
