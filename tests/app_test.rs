mod helpers;

use std::sync::Arc;
use tempfile::TempDir;

use dotspark::cognition::StructureKind;
use dotspark::config::DotsparkConfig;
use dotspark::retrieval::RetrievalOptions;
use dotspark::store::SqliteVectorStore;
use dotspark::App;
use helpers::WordBucketEmbedding;

fn offline_config(tmp: &TempDir) -> DotsparkConfig {
    let mut config = DotsparkConfig::default();
    config.storage.db_path = tmp.path().join("thoughts.db").to_string_lossy().into_owned();
    config.completion.provider = "none".into();
    config.embedding.provider = "none".into();
    config.embedding.dimensions = helpers::DIM;
    config
}

#[tokio::test]
async fn stored_thoughts_survive_a_restart() {
    let tmp = TempDir::new().unwrap();
    let config = offline_config(&tmp);

    {
        let app = App::from_config(&config).unwrap();
        let stored = app
            .store_thought("alice", "I realized silence helps me think better")
            .await
            .unwrap();
        assert_eq!(stored.structure.kind, StructureKind::Dot);
        assert_eq!(stored.classification.confidence, 60);
        assert!(!stored.indexed);
    }

    let app = App::from_config(&config).unwrap();
    let result = app
        .retriever
        .retrieve("silence", "alice", &RetrievalOptions::default())
        .await
        .unwrap();
    assert_eq!(result.similar_structures.len(), 1);
    assert_eq!(
        result.similar_structures[0].structure.heading,
        "I realized silence helps me think better"
    );
}

#[tokio::test]
async fn stored_thoughts_are_indexed_when_similarity_is_available() {
    let tmp = TempDir::new().unwrap();
    let config = offline_config(&tmp);
    let db = helpers::shared_db();
    let similarity = Arc::new(SqliteVectorStore::new(Arc::clone(&db), Arc::new(WordBucketEmbedding)));

    let app = App::assemble(&config, db, None, Some(similarity));
    let text = "I've decided to run a marathon by June, training 4x/week";
    let stored = app.store_thought("alice", text).await.unwrap();
    assert_eq!(stored.structure.kind, StructureKind::Wheel);
    assert!(stored.indexed);

    let result = app
        .retriever
        .retrieve(&stored.structure.searchable_text(), "alice", &RetrievalOptions::default())
        .await
        .unwrap();
    assert_eq!(result.related_content.len(), 1);
    assert_eq!(result.related_content[0].content_type, "wheel");
    assert!(result
        .related_content
        .iter()
        .all(|hit| hit.user_id == "alice"));
}

#[tokio::test]
async fn storing_requires_an_owner_and_content() {
    let tmp = TempDir::new().unwrap();
    let app = App::from_config(&offline_config(&tmp)).unwrap();

    assert!(app.store_thought("", "a thought").await.is_err());
    assert!(app.store_thought("alice", "   ").await.is_err());
}
